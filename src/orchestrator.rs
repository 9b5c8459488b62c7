use super::core::error::RouterError;
use super::core::optimization::{Allocation, Optimizer, OptimizerParams, SwapMode};
use super::core::paths::discover_paths;
use super::core::route::{materialize, Materialized};
use super::core::token_graph::LiquidityGraph;
use super::core::types::{MultiRoute, PoolIdx, RouteStatus, TradePath};
use super::types::{RouteRequest, RouterConfig};
use std::slice;
use std::time::Instant;
use tracing::{debug, warn};

pub fn validate_request(
    graph: &LiquidityGraph,
    request: &RouteRequest,
    config: &RouterConfig,
) -> Result<(), RouterError> {
    config.validate()?;

    if graph.is_empty() {
        return Err(RouterError::NoPools);
    }
    if request.from == request.to {
        return Err(RouterError::SameToken(request.from.identity()));
    }
    if !request.amount.is_finite() || request.amount <= 0.0 {
        return Err(RouterError::InvalidAmount(request.amount));
    }
    if !request.gas_price.is_finite() || request.gas_price < 0.0 {
        return Err(RouterError::InvalidGasPrice(request.gas_price));
    }
    Ok(())
}

/// Routes a fixed input amount, possibly split across several paths, for the
/// largest output net of gas.
pub fn find_multi_route_exact_in(
    graph: &LiquidityGraph,
    request: &RouteRequest,
    config: &RouterConfig,
) -> Result<MultiRoute, RouterError> {
    find_route(graph, request, config, SwapMode::ExactIn, false)
}

/// Routes for a fixed output amount with the smallest input, gas included.
pub fn find_multi_route_exact_out(
    graph: &LiquidityGraph,
    request: &RouteRequest,
    config: &RouterConfig,
) -> Result<MultiRoute, RouterError> {
    find_route(graph, request, config, SwapMode::ExactOut, false)
}

/// Like [`find_multi_route_exact_in`] but restricted to the single best path.
pub fn find_single_route_exact_in(
    graph: &LiquidityGraph,
    request: &RouteRequest,
    config: &RouterConfig,
) -> Result<MultiRoute, RouterError> {
    find_route(graph, request, config, SwapMode::ExactIn, true)
}

fn find_route(
    graph: &LiquidityGraph,
    request: &RouteRequest,
    config: &RouterConfig,
    mode: SwapMode,
    single_path: bool,
) -> Result<MultiRoute, RouterError> {
    validate_request(graph, request, config)?;

    let no_way = || MultiRoute::no_way(request.from.clone(), request.to.clone());
    let (Some(from), Some(to)) = (graph.token_index(&request.from), graph.token_index(&request.to))
    else {
        debug!(from = %request.from, to = %request.to, "token not present in graph");
        return Ok(no_way());
    };

    let mut paths = discover_paths(graph, from, to, config.max_hops, config.max_paths);
    let Some(best_price) = paths.first().map(|path| path.price) else {
        debug!(from = %request.from, to = %request.to, "no path found");
        return Ok(no_way());
    };

    let params = OptimizerParams {
        steps: config.steps,
        iteration_cap: config.iteration_cap,
        deadline: config.deadline().map(|budget| Instant::now() + budget),
        gas_price: request.gas_price,
    };

    if single_path {
        let Some((allocation, path)) = best_single_path(graph, &paths, params, mode, request, config)
        else {
            return Ok(no_way());
        };
        debug!(hops = path.hops.len(), "selected single path");
        return match materialize(graph, from, to, &allocation) {
            Ok(materialized) => Ok(build_route(request, config, &allocation, materialized, best_price)),
            // A single simple path cannot produce a token cycle
            Err(_) => Ok(no_way()),
        };
    }

    loop {
        let allocation = Optimizer::new(graph, &paths, params).allocate(mode, request.amount);
        if allocation.allocated <= 0.0 {
            debug!(from = %request.from, to = %request.to, "no path could take any flow");
            return Ok(no_way());
        }

        match materialize(graph, from, to, &allocation) {
            Ok(materialized) => {
                return Ok(build_route(request, config, &allocation, materialized, best_price));
            }
            Err(cycle) => {
                let Some(victim) = least_funded_path(&paths, &allocation, &cycle.pools) else {
                    warn!(pools = ?cycle.pools, "unresolvable flow cycle");
                    return Ok(no_way());
                };
                warn!(path = victim, pools = ?cycle.pools, "flow cycle, dropping path and reallocating");
                paths.remove(victim);
            }
        }
    }
}

// Among funded paths through the cycle, the one carrying the least flow
fn least_funded_path(
    paths: &[TradePath],
    allocation: &Allocation,
    cycle_pools: &[PoolIdx],
) -> Option<usize> {
    if paths.len() < 2 {
        return None;
    }
    paths
        .iter()
        .enumerate()
        .filter(|(i, path)| {
            allocation.path_amounts[*i] > 0.0
                && cycle_pools.iter().any(|&pool| path.contains_pool(pool))
        })
        .min_by(|(a, _), (b, _)| allocation.path_amounts[*a].total_cmp(&allocation.path_amounts[*b]))
        .map(|(i, _)| i)
}

fn best_single_path<'p>(
    graph: &LiquidityGraph,
    paths: &'p [TradePath],
    params: OptimizerParams,
    mode: SwapMode,
    request: &RouteRequest,
    config: &RouterConfig,
) -> Option<(Allocation, &'p TradePath)> {
    let mut best: Option<(bool, f64, Allocation, &TradePath)> = None;

    for path in paths {
        let allocation = Optimizer::new(graph, slice::from_ref(path), params).allocate(mode, request.amount);
        if allocation.allocated <= 0.0 {
            continue;
        }
        let complete = is_complete(&allocation, request.amount, config);
        let gas_cost_in = allocation.gas_spent as f64 * request.gas_price;
        let score = match mode {
            SwapMode::ExactIn => {
                allocation.total_out - gas_cost_in * allocation.total_out / allocation.total_in
            }
            SwapMode::ExactOut => -(allocation.total_in + gas_cost_in),
        };

        let better = match &best {
            None => true,
            Some((best_complete, best_score, _, _)) => {
                (complete && !best_complete) || (complete == *best_complete && score > *best_score)
            }
        };
        if better {
            best = Some((complete, score, allocation, path));
        }
    }

    best.map(|(_, _, allocation, path)| (allocation, path))
}

fn is_complete(allocation: &Allocation, requested: f64, config: &RouterConfig) -> bool {
    requested - allocation.allocated <= requested * config.rounding_tolerance
}

fn build_route(
    request: &RouteRequest,
    config: &RouterConfig,
    allocation: &Allocation,
    materialized: Materialized,
    best_price: f64,
) -> MultiRoute {
    let status = if is_complete(allocation, request.amount, config) {
        RouteStatus::Success
    } else {
        RouteStatus::Partial
    };
    let price_impact = if materialized.amount_in > 0.0 && best_price > 0.0 {
        1.0 - (materialized.amount_out / materialized.amount_in) / best_price
    } else {
        0.0
    };

    debug!(
        ?status,
        amount_in = materialized.amount_in,
        amount_out = materialized.amount_out,
        legs = materialized.legs.len(),
        price_impact,
        "route materialized"
    );

    MultiRoute {
        status,
        from_token: request.from.clone(),
        to_token: request.to.clone(),
        amount_in: materialized.amount_in,
        amount_out: materialized.amount_out,
        legs: materialized.legs,
        price_impact,
        total_gas_spent: materialized.gas_spent,
    }
}
