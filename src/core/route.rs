use super::constants::FLOW_EPSILON;
use super::optimization::{Allocation, PoolFlow};
use super::token_graph::LiquidityGraph;
use super::types::{Leg, PoolIdx, TokenIdx};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::warn;

/// Legs and amounts recomputed from an allocation.
#[derive(Clone, Debug)]
pub struct Materialized {
    pub legs: Vec<Leg>,
    pub amount_in: f64,
    pub amount_out: f64,
    pub gas_spent: u64,
}

/// Pools whose flows form a cycle between tokens. Such an allocation cannot
/// be turned into an ordered leg list.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowCycle {
    pub pools: Vec<PoolIdx>,
}

struct FlowEdge {
    pool: PoolIdx,
    to: TokenIdx,
    flow: PoolFlow,
}

/// Turns per-pool flows into an ordered list of legs.
///
/// Tokens are visited in topological order of the flow graph. The amount
/// arriving at a token is split over its outgoing pools in proportion to the
/// allocated flows, and each leg's output is requoted with the pool's exact
/// `calc_out_by_in`. The last leg of a token takes the remainder, so flow is
/// conserved exactly at every intermediate token.
pub fn materialize(
    graph: &LiquidityGraph,
    from: TokenIdx,
    to: TokenIdx,
    allocation: &Allocation,
) -> Result<Materialized, FlowCycle> {
    let mut outgoing: BTreeMap<TokenIdx, Vec<FlowEdge>> = BTreeMap::new();
    let mut in_degree: BTreeMap<TokenIdx, usize> = BTreeMap::new();
    in_degree.insert(from, 0);

    let mut active: Vec<(PoolIdx, PoolFlow)> = allocation
        .pool_flows
        .iter()
        .filter(|(_, flow)| flow.amount_in > FLOW_EPSILON)
        .map(|(&pool, &flow)| (pool, flow))
        .collect();
    active.sort_by_key(|(pool, _)| *pool);

    let mut gas_spent = 0;
    for (pool, flow) in active {
        let (token_in, token_out) = graph.pool_tokens(pool, flow.direction);
        in_degree.entry(token_in).or_insert(0);
        *in_degree.entry(token_out).or_insert(0) += 1;
        outgoing.entry(token_in).or_default().push(FlowEdge {
            pool,
            to: token_out,
            flow,
        });
        gas_spent += graph.pool(pool).info().swap_gas_cost;
    }

    let order = topological_order(&outgoing, in_degree).map_err(|stuck| {
        let cyclic = cyclic_core(&outgoing, stuck);
        FlowCycle {
            pools: cyclic
                .iter()
                .flat_map(|token| outgoing.get(token).into_iter().flatten())
                .filter(|edge| cyclic.contains(&edge.to))
                .map(|edge| edge.pool)
                .collect(),
        }
    })?;

    let mut amounts: HashMap<TokenIdx, f64> = HashMap::new();
    amounts.insert(from, allocation.total_in);
    let mut legs = vec![];

    for token in order {
        let available = amounts.get(&token).copied().unwrap_or(0.0);
        let Some(edges) = outgoing.get(&token) else {
            if token != to && available > FLOW_EPSILON {
                warn!(token, available, "flow stranded at intermediate token");
            }
            continue;
        };

        let total_flow: f64 = edges.iter().map(|edge| edge.flow.amount_in).sum();
        let mut spent = 0.0;
        for (k, edge) in edges.iter().enumerate() {
            let portion = edge.flow.amount_in / total_flow;
            let leg_in = if k + 1 == edges.len() {
                (available - spent).max(0.0)
            } else {
                available * portion
            };
            spent += leg_in;

            let pool = graph.pool(edge.pool);
            let leg_out = match pool.calc_out_by_in(leg_in, edge.flow.direction) {
                Ok(quote) => quote.amount,
                Err(err) => {
                    // Only reachable when rounding pushed a saturated pool over its floor
                    warn!(pool = pool.address(), error = %err, "requote failed, scaling allocated output");
                    edge.flow.amount_out * leg_in / edge.flow.amount_in
                }
            };
            *amounts.entry(edge.to).or_insert(0.0) += leg_out;

            legs.push(Leg {
                pool_address: pool.address().to_string(),
                token_from: graph.token(token).clone(),
                token_to: graph.token(edge.to).clone(),
                direction: edge.flow.direction,
                assumed_amount_in: leg_in,
                assumed_amount_out: leg_out,
                swap_portion: portion,
            });
        }
    }

    Ok(Materialized {
        legs,
        amount_in: allocation.total_in,
        amount_out: amounts.get(&to).copied().unwrap_or(0.0),
        gas_spent,
    })
}

// Kahn's algorithm. On a cycle, returns the tokens that could not be ordered.
fn topological_order(
    outgoing: &BTreeMap<TokenIdx, Vec<FlowEdge>>,
    mut in_degree: BTreeMap<TokenIdx, usize>,
) -> Result<Vec<TokenIdx>, Vec<TokenIdx>> {
    let mut queue: VecDeque<TokenIdx> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(&token, _)| token)
        .collect();
    let mut order = Vec::with_capacity(in_degree.len());

    while let Some(token) = queue.pop_front() {
        order.push(token);
        for edge in outgoing.get(&token).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(&edge.to) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(edge.to);
                }
            }
        }
    }

    if order.len() == in_degree.len() {
        Ok(order)
    } else {
        Err(in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(token, _)| token)
            .collect())
    }
}

// Kahn leaves tokens downstream of a cycle unordered as well. Peels off stuck
// tokens with no edge into another stuck token until only cycles remain.
fn cyclic_core(
    outgoing: &BTreeMap<TokenIdx, Vec<FlowEdge>>,
    stuck: Vec<TokenIdx>,
) -> BTreeSet<TokenIdx> {
    let mut remaining: BTreeSet<TokenIdx> = stuck.into_iter().collect();
    loop {
        let tails: Vec<TokenIdx> = remaining
            .iter()
            .copied()
            .filter(|token| {
                !outgoing
                    .get(token)
                    .into_iter()
                    .flatten()
                    .any(|edge| remaining.contains(&edge.to))
            })
            .collect();
        if tails.is_empty() {
            return remaining;
        }
        for token in tails {
            remaining.remove(&token);
        }
    }
}
