use super::constants::FLOW_EPSILON;
use super::error::PoolError;
use super::pool::Pool;
use super::token_graph::LiquidityGraph;
use super::types::{PoolIdx, TradePath};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapMode {
    /// Fixed input, maximize output
    ExactIn,
    /// Fixed output, minimize input
    ExactOut,
}

/// Net flow through one pool, in the pool's own orientation.
///
/// A pool only ever carries one net direction. When a second path pushes
/// flow the other way the two are netted against each other.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoolFlow {
    pub direction: bool,
    pub amount_in: f64,
    pub amount_out: f64,
}

impl PoolFlow {
    pub fn is_empty(&self) -> bool {
        self.amount_in <= FLOW_EPSILON && self.amount_out <= FLOW_EPSILON
    }
}

fn out_of_liquidity(pool: &dyn Pool) -> PoolError {
    PoolError::InsufficientLiquidity {
        address: pool.address().to_string(),
    }
}

/// Extra output from pushing `amount_in` more through `pool` on top of
/// `flow`, and the pool's flow afterwards.
pub fn flow_forward(
    pool: &dyn Pool,
    flow: Option<PoolFlow>,
    direction: bool,
    amount_in: f64,
) -> Result<(f64, PoolFlow), PoolError> {
    match flow {
        Some(flow) if !flow.is_empty() && flow.direction != direction => {
            // Our input token is what the existing flow takes out of the pool
            if amount_in < flow.amount_out {
                let remaining_out = flow.amount_out - amount_in;
                let inp = pool.calc_in_by_out(remaining_out, flow.direction).amount;
                if !inp.is_finite() {
                    return Err(out_of_liquidity(pool));
                }
                let netted = PoolFlow {
                    direction: flow.direction,
                    amount_in: inp,
                    amount_out: remaining_out,
                };
                Ok(((flow.amount_in - inp).max(0.0), netted))
            } else {
                let excess = amount_in - flow.amount_out;
                let quote = pool.calc_out_by_in(excess, direction)?;
                let reversed = PoolFlow {
                    direction,
                    amount_in: excess,
                    amount_out: quote.amount,
                };
                Ok((quote.amount + flow.amount_in, reversed))
            }
        }
        _ => {
            let (prev_in, prev_out) = flow
                .filter(|f| !f.is_empty())
                .map_or((0.0, 0.0), |f| (f.amount_in, f.amount_out));
            let total_in = prev_in + amount_in;
            let quote = pool.calc_out_by_in(total_in, direction)?;
            let grown = PoolFlow {
                direction,
                amount_in: total_in,
                amount_out: quote.amount,
            };
            Ok(((quote.amount - prev_out).max(0.0), grown))
        }
    }
}

/// Extra input needed to take `amount_out` more out of `pool` on top of
/// `flow`, and the pool's flow afterwards.
pub fn flow_backward(
    pool: &dyn Pool,
    flow: Option<PoolFlow>,
    direction: bool,
    amount_out: f64,
) -> Result<(f64, PoolFlow), PoolError> {
    match flow {
        Some(flow) if !flow.is_empty() && flow.direction != direction => {
            // Our output token is what the existing flow puts into the pool
            if amount_out < flow.amount_in {
                let remaining_in = flow.amount_in - amount_out;
                let quote = pool.calc_out_by_in(remaining_in, flow.direction)?;
                let netted = PoolFlow {
                    direction: flow.direction,
                    amount_in: remaining_in,
                    amount_out: quote.amount,
                };
                Ok(((flow.amount_out - quote.amount).max(0.0), netted))
            } else {
                let excess = amount_out - flow.amount_in;
                let inp = pool.calc_in_by_out(excess, direction).amount;
                if !inp.is_finite() {
                    return Err(out_of_liquidity(pool));
                }
                let reversed = PoolFlow {
                    direction,
                    amount_in: inp,
                    amount_out: excess,
                };
                Ok((inp + flow.amount_out, reversed))
            }
        }
        _ => {
            let (prev_in, prev_out) = flow
                .filter(|f| !f.is_empty())
                .map_or((0.0, 0.0), |f| (f.amount_in, f.amount_out));
            let total_out = prev_out + amount_out;
            let inp = pool.calc_in_by_out(total_out, direction).amount;
            if !inp.is_finite() {
                return Err(out_of_liquidity(pool));
            }
            let grown = PoolFlow {
                direction,
                amount_in: inp,
                amount_out: total_out,
            };
            Ok(((inp - prev_in).max(0.0), grown))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationOutcome {
    Converged,
    IterationCapReached,
    DeadlineReached,
    Infeasible,
}

#[derive(Clone, Copy, Debug)]
pub struct OptimizerParams {
    pub steps: usize,
    pub iteration_cap: usize,
    pub deadline: Option<Instant>,
    // input-token units per gas unit
    pub gas_price: f64,
}

/// Flow assignment produced by [`Optimizer::allocate`].
#[derive(Clone, Debug)]
pub struct Allocation {
    pub mode: SwapMode,
    /// Fixed-side amount given to each candidate path: input for
    /// [`SwapMode::ExactIn`], output for [`SwapMode::ExactOut`].
    pub path_amounts: Vec<f64>,
    pub pool_flows: HashMap<PoolIdx, PoolFlow>,
    pub requested: f64,
    pub allocated: f64,
    pub total_in: f64,
    pub total_out: f64,
    pub gas_spent: u64,
    pub iterations: usize,
    pub outcome: AllocationOutcome,
}

struct Step {
    amount_in: f64,
    amount_out: f64,
    gas: u64,
    flows: Vec<(PoolIdx, PoolFlow)>,
}

/// Splits a fixed amount across candidate paths by repeatedly handing the
/// next increment to whichever path currently pays best for it.
///
/// Pools are never touched: the simulation keeps cumulative per-pool flows
/// and quotes them through the pools' exact functions.
pub struct Optimizer<'a> {
    graph: &'a LiquidityGraph,
    paths: &'a [TradePath],
    params: OptimizerParams,
}

impl<'a> Optimizer<'a> {
    pub fn new(graph: &'a LiquidityGraph, paths: &'a [TradePath], params: OptimizerParams) -> Self {
        Self {
            graph,
            paths,
            params,
        }
    }

    pub fn allocate(&self, mode: SwapMode, amount: f64) -> Allocation {
        let mut allocation = Allocation {
            mode,
            path_amounts: vec![0.0; self.paths.len()],
            pool_flows: HashMap::new(),
            requested: amount,
            allocated: 0.0,
            total_in: 0.0,
            total_out: 0.0,
            gas_spent: 0,
            iterations: 0,
            outcome: AllocationOutcome::Converged,
        };

        let granularity = self.granularity(mode);
        let mut increment = (amount / self.params.steps.max(1) as f64)
            .max(granularity)
            .min(amount);
        let mut remaining = amount;

        while remaining > 0.0 {
            if allocation.iterations >= self.params.iteration_cap {
                allocation.outcome = AllocationOutcome::IterationCapReached;
                self.final_step(&mut allocation, remaining);
                break;
            }
            if self.params.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                allocation.outcome = AllocationOutcome::DeadlineReached;
                self.final_step(&mut allocation, remaining);
                break;
            }
            allocation.iterations += 1;

            let mut step = increment.min(remaining);
            if remaining - step < granularity {
                step = remaining;
            }

            match self.best_step(&allocation.pool_flows, mode, step) {
                Some((path_idx, best)) => {
                    trace!(path = path_idx, step, "allocated increment");
                    apply_step(&mut allocation, path_idx, step, best);
                    remaining -= step;
                }
                None if step > granularity => {
                    // Every path is out of liquidity at this size, try smaller
                    increment = step / 2.0;
                }
                None => {
                    allocation.outcome = AllocationOutcome::Infeasible;
                    break;
                }
            }
        }

        debug!(
            ?mode,
            outcome = ?allocation.outcome,
            iterations = allocation.iterations,
            requested = amount,
            allocated = allocation.allocated,
            "allocation finished"
        );
        allocation
    }

    // Assigns whatever is left to the best path in one unrounded step
    fn final_step(&self, allocation: &mut Allocation, remaining: f64) {
        if let Some((path_idx, best)) = self.best_step(&allocation.pool_flows, allocation.mode, remaining) {
            apply_step(allocation, path_idx, remaining, best);
        }
    }

    fn best_step(
        &self,
        flows: &HashMap<PoolIdx, PoolFlow>,
        mode: SwapMode,
        amount: f64,
    ) -> Option<(usize, Step)> {
        let mut best: Option<(usize, f64, Step)> = None;

        for (i, path) in self.paths.iter().enumerate() {
            let Ok(step) = self.simulate(path, flows, mode, amount) else {
                continue;
            };
            let gas_cost_in = step.gas as f64 * self.params.gas_price;
            let score = match mode {
                // gas is priced in input units, convert through this step's local price
                SwapMode::ExactIn => {
                    step.amount_out - gas_cost_in * step.amount_out / step.amount_in
                }
                SwapMode::ExactOut => -(step.amount_in + gas_cost_in),
            };
            if !score.is_finite() {
                continue;
            }
            if best.as_ref().map_or(true, |(_, best_score, _)| score > *best_score) {
                best = Some((i, score, step));
            }
        }

        best.map(|(i, _, step)| (i, step))
    }

    fn simulate(
        &self,
        path: &TradePath,
        flows: &HashMap<PoolIdx, PoolFlow>,
        mode: SwapMode,
        amount: f64,
    ) -> Result<Step, PoolError> {
        let mut current = amount;
        let mut gas = 0;
        let mut new_flows = Vec::with_capacity(path.hops.len());

        let mut visit = |hop_pool: PoolIdx, direction: bool, amount: f64| {
            let pool = self.graph.pool(hop_pool);
            let flow = flows.get(&hop_pool).copied();
            if flow.map_or(true, |f| f.is_empty()) {
                gas += pool.info().swap_gas_cost;
            }
            let (next, flow) = match mode {
                SwapMode::ExactIn => flow_forward(pool, flow, direction, amount)?,
                SwapMode::ExactOut => flow_backward(pool, flow, direction, amount)?,
            };
            new_flows.push((hop_pool, flow));
            Ok::<f64, PoolError>(next)
        };

        match mode {
            SwapMode::ExactIn => {
                for hop in &path.hops {
                    current = visit(hop.pool, hop.direction, current)?;
                }
            }
            SwapMode::ExactOut => {
                for hop in path.hops.iter().rev() {
                    current = visit(hop.pool, hop.direction, current)?;
                }
            }
        }

        let (amount_in, amount_out) = match mode {
            SwapMode::ExactIn => (amount, current),
            SwapMode::ExactOut => (current, amount),
        };
        Ok(Step {
            amount_in,
            amount_out,
            gas,
            flows: new_flows,
        })
    }

    // Quantum of the fixed-side token below which refinement stops
    fn granularity(&self, mode: SwapMode) -> f64 {
        self.paths
            .iter()
            .filter_map(|path| {
                let hop = match mode {
                    SwapMode::ExactIn => path.hops.first()?,
                    SwapMode::ExactOut => path.hops.last()?,
                };
                let pool = self.graph.pool(hop.pool);
                Some(match mode {
                    SwapMode::ExactIn => pool.granularity(hop.direction),
                    SwapMode::ExactOut => pool.granularity(!hop.direction),
                })
            })
            .fold(0.0, f64::max)
    }
}

fn apply_step(allocation: &mut Allocation, path_idx: usize, amount: f64, step: Step) {
    for (pool, flow) in step.flows {
        allocation.pool_flows.insert(pool, flow);
    }
    allocation.path_amounts[path_idx] += amount;
    allocation.allocated += amount;
    allocation.total_in += step.amount_in;
    allocation.total_out += step.amount_out;
    allocation.gas_spent += step.gas;
}
