use super::constants::{TYPICAL_MINIMAL_LIQUIDITY, TYPICAL_SWAP_GAS_COST};
use super::error::PoolError;
use super::pool::{ConstantProductPool, Pool, PoolInfo};
use super::token::Token;
use super::token_graph::LiquidityGraph;
use super::Result;
use anyhow::Context;
use arc_swap::ArcSwap;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    #[default]
    ConstantProduct,
}

/// Pool data as delivered by a supplier. Reserves are decimal integer strings
/// so that malformed values (negative, non-numeric) can be reported per pool.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PoolRecord {
    pub address: String,
    #[serde(default)]
    pub kind: PoolKind,
    pub tokens: Vec<Token>,
    pub fee: f64,
    pub reserves: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_liquidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_gas_cost: Option<u64>,
}

impl PoolRecord {
    pub fn parse_reserves(&self) -> std::result::Result<Vec<BigUint>, PoolError> {
        if self.reserves.len() != self.tokens.len() {
            return Err(PoolError::InvalidPoolData {
                address: self.address.clone(),
                reason: format!(
                    "{} reserves for {} tokens",
                    self.reserves.len(),
                    self.tokens.len()
                ),
            });
        }
        self.reserves
            .iter()
            .map(|reserve| {
                BigUint::from_str(reserve.trim()).map_err(|_| PoolError::InvalidPoolData {
                    address: self.address.clone(),
                    reason: format!("reserve {reserve:?} is not a non-negative integer"),
                })
            })
            .collect()
    }

    // Same kind and fixed parameters as an existing pool, so only reserves differ
    fn describes(&self, kind: PoolKind, info: &PoolInfo) -> bool {
        kind == self.kind
            && info.tokens == self.tokens
            && info.fee == self.fee
            && info.min_liquidity == self.min_liquidity.unwrap_or(TYPICAL_MINIMAL_LIQUIDITY)
            && info.swap_gas_cost == self.swap_gas_cost.unwrap_or(TYPICAL_SWAP_GAS_COST)
    }

    pub fn build_pool(&self, reserves: Vec<BigUint>) -> std::result::Result<Box<dyn Pool>, PoolError> {
        match self.kind {
            PoolKind::ConstantProduct => {
                let [token0, token1] = <[Token; 2]>::try_from(self.tokens.clone()).map_err(|tokens| {
                    PoolError::InvalidPoolData {
                        address: self.address.clone(),
                        reason: format!("constant product pool with {} tokens", tokens.len()),
                    }
                })?;
                let mut reserves = reserves.into_iter();
                let pool = ConstantProductPool::with_limits(
                    &self.address,
                    token0,
                    token1,
                    self.fee,
                    reserves.next().unwrap_or_default(),
                    reserves.next().unwrap_or_default(),
                    self.min_liquidity.unwrap_or(TYPICAL_MINIMAL_LIQUIDITY),
                    self.swap_gas_cost.unwrap_or(TYPICAL_SWAP_GAS_COST),
                )?;
                Ok(Box::new(pool))
            }
        }
    }
}

/// Source of the current pool set. Scheduling and chain access live with the
/// implementor; the router only pulls a snapshot when asked to refresh.
pub trait PoolDataSupplier {
    fn fetch_pools(&self) -> Result<Vec<PoolRecord>>;
}

/// Owned, mutable pool set on the supplier side of the snapshot boundary.
#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: BTreeMap<String, (PoolKind, Box<dyn Pool>)>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn get(&self, address: &str) -> Option<&dyn Pool> {
        self.pools
            .get(&address.to_lowercase())
            .map(|(_, pool)| pool.as_ref())
    }

    /// Makes `records` the full pool set. Known pools get their reserves
    /// replaced wholesale, new ones are constructed, pools missing from
    /// `records` are dropped. A known address whose kind or parameters
    /// changed is rebuilt from the record. Malformed records are skipped and
    /// returned.
    pub fn replace_all(&mut self, records: Vec<PoolRecord>) -> Vec<PoolError> {
        let mut rejected = vec![];
        let mut refreshed: BTreeMap<String, (PoolKind, Box<dyn Pool>)> = BTreeMap::new();

        for record in records {
            let key = record.address.to_lowercase();
            let known = self.pools.remove(&key).or_else(|| refreshed.remove(&key));
            let applied = record.parse_reserves().and_then(|reserves| match known {
                Some((kind, mut pool)) if record.describes(kind, pool.info()) => {
                    pool.update_reserves(reserves).map(|_| pool)
                }
                Some(_) => {
                    debug!(pool = %record.address, "pool definition changed, rebuilding");
                    record.build_pool(reserves)
                }
                None => record.build_pool(reserves),
            });
            match applied {
                Ok(pool) => {
                    refreshed.insert(key, (record.kind, pool));
                }
                Err(err) => {
                    warn!(pool = %record.address, error = %err, "rejecting pool record");
                    rejected.push(err);
                }
            }
        }

        debug!(pools = refreshed.len(), rejected = rejected.len(), "pool registry refreshed");
        self.pools = refreshed;
        rejected
    }

    /// Immutable graph over copies of the current pools.
    pub fn snapshot(&self) -> (LiquidityGraph, Vec<PoolError>) {
        LiquidityGraph::build(
            self.pools
                .values()
                .map(|(_, pool)| Arc::from(pool.clone_box()))
                .collect(),
        )
    }
}

/// Holds the latest published graph. Routing calls take an `Arc` to the
/// snapshot current at call time; publishing a new one never disturbs them.
pub struct SnapshotStore {
    current: ArcSwap<LiquidityGraph>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(LiquidityGraph::default())
    }
}

impl SnapshotStore {
    pub fn new(graph: LiquidityGraph) -> Self {
        Self {
            current: ArcSwap::from_pointee(graph),
        }
    }

    pub fn load(&self) -> Arc<LiquidityGraph> {
        self.current.load_full()
    }

    pub fn publish(&self, graph: LiquidityGraph) {
        self.current.store(Arc::new(graph));
    }

    /// Pulls the current pool set from `supplier`, applies it to `registry`
    /// and publishes the resulting graph. Returns every rejected pool.
    pub fn refresh<S: PoolDataSupplier + ?Sized>(
        &self,
        registry: &mut PoolRegistry,
        supplier: &S,
    ) -> Result<Vec<PoolError>> {
        let records = supplier
            .fetch_pools()
            .context("Error fetching pool data from supplier".to_string())?;
        let mut rejected = registry.replace_all(records);
        let (graph, excluded) = registry.snapshot();
        rejected.extend(excluded);
        self.publish(graph);
        Ok(rejected)
    }
}
