use super::error::PoolError;
use super::pool::{validate_pool_info, Pool};
use super::token::Token;
use super::types::{Hop, PoolIdx, TokenIdx};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Immutable snapshot of the known pools, indexed as a token graph.
///
/// Tokens and pools live in flat arenas and are referenced by index. Parallel
/// pools between the same pair are kept side by side in `pairs`.
#[derive(Debug, Default)]
pub struct LiquidityGraph {
    tokens: Vec<Token>,
    token_index: HashMap<String, TokenIdx>,
    pools: Vec<Arc<dyn Pool>>,
    pool_tokens: Vec<(TokenIdx, TokenIdx)>,
    pairs: HashMap<(TokenIdx, TokenIdx), Vec<PoolIdx>>,
    edges: Vec<Vec<Hop>>,
}

impl LiquidityGraph {
    /// Builds a graph from a pool set. Malformed pools and repeated addresses
    /// are left out and returned alongside the graph.
    pub fn build(pools: Vec<Arc<dyn Pool>>) -> (Self, Vec<PoolError>) {
        let mut graph = LiquidityGraph::default();
        let mut rejected = vec![];
        let mut seen_addresses = HashSet::new();

        for pool in pools {
            let info = pool.info();
            if let Err(err) = validate_pool_info(info) {
                warn!(pool = %info.address, error = %err, "excluding pool from snapshot");
                rejected.push(err);
                continue;
            }
            if !seen_addresses.insert(info.address.to_lowercase()) {
                let err = PoolError::InvalidPoolData {
                    address: info.address.clone(),
                    reason: "duplicate pool address in snapshot".to_string(),
                };
                warn!(pool = %info.address, "excluding duplicate pool from snapshot");
                rejected.push(err);
                continue;
            }
            graph.add_pool(pool);
        }

        debug!(
            tokens = graph.tokens.len(),
            pools = graph.pools.len(),
            rejected = rejected.len(),
            "built liquidity graph"
        );
        (graph, rejected)
    }

    fn add_pool(&mut self, pool: Arc<dyn Pool>) {
        let pool_idx = self.pools.len();
        // direction == true swaps tokens[0] into tokens[1]
        let a = self.intern_token(&pool.info().tokens[0]);
        let b = self.intern_token(&pool.info().tokens[1]);

        self.pairs.entry(pair_key(a, b)).or_default().push(pool_idx);
        self.edges[a].push(Hop { pool: pool_idx, from: a, to: b, direction: true });
        self.edges[b].push(Hop { pool: pool_idx, from: b, to: a, direction: false });
        self.pool_tokens.push((a, b));
        self.pools.push(pool);
    }

    fn intern_token(&mut self, token: &Token) -> TokenIdx {
        let identity = token.identity();
        if let Some(&idx) = self.token_index.get(&identity) {
            return idx;
        }
        let idx = self.tokens.len();
        self.tokens.push(token.clone());
        self.edges.push(vec![]);
        self.token_index.insert(identity, idx);
        idx
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn token_index(&self, token: &Token) -> Option<TokenIdx> {
        self.token_index.get(&token.identity()).copied()
    }

    pub fn token(&self, idx: TokenIdx) -> &Token {
        &self.tokens[idx]
    }

    pub fn pool(&self, idx: PoolIdx) -> &dyn Pool {
        self.pools[idx].as_ref()
    }

    /// Input and output token of `pool` when swapped in `direction`.
    pub fn pool_tokens(&self, pool: PoolIdx, direction: bool) -> (TokenIdx, TokenIdx) {
        let (a, b) = self.pool_tokens[pool];
        if direction {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn pools(&self) -> &[Arc<dyn Pool>] {
        &self.pools
    }

    /// Directed edges leaving `token`, one per adjacent pool.
    pub fn edges_from(&self, token: TokenIdx) -> &[Hop] {
        self.edges.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All pools directly connecting two tokens, in insertion order.
    pub fn pools_between(&self, a: &Token, b: &Token) -> Vec<&dyn Pool> {
        let (Some(a), Some(b)) = (self.token_index(a), self.token_index(b)) else {
            return vec![];
        };
        self.pairs
            .get(&pair_key(a, b))
            .map(|indices| indices.iter().map(|&idx| self.pool(idx)).collect())
            .unwrap_or_default()
    }
}

fn pair_key(a: TokenIdx, b: TokenIdx) -> (TokenIdx, TokenIdx) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
