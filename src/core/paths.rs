use super::token_graph::LiquidityGraph;
use super::types::{Hop, TokenIdx, TradePath};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Clone)]
struct PartialPath {
    hops: Vec<Hop>,
    visited: Vec<TokenIdx>,
    weight: f64, // sum of -ln(price) over hops
}

impl PartialPath {
    fn head(&self) -> TokenIdx {
        *self.visited.last().unwrap_or(&0)
    }
}

/// Finds up to `max_paths` simple paths of at most `max_hops` pools from
/// `from` to `to`, best fee-less marginal price first.
///
/// This is a beam search over `-ln(price)` edge weights, layered by hop
/// count. Every layer keeps at most `max_paths` partial paths per token, so
/// parallel pools on every hop cannot blow the frontier up combinatorially.
/// Pruning is greedy: the result is a ranked candidate set, not a guarantee
/// that the best-priced path was found.
pub fn discover_paths(
    graph: &LiquidityGraph,
    from: TokenIdx,
    to: TokenIdx,
    max_hops: usize,
    max_paths: usize,
) -> Vec<TradePath> {
    let mut found: Vec<PartialPath> = vec![];
    let mut frontier = vec![PartialPath {
        hops: vec![],
        visited: vec![from],
        weight: 0.0,
    }];

    for _ in 0..max_hops {
        // BTreeMap keeps expansion order deterministic
        let mut next: BTreeMap<TokenIdx, Vec<PartialPath>> = BTreeMap::new();

        for partial in &frontier {
            for hop in graph.edges_from(partial.head()) {
                if partial.visited.contains(&hop.to) {
                    continue;
                }
                let price = graph
                    .pool(hop.pool)
                    .calc_current_price_without_fee(hop.direction);
                if !price.is_finite() || price <= 0.0 {
                    continue;
                }

                let mut extended = partial.clone();
                extended.hops.push(*hop);
                extended.visited.push(hop.to);
                extended.weight -= price.ln();

                if hop.to == to {
                    found.push(extended);
                } else {
                    next.entry(hop.to).or_default().push(extended);
                }
            }
        }

        frontier = next
            .into_values()
            .flat_map(|mut candidates| {
                sort_by_weight(&mut candidates);
                candidates.truncate(max_paths);
                candidates
            })
            .collect();
        if frontier.is_empty() {
            break;
        }
    }

    sort_by_weight(&mut found);
    found.truncate(max_paths);
    debug!(from, to, paths = found.len(), "discovered candidate paths");

    found
        .into_iter()
        .map(|partial| TradePath {
            price: (-partial.weight).exp(),
            hops: partial.hops,
        })
        .collect()
}

// Stable: equal weights keep discovery order, and shorter paths were found first
fn sort_by_weight(paths: &mut [PartialPath]) {
    paths.sort_by(|a, b| a.weight.total_cmp(&b.weight));
}
