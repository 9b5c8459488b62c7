use crate::core::token::Token;
use serde::{Deserialize, Serialize};

/// Tuning parameters of the router. Loaded from TOML, see [`RouterConfig::load_from`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    pub max_hops: usize,
    pub max_paths: usize,
    pub steps: usize,
    pub iteration_cap: usize,
    pub deadline_ms: Option<u64>,
    pub rounding_tolerance: f64,
}

/// A trade to route. `amount` is the fixed side: input for the exact-in
/// entry points, desired output for the exact-out one.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RouteRequest {
    pub from: Token,
    pub to: Token,
    pub amount: f64,
    // input-token units per gas unit
    #[serde(default)]
    pub gas_price: f64,
}

impl RouteRequest {
    pub fn new(from: Token, to: Token, amount: f64) -> Self {
        Self {
            from,
            to,
            amount,
            gas_price: 0.0,
        }
    }

    pub fn with_gas_price(mut self, gas_price: f64) -> Self {
        self.gas_price = gas_price;
        self
    }
}
