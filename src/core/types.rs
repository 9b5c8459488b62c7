use super::pool::from_f64;
use super::token::Token;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

// Indices into the token and pool arenas of a LiquidityGraph
pub type TokenIdx = usize;
pub type PoolIdx = usize;

/// One directed use of a pool inside a candidate path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Hop {
    pub pool: PoolIdx,
    pub from: TokenIdx,
    pub to: TokenIdx,
    pub direction: bool,
}

/// A simple path from the source to the destination token.
#[derive(Clone, Debug, PartialEq)]
pub struct TradePath {
    pub hops: Vec<Hop>,
    pub price: f64, // product of the hops' fee-less marginal prices
}

impl TradePath {
    pub fn contains_pool(&self, pool: PoolIdx) -> bool {
        self.hops.iter().any(|hop| hop.pool == pool)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteStatus {
    Success,
    Partial,
    NoWay,
}

/// One pool swap of a materialized route.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub pool_address: String,
    pub token_from: Token,
    pub token_to: Token,
    pub direction: bool,
    pub assumed_amount_in: f64,
    pub assumed_amount_out: f64,
    // share of token_from's total outflow sent through this pool
    pub swap_portion: f64,
}

impl Leg {
    pub fn amount_in_units(&self) -> BigUint {
        from_f64(self.assumed_amount_in)
    }

    pub fn amount_out_units(&self) -> BigUint {
        from_f64(self.assumed_amount_out)
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiRoute {
    pub status: RouteStatus,
    pub from_token: Token,
    pub to_token: Token,
    pub amount_in: f64,
    pub amount_out: f64,
    pub legs: Vec<Leg>,
    pub price_impact: f64,
    pub total_gas_spent: u64,
}

impl MultiRoute {
    pub fn no_way(from_token: Token, to_token: Token) -> Self {
        Self {
            status: RouteStatus::NoWay,
            from_token,
            to_token,
            amount_in: 0.0,
            amount_out: 0.0,
            legs: vec![],
            price_impact: 0.0,
            total_gas_spent: 0,
        }
    }

    // Average realized price, out per in
    pub fn swap_price(&self) -> f64 {
        if self.amount_in > 0.0 {
            self.amount_out / self.amount_in
        } else {
            0.0
        }
    }
}
