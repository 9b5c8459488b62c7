use thiserror::Error;

/// Conditions raised by a single pool. None of these abort a routing call:
/// the optimizer treats them as "this path cannot take more flow" and the
/// snapshot builder excludes the offending pool.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    #[error("pool {address}: insufficient liquidity")]
    InsufficientLiquidity { address: String },

    #[error("pool {address}: invalid pool data: {reason}")]
    InvalidPoolData { address: String, reason: String },
}

/// Request-level rejections returned by the routing entry points.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    #[error("liquidity graph contains no pools")]
    NoPools,

    #[error("source and destination are the same token: {0}")]
    SameToken(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("invalid gas price: {0}")]
    InvalidGasPrice(f64),

    #[error("invalid router configuration: {0}")]
    Config(String),
}
