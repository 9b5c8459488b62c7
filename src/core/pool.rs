use super::constants::{TYPICAL_MINIMAL_LIQUIDITY, TYPICAL_SWAP_GAS_COST};
use super::error::PoolError;
use super::token::Token;
use num_bigint::BigUint;
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use std::fmt::Debug;

/// Result of a quote: the amount on the other side of the swap and the gas
/// units a single pass through the pool costs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwapQuote {
    pub amount: f64,
    pub gas_spent: u64,
}

/// Fields shared by every pool variant.
#[derive(Clone, Debug)]
pub struct PoolInfo {
    pub address: String,
    pub tokens: Vec<Token>,
    pub fee: f64,
    pub reserves: Vec<BigUint>,
    pub min_liquidity: f64,
    pub swap_gas_cost: u64,
}

/// Pricing contract every pool variant implements.
///
/// `direction == true` swaps `tokens[0]` into `tokens[1]`. All quoting
/// functions are pure; only [`Pool::update_reserves`] mutates, and it is
/// called by the data supplier between routing calls, never during one.
pub trait Pool: Debug + Send + Sync {
    fn info(&self) -> &PoolInfo;

    /// Output for `amount_in` of the direction-selected input token. Fails with
    /// [`PoolError::InsufficientLiquidity`] when the output side would be left
    /// below `min_liquidity`.
    fn calc_out_by_in(&self, amount_in: f64, direction: bool) -> Result<SwapQuote, PoolError>;

    /// Input needed to receive `amount_out`. Returns `f64::INFINITY` as the
    /// amount when the pool cannot supply that much.
    fn calc_in_by_out(&self, amount_out: f64, direction: bool) -> SwapQuote;

    /// Marginal price (out per in) for an infinitesimal trade, fee excluded.
    fn calc_current_price_without_fee(&self, direction: bool) -> f64;

    /// Smallest input quantum of the direction-selected input token for which
    /// quoting is meaningful.
    fn granularity(&self, _direction: bool) -> f64 {
        1.0
    }

    /// Replaces all reserves at once.
    fn update_reserves(&mut self, reserves: Vec<BigUint>) -> Result<(), PoolError>;

    fn clone_box(&self) -> Box<dyn Pool>;

    fn address(&self) -> &str {
        &self.info().address
    }

    fn token_in(&self, direction: bool) -> &Token {
        let info = self.info();
        if direction {
            &info.tokens[0]
        } else {
            &info.tokens[1]
        }
    }

    fn token_out(&self, direction: bool) -> &Token {
        self.token_in(!direction)
    }
}

impl Clone for Box<dyn Pool> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

pub fn to_f64(value: &BigUint) -> f64 {
    value.to_f64().unwrap_or(f64::MAX)
}

// Truncates towards zero; negative and non-finite values map to zero
pub fn from_f64(value: f64) -> BigUint {
    if !value.is_finite() || value <= 0.0 {
        return BigUint::zero();
    }
    BigUint::from_f64(value.trunc()).unwrap_or_default()
}

/// Checks the invariants shared by all pool variants.
pub fn validate_pool_info(info: &PoolInfo) -> Result<(), PoolError> {
    let invalid = |reason: String| PoolError::InvalidPoolData {
        address: info.address.clone(),
        reason,
    };

    if info.tokens.len() != 2 {
        return Err(invalid(format!("expected 2 tokens, got {}", info.tokens.len())));
    }
    if info.reserves.len() != info.tokens.len() {
        return Err(invalid(format!(
            "{} reserves for {} tokens",
            info.reserves.len(),
            info.tokens.len()
        )));
    }
    if !(0.0..1.0).contains(&info.fee) {
        return Err(invalid(format!("fee {} outside [0, 1)", info.fee)));
    }
    if !info.min_liquidity.is_finite() || info.min_liquidity < 0.0 {
        return Err(invalid(format!("min liquidity {}", info.min_liquidity)));
    }
    if info.tokens[0] == info.tokens[1] {
        return Err(invalid(format!("both sides are {}", info.tokens[0].identity())));
    }
    Ok(())
}

/// Uniswap V2 style `x * y = k` pool.
#[derive(Clone, Debug)]
pub struct ConstantProductPool {
    info: PoolInfo,
    reserve0: f64,
    reserve1: f64,
}

impl ConstantProductPool {
    pub fn new(
        address: &str,
        token0: Token,
        token1: Token,
        fee: f64,
        reserve0: BigUint,
        reserve1: BigUint,
    ) -> Result<Self, PoolError> {
        Self::with_limits(
            address,
            token0,
            token1,
            fee,
            reserve0,
            reserve1,
            TYPICAL_MINIMAL_LIQUIDITY,
            TYPICAL_SWAP_GAS_COST,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_limits(
        address: &str,
        token0: Token,
        token1: Token,
        fee: f64,
        reserve0: BigUint,
        reserve1: BigUint,
        min_liquidity: f64,
        swap_gas_cost: u64,
    ) -> Result<Self, PoolError> {
        let reserve0_f64 = to_f64(&reserve0);
        let reserve1_f64 = to_f64(&reserve1);
        let info = PoolInfo {
            address: address.to_string(),
            tokens: vec![token0, token1],
            fee,
            reserves: vec![reserve0, reserve1],
            min_liquidity,
            swap_gas_cost,
        };
        validate_pool_info(&info)?;

        Ok(Self {
            info,
            reserve0: reserve0_f64,
            reserve1: reserve1_f64,
        })
    }

    fn oriented_reserves(&self, direction: bool) -> (f64, f64) {
        if direction {
            (self.reserve0, self.reserve1)
        } else {
            (self.reserve1, self.reserve0)
        }
    }

    /// Marginal price after `amount_in` has already been swapped.
    pub fn calc_price(&self, amount_in: f64, direction: bool, take_fee_into_account: bool) -> f64 {
        let (x, y) = self.oriented_reserves(direction);
        let one_minus_fee = if take_fee_into_account { 1.0 - self.info.fee } else { 1.0 };
        let xf = x / one_minus_fee;
        y * xf / (xf + amount_in) / (xf + amount_in)
    }

    /// Input after which the marginal price has dropped to `price`.
    pub fn calc_input_by_price(&self, price: f64, direction: bool, take_fee_into_account: bool) -> f64 {
        let (x, y) = self.oriented_reserves(direction);
        let one_minus_fee = if take_fee_into_account { 1.0 - self.info.fee } else { 1.0 };
        let xf = x / one_minus_fee;
        (y * xf / price).sqrt() - xf
    }

    pub fn liquidity(&self) -> f64 {
        (self.reserve0 * self.reserve1).sqrt()
    }
}

impl Pool for ConstantProductPool {
    fn info(&self) -> &PoolInfo {
        &self.info
    }

    fn calc_out_by_in(&self, amount_in: f64, direction: bool) -> Result<SwapQuote, PoolError> {
        let (x, y) = self.oriented_reserves(direction);
        let out = y * amount_in / (x / (1.0 - self.info.fee) + amount_in);
        if !out.is_finite() || y - out < self.info.min_liquidity {
            return Err(PoolError::InsufficientLiquidity {
                address: self.info.address.clone(),
            });
        }
        Ok(SwapQuote {
            amount: out,
            gas_spent: self.info.swap_gas_cost,
        })
    }

    fn calc_in_by_out(&self, amount_out: f64, direction: bool) -> SwapQuote {
        let (x, y) = self.oriented_reserves(direction);
        if y - amount_out < self.info.min_liquidity {
            return SwapQuote {
                amount: f64::INFINITY,
                gas_spent: self.info.swap_gas_cost,
            };
        }
        let input = x * amount_out / (1.0 - self.info.fee) / (y - amount_out);
        SwapQuote {
            amount: input,
            gas_spent: self.info.swap_gas_cost,
        }
    }

    fn calc_current_price_without_fee(&self, direction: bool) -> f64 {
        self.calc_price(0.0, direction, false)
    }

    fn update_reserves(&mut self, reserves: Vec<BigUint>) -> Result<(), PoolError> {
        if reserves.len() != 2 {
            return Err(PoolError::InvalidPoolData {
                address: self.info.address.clone(),
                reason: format!("{} reserves for 2 tokens", reserves.len()),
            });
        }
        self.reserve0 = to_f64(&reserves[0]);
        self.reserve1 = to_f64(&reserves[1]);
        self.info.reserves = reserves;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Pool> {
        Box::new(self.clone())
    }
}
