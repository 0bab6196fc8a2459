// src/calculator.rs
use alloy::primitives::U256;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Decimals of every EVM native coin
pub const NATIVE_DECIMALS: u32 = 18;
/// Native amounts are submitted with 6 fractional digits
pub const NATIVE_PRECISION: u32 = 6;
/// Stablecoin amounts are submitted with cent precision
pub const STABLECOIN_PRECISION: u32 = 2;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CalcError {
    #[error("amount {0} cannot be represented")]
    Unrepresentable(f64),
    #[error("amount {0} overflows {1} decimals")]
    Overflow(f64, u32),
}

/// Quantities derived from a USD amount at the current rates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub tokens: f64,
    pub native: f64,
    pub stablecoin: f64,
}

fn safe_div(amount: f64, rate: f64) -> f64 {
    if !amount.is_finite() || !rate.is_finite() || rate <= 0.0 {
        return 0.0;
    }
    let q = amount / rate;
    if q.is_finite() && q > 0.0 {
        q
    } else {
        0.0
    }
}

pub fn token_quantity(usd: f64, price_per_token: f64) -> f64 {
    safe_div(usd, price_per_token)
}

pub fn native_quantity(usd: f64, native_usd: f64) -> f64 {
    safe_div(usd, native_usd)
}

/// 1 stablecoin is taken as 1 USD
pub fn stablecoin_quantity(usd: f64) -> f64 {
    if usd.is_finite() && usd > 0.0 {
        usd
    } else {
        0.0
    }
}

pub fn quote(usd: f64, price_per_token: f64, native_usd: f64) -> Quote {
    Quote {
        tokens: token_quantity(usd, price_per_token),
        native: native_quantity(usd, native_usd),
        stablecoin: stablecoin_quantity(usd),
    }
}

/// Round `amount` to `precision` digits, then scale to the token's smallest unit.
pub fn to_base_units(amount: f64, precision: u32, decimals: u32) -> Result<U256, CalcError> {
    let value = Decimal::from_f64(amount).ok_or(CalcError::Unrepresentable(amount))?;
    let rounded = value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);

    let scale = 10u64
        .checked_pow(decimals)
        .map(Decimal::from)
        .ok_or(CalcError::Overflow(amount, decimals))?;

    let units = rounded
        .checked_mul(scale)
        .ok_or(CalcError::Overflow(amount, decimals))?
        .trunc()
        .to_u128()
        .ok_or(CalcError::Unrepresentable(amount))?;

    Ok(U256::from(units))
}

pub fn native_to_wei(amount: f64) -> Result<U256, CalcError> {
    to_base_units(amount, NATIVE_PRECISION, NATIVE_DECIMALS)
}

pub fn stablecoin_to_units(amount: f64, decimals: u32) -> Result<U256, CalcError> {
    to_base_units(amount, STABLECOIN_PRECISION, decimals)
}
