use crate::error::{CurrencyError, CurrencyResult};
use crate::types::Amount;
use serde::{Deserialize, Serialize};

/// Shared denominator for buy and sell rates.
pub const RATE_DENOMINATOR: u32 = 100;

/// Fixed buy/sell conversion between the reserve asset and Token1.
///
/// Both directions round down, so the issuer keeps the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateModel {
    buy_rate: u32,
    sell_rate: u32,
}

impl RateModel {
    pub fn new(buy_rate: u32, sell_rate: u32) -> CurrencyResult<Self> {
        for (name, rate) in [("buy", buy_rate), ("sell", sell_rate)] {
            if rate == 0 || rate > RATE_DENOMINATOR {
                return Err(CurrencyError::InvalidRateConfig(format!(
                    "{name} rate {rate} outside (0, {RATE_DENOMINATOR}]"
                )));
            }
        }
        if buy_rate <= sell_rate {
            return Err(CurrencyError::InvalidRateConfig(format!(
                "buy rate {buy_rate} must exceed sell rate {sell_rate}"
            )));
        }
        Ok(Self {
            buy_rate,
            sell_rate,
        })
    }

    pub fn buy_rate(&self) -> u32 {
        self.buy_rate
    }

    pub fn sell_rate(&self) -> u32 {
        self.sell_rate
    }

    /// `floor(reserve * buy / 100)`
    pub fn reserve_to_token1(&self, reserve_amount: Amount) -> CurrencyResult<Amount> {
        scale(reserve_amount, self.buy_rate)
    }

    /// `floor(tokens * sell / 100)`
    pub fn token1_to_reserve(&self, token_amount: Amount) -> CurrencyResult<Amount> {
        scale(token_amount, self.sell_rate)
    }
}

impl Default for RateModel {
    fn default() -> Self {
        Self {
            buy_rate: 100,
            sell_rate: 99,
        }
    }
}

fn scale(amount: Amount, numerator: u32) -> CurrencyResult<Amount> {
    amount
        .checked_mul(numerator as Amount)
        .map(|v| v / RATE_DENOMINATOR as Amount)
        .ok_or(CurrencyError::Overflow)
}
