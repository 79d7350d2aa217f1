use crate::collaborators::Directory;
use crate::error::{CurrencyError, CurrencyResult};
use crate::types::{Account, Amount};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parts-per-million denominator for the commission rate.
pub const COMMISSION_DENOMINATOR: u32 = 1_000_000;

/// How a deposit is split between the inviter and conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    pub inviter: Option<Account>,
    pub commission: Amount,
    pub remainder: Amount,
}

/// Commission computation for deposits made by invited accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralHook {
    commission_ppm: u32,
}

impl ReferralHook {
    pub fn new(commission_ppm: u32) -> CurrencyResult<Self> {
        if commission_ppm > COMMISSION_DENOMINATOR {
            return Err(CurrencyError::InvalidConfig(format!(
                "commission {commission_ppm} ppm exceeds {COMMISSION_DENOMINATOR}"
            )));
        }
        Ok(Self { commission_ppm })
    }

    pub fn commission_ppm(&self) -> u32 {
        self.commission_ppm
    }

    /// `floor(amount * ppm / 1_000_000)`
    pub fn commission_for(&self, amount: Amount) -> CurrencyResult<Amount> {
        amount
            .checked_mul(self.commission_ppm as Amount)
            .map(|v| v / COMMISSION_DENOMINATOR as Amount)
            .ok_or(CurrencyError::Overflow)
    }

    /// Look up the depositor's inviter and split the deposit.
    ///
    /// Self-referrals and missing inviters leave the full amount for conversion.
    pub fn split(
        &self,
        directory: &dyn Directory,
        depositor: &Account,
        amount: Amount,
    ) -> CurrencyResult<CommissionSplit> {
        let inviter = directory
            .inviter_of(depositor)?
            .filter(|inviter| inviter != depositor);

        let Some(inviter) = inviter else {
            return Ok(CommissionSplit {
                inviter: None,
                commission: 0,
                remainder: amount,
            });
        };

        let commission = self.commission_for(amount)?;
        debug!(
            depositor = %depositor,
            inviter = %inviter,
            amount,
            commission,
            "Referral commission computed"
        );

        Ok(CommissionSplit {
            inviter: Some(inviter),
            commission,
            remainder: amount - commission,
        })
    }
}
