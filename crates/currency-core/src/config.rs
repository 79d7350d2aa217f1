use crate::error::{CurrencyError, CurrencyResult};
use crate::rate::RateModel;
use crate::referral::ReferralHook;
use crate::types::{Account, ReserveKind};
use crate::whitelist::MEMBERS_ROLE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Construction parameters for a currency engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyConfig {
    pub name: String,
    pub symbol: String,
    /// Address of the engine itself; Token1 sent here is redeemed.
    pub address: Account,
    /// Initial administrative owner (the deployer).
    pub owner: Account,
    pub reserve: ReserveKind,
    pub buy_rate: u32,
    pub sell_rate: u32,
    /// Referral commission in parts per million of each deposit.
    pub commission_ppm: u32,
    /// Community role whose holders may send plain transfers.
    pub members_role: String,
    /// When false every account may send plain transfers.
    pub whitelist_enforced: bool,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            name: "Token1".to_string(),
            symbol: "T1".to_string(),
            address: Account::new("currency"),
            owner: Account::new("owner"),
            reserve: ReserveKind::Native,
            buy_rate: 100,
            sell_rate: 99,
            // 3%
            commission_ppm: 30_000,
            members_role: MEMBERS_ROLE.to_string(),
            whitelist_enforced: true,
        }
    }
}

impl CurrencyConfig {
    pub fn from_toml_str(contents: &str) -> CurrencyResult<Self> {
        let config: CurrencyConfig =
            toml::from_str(contents).map_err(|e| CurrencyError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> CurrencyResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CurrencyError::InvalidConfig(format!("read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> CurrencyResult<()> {
        if self.name.trim().is_empty() || self.symbol.trim().is_empty() {
            return Err(CurrencyError::InvalidConfig(
                "name and symbol must be non-empty".into(),
            ));
        }
        if self.address == self.owner {
            return Err(CurrencyError::InvalidConfig(
                "engine address cannot be the owner".into(),
            ));
        }
        if let ReserveKind::Token { address } = &self.reserve {
            if *address == self.address {
                return Err(CurrencyError::InvalidConfig(
                    "reserve token cannot be the engine itself".into(),
                ));
            }
        }
        self.rate_model()?;
        self.referral_hook()?;
        Ok(())
    }

    pub fn rate_model(&self) -> CurrencyResult<RateModel> {
        RateModel::new(self.buy_rate, self.sell_rate)
    }

    pub fn referral_hook(&self) -> CurrencyResult<ReferralHook> {
        ReferralHook::new(self.commission_ppm)
    }
}
