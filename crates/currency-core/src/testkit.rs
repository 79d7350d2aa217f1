//! Minimal in-crate fakes for engine unit tests.

use crate::collaborators::{AssetLocator, Collaborators, Directory, FungibleAsset, StatsRecorder};
use crate::config::CurrencyConfig;
use crate::engine::CurrencyEngine;
use crate::error::{CurrencyError, CurrencyResult};
use crate::types::{Account, Amount, ReserveKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const RESERVE_TOKEN: &str = "reserve-token";

pub struct FakeAsset {
    address: Account,
    balances: Mutex<HashMap<Account, Amount>>,
}

impl FakeAsset {
    pub fn new(address: &str) -> Self {
        Self {
            address: Account::new(address),
            balances: Mutex::new(HashMap::new()),
        }
    }

    pub fn balance(&self, account: &str) -> Amount {
        self.balance_of(&Account::new(account)).unwrap()
    }

    pub fn credit(&self, account: &str, amount: Amount) {
        *self
            .balances
            .lock()
            .unwrap()
            .entry(Account::new(account))
            .or_insert(0) += amount;
    }

    pub fn drain(&self, account: &Account) {
        self.balances.lock().unwrap().remove(account);
    }
}

impl FungibleAsset for FakeAsset {
    fn address(&self) -> &Account {
        &self.address
    }

    fn balance_of(&self, account: &Account) -> CurrencyResult<Amount> {
        Ok(self.balances.lock().unwrap().get(account).copied().unwrap_or(0))
    }

    // Unlimited allowances; allowance edge cases live in the adapters crate.
    fn allowance(&self, _owner: &Account, _spender: &Account) -> CurrencyResult<Amount> {
        Ok(Amount::MAX)
    }

    fn transfer(&self, from: &Account, to: &Account, amount: Amount) -> CurrencyResult<()> {
        let mut balances = self.balances.lock().unwrap();
        let have = balances.get(from).copied().unwrap_or(0);
        if have < amount {
            return Err(CurrencyError::collaborator("fake-asset", "insufficient funds"));
        }
        balances.insert(from.clone(), have - amount);
        *balances.entry(to.clone()).or_insert(0) += amount;
        Ok(())
    }

    fn transfer_from(
        &self,
        _spender: &Account,
        owner: &Account,
        to: &Account,
        amount: Amount,
    ) -> CurrencyResult<()> {
        self.transfer(owner, to, amount)
    }
}

/// Map-backed locator.
#[derive(Default)]
pub struct AssetRegistry {
    assets: HashMap<Account, Arc<dyn FungibleAsset>>,
}

impl AssetRegistry {
    pub fn register(&mut self, asset: Arc<dyn FungibleAsset>) {
        self.assets.insert(asset.address().clone(), asset);
    }
}

impl AssetLocator for AssetRegistry {
    fn asset_at(&self, address: &Account) -> Option<Arc<dyn FungibleAsset>> {
        self.assets.get(address).cloned()
    }
}

pub struct NoDirectory;

impl Directory for NoDirectory {
    fn inviter_of(&self, _account: &Account) -> CurrencyResult<Option<Account>> {
        Ok(None)
    }

    fn has_role(&self, _account: &Account, _role: &str) -> CurrencyResult<bool> {
        Ok(false)
    }
}

pub struct NullStats;

impl StatsRecorder for NullStats {
    fn record_transfer(&self, _recipient: &Account, _amount: Amount) -> CurrencyResult<()> {
        Ok(())
    }
}

pub struct Fixture {
    pub engine: CurrencyEngine,
    pub reserve: Arc<FakeAsset>,
}

impl Fixture {
    pub fn native() -> Self {
        Self::build(ReserveKind::Native, "native")
    }

    pub fn token() -> Self {
        Self::build(
            ReserveKind::Token {
                address: Account::new(RESERVE_TOKEN),
            },
            RESERVE_TOKEN,
        )
    }

    fn build(reserve_kind: ReserveKind, reserve_address: &str) -> Self {
        let reserve = Arc::new(FakeAsset::new(reserve_address));
        let mut assets = AssetRegistry::default();
        assets.register(reserve.clone());

        let config = CurrencyConfig {
            reserve: reserve_kind,
            ..CurrencyConfig::default()
        };
        let collaborators = Collaborators {
            reserve: reserve.clone(),
            directory: Arc::new(NoDirectory),
            stats: Arc::new(NullStats),
            assets: Arc::new(assets),
        };
        let engine = CurrencyEngine::new(config, collaborators).unwrap();
        Self { engine, reserve }
    }

    pub fn fund(&self, account: &str, amount: Amount) {
        self.reserve.credit(account, amount);
    }
}
