//! In-memory collaborator adapters for the currency engine.
//!
//! These back the CLI simulator and the scenario tests: a mintable token
//! with allowances, a native value bank, a membership directory, a
//! threshold-based statistics recorder, and a few deliberately failing
//! variants for chaos testing.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use currency_core::collaborators::{AssetLocator, Directory, FungibleAsset, StatsRecorder};
use currency_core::error::{CurrencyError, CurrencyResult};
use currency_core::types::{Account, Amount};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::debug;

/// Address used for the native value bank.
pub const NATIVE_ADDRESS: &str = "native";

fn poisoned(collaborator: &str) -> CurrencyError {
    CurrencyError::collaborator(collaborator, "state lock poisoned")
}

#[derive(Debug, Default)]
struct TokenState {
    balances: BTreeMap<Account, Amount>,
    allowances: HashMap<(Account, Account), Amount>,
}

impl TokenState {
    fn move_funds(
        &mut self,
        collaborator: &str,
        from: &Account,
        to: &Account,
        amount: Amount,
    ) -> CurrencyResult<()> {
        let have = self.balances.get(from).copied().unwrap_or(0);
        if have < amount {
            return Err(CurrencyError::collaborator(
                collaborator,
                format!("{from} holds {have}, cannot send {amount}"),
            ));
        }
        let credited = self
            .balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(CurrencyError::Overflow)?;
        self.balances.insert(from.clone(), have - amount);
        self.balances.insert(to.clone(), credited);
        Ok(())
    }
}

/// Mintable ERC20-style token held in memory.
#[derive(Debug)]
pub struct InMemoryToken {
    address: Account,
    state: Mutex<TokenState>,
}

impl InMemoryToken {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: Account::new(address),
            state: Mutex::new(TokenState::default()),
        }
    }

    fn state(&self) -> CurrencyResult<MutexGuard<'_, TokenState>> {
        self.state.lock().map_err(|_| poisoned(self.address.as_str()))
    }

    pub fn mint(&self, account: &Account, amount: Amount) -> CurrencyResult<()> {
        let mut state = self.state()?;
        let balance = state.balances.entry(account.clone()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(CurrencyError::Overflow)?;
        debug!(token = %self.address, account = %account, amount, "Minted");
        Ok(())
    }

    pub fn approve(&self, owner: &Account, spender: &Account, amount: Amount) -> CurrencyResult<()> {
        self.state()?
            .allowances
            .insert((owner.clone(), spender.clone()), amount);
        Ok(())
    }

    pub fn balances(&self) -> CurrencyResult<BTreeMap<Account, Amount>> {
        Ok(self.state()?.balances.clone())
    }
}

impl FungibleAsset for InMemoryToken {
    fn address(&self) -> &Account {
        &self.address
    }

    fn balance_of(&self, account: &Account) -> CurrencyResult<Amount> {
        Ok(self.state()?.balances.get(account).copied().unwrap_or(0))
    }

    fn allowance(&self, owner: &Account, spender: &Account) -> CurrencyResult<Amount> {
        Ok(self
            .state()?
            .allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0))
    }

    fn transfer(&self, from: &Account, to: &Account, amount: Amount) -> CurrencyResult<()> {
        self.state()?
            .move_funds(self.address.as_str(), from, to, amount)
    }

    fn transfer_from(
        &self,
        spender: &Account,
        owner: &Account,
        to: &Account,
        amount: Amount,
    ) -> CurrencyResult<()> {
        let mut state = self.state()?;
        let key = (owner.clone(), spender.clone());
        let allowed = state.allowances.get(&key).copied().unwrap_or(0);
        if allowed < amount {
            return Err(CurrencyError::AllowanceExceeded {
                allowed,
                requested: amount,
            });
        }
        state.move_funds(self.address.as_str(), owner, to, amount)?;
        state.allowances.insert(key, allowed - amount);
        Ok(())
    }
}

/// Native value: balances only, no allowances.
#[derive(Debug)]
pub struct NativeValueBank {
    address: Account,
    state: Mutex<TokenState>,
}

impl Default for NativeValueBank {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeValueBank {
    pub fn new() -> Self {
        Self {
            address: Account::new(NATIVE_ADDRESS),
            state: Mutex::new(TokenState::default()),
        }
    }

    fn state(&self) -> CurrencyResult<MutexGuard<'_, TokenState>> {
        self.state.lock().map_err(|_| poisoned(NATIVE_ADDRESS))
    }

    /// Credit an account with native value out of thin air.
    pub fn fund(&self, account: &Account, amount: Amount) -> CurrencyResult<()> {
        let mut state = self.state()?;
        let balance = state.balances.entry(account.clone()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(CurrencyError::Overflow)?;
        Ok(())
    }

    pub fn balances(&self) -> CurrencyResult<BTreeMap<Account, Amount>> {
        Ok(self.state()?.balances.clone())
    }
}

impl FungibleAsset for NativeValueBank {
    fn address(&self) -> &Account {
        &self.address
    }

    fn balance_of(&self, account: &Account) -> CurrencyResult<Amount> {
        Ok(self.state()?.balances.get(account).copied().unwrap_or(0))
    }

    fn allowance(&self, _owner: &Account, _spender: &Account) -> CurrencyResult<Amount> {
        Ok(0)
    }

    fn transfer(&self, from: &Account, to: &Account, amount: Amount) -> CurrencyResult<()> {
        self.state()?.move_funds(NATIVE_ADDRESS, from, to, amount)
    }

    fn transfer_from(
        &self,
        _spender: &Account,
        _owner: &Account,
        _to: &Account,
        _amount: Amount,
    ) -> CurrencyResult<()> {
        Err(CurrencyError::collaborator(
            NATIVE_ADDRESS,
            "native value cannot be pulled through an allowance",
        ))
    }
}

/// Inviter links and community roles.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inviters: RwLock<HashMap<Account, Account>>,
    roles: RwLock<HashMap<String, BTreeSet<Account>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_inviter(&self, account: &Account, inviter: &Account) -> CurrencyResult<()> {
        self.inviters
            .write()
            .map_err(|_| poisoned("directory"))?
            .insert(account.clone(), inviter.clone());
        Ok(())
    }

    pub fn grant_role(&self, account: &Account, role: &str) -> CurrencyResult<()> {
        self.roles
            .write()
            .map_err(|_| poisoned("directory"))?
            .entry(role.to_string())
            .or_default()
            .insert(account.clone());
        Ok(())
    }

    pub fn revoke_role(&self, account: &Account, role: &str) -> CurrencyResult<()> {
        if let Some(holders) = self
            .roles
            .write()
            .map_err(|_| poisoned("directory"))?
            .get_mut(role)
        {
            holders.remove(account);
        }
        Ok(())
    }
}

impl Directory for InMemoryDirectory {
    fn inviter_of(&self, account: &Account) -> CurrencyResult<Option<Account>> {
        Ok(self
            .inviters
            .read()
            .map_err(|_| poisoned("directory"))?
            .get(account)
            .cloned())
    }

    fn has_role(&self, account: &Account, role: &str) -> CurrencyResult<bool> {
        Ok(self
            .roles
            .read()
            .map_err(|_| poisoned("directory"))?
            .get(role)
            .is_some_and(|holders| holders.contains(account)))
    }
}

/// A transfer the recorder judged significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatAdded {
    pub recipient: Account,
    pub amount: Amount,
    pub recorded_at: DateTime<Utc>,
}

/// Records transfers of at least `threshold`.
#[derive(Debug)]
pub struct InMemoryStatsRecorder {
    threshold: Amount,
    entries: Mutex<Vec<StatAdded>>,
}

impl InMemoryStatsRecorder {
    pub fn new(threshold: Amount) -> Self {
        Self {
            threshold,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn entries(&self) -> CurrencyResult<Vec<StatAdded>> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| poisoned("stats"))?
            .clone())
    }

    pub fn recorded_for(&self, recipient: &Account) -> CurrencyResult<Vec<StatAdded>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|entry| entry.recipient == *recipient)
            .collect())
    }
}

impl StatsRecorder for InMemoryStatsRecorder {
    fn record_transfer(&self, recipient: &Account, amount: Amount) -> CurrencyResult<()> {
        if amount < self.threshold {
            return Ok(());
        }
        self.entries
            .lock()
            .map_err(|_| poisoned("stats"))?
            .push(StatAdded {
                recipient: recipient.clone(),
                amount,
                recorded_at: Utc::now(),
            });
        Ok(())
    }
}

/// Recorder that rejects every notification.
#[derive(Debug, Clone)]
pub struct AlwaysFailRecorder {
    reason: String,
}

impl AlwaysFailRecorder {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl StatsRecorder for AlwaysFailRecorder {
    fn record_transfer(&self, _recipient: &Account, _amount: Amount) -> CurrencyResult<()> {
        Err(CurrencyError::collaborator("stats", self.reason.clone()))
    }
}

/// Wraps an asset and refuses any movement into a blocked account.
pub struct RejectingAsset {
    inner: Arc<dyn FungibleAsset>,
    blocked: Account,
}

impl RejectingAsset {
    pub fn new(inner: Arc<dyn FungibleAsset>, blocked: Account) -> Self {
        Self { inner, blocked }
    }

    fn guard(&self, to: &Account) -> CurrencyResult<()> {
        if *to == self.blocked {
            return Err(CurrencyError::collaborator(
                self.inner.address().as_str(),
                format!("recipient {to} rejected the transfer"),
            ));
        }
        Ok(())
    }
}

impl FungibleAsset for RejectingAsset {
    fn address(&self) -> &Account {
        self.inner.address()
    }

    fn balance_of(&self, account: &Account) -> CurrencyResult<Amount> {
        self.inner.balance_of(account)
    }

    fn allowance(&self, owner: &Account, spender: &Account) -> CurrencyResult<Amount> {
        self.inner.allowance(owner, spender)
    }

    fn transfer(&self, from: &Account, to: &Account, amount: Amount) -> CurrencyResult<()> {
        self.guard(to)?;
        self.inner.transfer(from, to, amount)
    }

    fn transfer_from(
        &self,
        spender: &Account,
        owner: &Account,
        to: &Account,
        amount: Amount,
    ) -> CurrencyResult<()> {
        self.guard(to)?;
        self.inner.transfer_from(spender, owner, to, amount)
    }
}

/// Address book of token contracts, shareable before registration ends.
#[derive(Default)]
pub struct AssetBook {
    assets: RwLock<HashMap<Account, Arc<dyn FungibleAsset>>>,
}

impl AssetBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, asset: Arc<dyn FungibleAsset>) -> CurrencyResult<()> {
        self.assets
            .write()
            .map_err(|_| poisoned("asset-book"))?
            .insert(asset.address().clone(), asset);
        Ok(())
    }
}

impl AssetLocator for AssetBook {
    fn asset_at(&self, address: &Account) -> Option<Arc<dyn FungibleAsset>> {
        self.assets.read().ok()?.get(address).cloned()
    }
}
