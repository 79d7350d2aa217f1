use crate::error::CurrencyResult;
use crate::types::{Account, Amount};
use std::sync::Arc;

/// Fungible asset living outside the engine.
///
/// Used for the reserve token, for native value, and for claimable tokens.
/// `transfer` moves funds owned by `from` (the engine when releasing
/// reserve); `transfer_from` spends an allowance granted to `spender`.
pub trait FungibleAsset: Send + Sync {
    fn address(&self) -> &Account;

    fn balance_of(&self, account: &Account) -> CurrencyResult<Amount>;

    fn allowance(&self, owner: &Account, spender: &Account) -> CurrencyResult<Amount>;

    fn transfer(&self, from: &Account, to: &Account, amount: Amount) -> CurrencyResult<()>;

    fn transfer_from(
        &self,
        spender: &Account,
        owner: &Account,
        to: &Account,
        amount: Amount,
    ) -> CurrencyResult<()>;
}

/// Membership directory: referral inviters and community roles.
pub trait Directory: Send + Sync {
    fn inviter_of(&self, account: &Account) -> CurrencyResult<Option<Account>>;

    fn has_role(&self, account: &Account, role: &str) -> CurrencyResult<bool>;
}

/// Sink for transfer statistics. The significance threshold lives here.
pub trait StatsRecorder: Send + Sync {
    fn record_transfer(&self, recipient: &Account, amount: Amount) -> CurrencyResult<()>;
}

/// Resolves an address to a token contract. `None` means a plain account.
pub trait AssetLocator: Send + Sync {
    fn asset_at(&self, address: &Account) -> Option<Arc<dyn FungibleAsset>>;
}

/// Collaborators wired into an engine at construction.
#[derive(Clone)]
pub struct Collaborators {
    /// Reserve asset; for native reserves this is the native value bank.
    pub reserve: Arc<dyn FungibleAsset>,
    pub directory: Arc<dyn Directory>,
    pub stats: Arc<dyn StatsRecorder>,
    pub assets: Arc<dyn AssetLocator>,
}
