//! Shared fixtures for the scenario and property suites.
//!
//! A [`Harness`] owns an engine wired to in-memory collaborators and keeps
//! typed handles on each of them, so tests can fund accounts, grant roles,
//! and inspect the reserve side of every flow.

use currency_adapters::{
    AlwaysFailRecorder, AssetBook, InMemoryDirectory, InMemoryStatsRecorder, InMemoryToken,
    NativeValueBank, RejectingAsset,
};
use currency_core::{
    Account, Amount, Collaborators, CurrencyConfig, CurrencyEngine, FungibleAsset, ReserveKind,
    StatsRecorder,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One whole Token1 (18 decimals).
pub const E18: Amount = 1_000_000_000_000_000_000;

/// Address of the reserve token in token-reserve harnesses.
pub const RESERVE_TOKEN: &str = "token2";

pub fn acct(id: &str) -> Account {
    Account::new(id)
}

enum Reserve {
    Native(Arc<NativeValueBank>),
    Token(Arc<InMemoryToken>),
}

pub struct HarnessBuilder {
    config: CurrencyConfig,
    stats_threshold: Amount,
    failing_stats: bool,
    blocked_reserve_recipient: Option<Account>,
    claimables: Vec<Account>,
}

impl HarnessBuilder {
    fn with_reserve(reserve: ReserveKind) -> Self {
        Self {
            config: CurrencyConfig {
                reserve,
                ..CurrencyConfig::default()
            },
            stats_threshold: 0,
            failing_stats: false,
            blocked_reserve_recipient: None,
            claimables: Vec::new(),
        }
    }

    pub fn rates(mut self, buy_rate: u32, sell_rate: u32) -> Self {
        self.config.buy_rate = buy_rate;
        self.config.sell_rate = sell_rate;
        self
    }

    pub fn commission_ppm(mut self, ppm: u32) -> Self {
        self.config.commission_ppm = ppm;
        self
    }

    pub fn members_role(mut self, role: &str) -> Self {
        self.config.members_role = role.to_string();
        self
    }

    pub fn whitelist_enforced(mut self, enforced: bool) -> Self {
        self.config.whitelist_enforced = enforced;
        self
    }

    pub fn stats_threshold(mut self, threshold: Amount) -> Self {
        self.stats_threshold = threshold;
        self
    }

    pub fn failing_stats(mut self) -> Self {
        self.failing_stats = true;
        self
    }

    /// Make every reserve movement into `account` fail.
    pub fn reject_reserve_to(mut self, account: &str) -> Self {
        self.blocked_reserve_recipient = Some(acct(account));
        self
    }

    /// Deploy a third-party token contract the engine can see.
    pub fn claimable(mut self, address: &str) -> Self {
        self.claimables.push(acct(address));
        self
    }

    pub fn build(self) -> Harness {
        let assets = Arc::new(AssetBook::new());
        let (reserve, inner): (Reserve, Arc<dyn FungibleAsset>) = match &self.config.reserve {
            ReserveKind::Native => {
                let bank = Arc::new(NativeValueBank::new());
                let asset: Arc<dyn FungibleAsset> = bank.clone();
                (Reserve::Native(bank), asset)
            }
            ReserveKind::Token { address } => {
                let token = Arc::new(InMemoryToken::new(address.as_str()));
                let asset: Arc<dyn FungibleAsset> = token.clone();
                (Reserve::Token(token), asset)
            }
        };
        if let Reserve::Token(token) = &reserve {
            assets.register(token.clone()).expect("register reserve token");
        }
        let reserve_asset: Arc<dyn FungibleAsset> = match self.blocked_reserve_recipient {
            Some(blocked) => Arc::new(RejectingAsset::new(inner, blocked)),
            None => inner,
        };

        let mut claimables = BTreeMap::new();
        for address in self.claimables {
            let token = Arc::new(InMemoryToken::new(address.as_str()));
            assets.register(token.clone()).expect("register claimable");
            claimables.insert(address, token);
        }

        let directory = Arc::new(InMemoryDirectory::new());
        let stats = Arc::new(InMemoryStatsRecorder::new(self.stats_threshold));
        let recorder: Arc<dyn StatsRecorder> = if self.failing_stats {
            Arc::new(AlwaysFailRecorder::new("recorder offline"))
        } else {
            stats.clone()
        };

        let engine = CurrencyEngine::new(
            self.config,
            Collaborators {
                reserve: reserve_asset,
                directory: directory.clone(),
                stats: recorder,
                assets,
            },
        )
        .expect("engine construction");

        Harness {
            engine,
            reserve,
            claimables,
            directory,
            stats,
        }
    }
}

pub struct Harness {
    pub engine: CurrencyEngine,
    reserve: Reserve,
    claimables: BTreeMap<Account, Arc<InMemoryToken>>,
    directory: Arc<InMemoryDirectory>,
    stats: Arc<InMemoryStatsRecorder>,
}

impl Harness {
    /// Native-value reserve, default configuration.
    pub fn native() -> HarnessBuilder {
        HarnessBuilder::with_reserve(ReserveKind::Native)
    }

    /// Reserve held as the `token2` ERC20-style token.
    pub fn token() -> HarnessBuilder {
        HarnessBuilder::with_reserve(ReserveKind::Token {
            address: acct(RESERVE_TOKEN),
        })
    }

    pub fn owner(&self) -> Account {
        self.engine.owner().clone()
    }

    pub fn engine_address(&self) -> Account {
        self.engine.address().clone()
    }

    /// Credit reserve asset to `account`.
    pub fn fund(&self, account: &str, amount: Amount) {
        match &self.reserve {
            Reserve::Native(bank) => bank.fund(&acct(account), amount).expect("fund"),
            Reserve::Token(token) => token.mint(&acct(account), amount).expect("mint"),
        }
    }

    /// Approve the engine to pull reserve tokens from `owner`.
    pub fn approve_reserve(&self, owner: &str, amount: Amount) {
        match &self.reserve {
            Reserve::Token(token) => token
                .approve(&acct(owner), self.engine.address(), amount)
                .expect("approve"),
            Reserve::Native(_) => panic!("native reserve has no allowances"),
        }
    }

    pub fn reserve_balance(&self, account: &str) -> Amount {
        self.reserve_asset()
            .balance_of(&acct(account))
            .expect("reserve balance")
    }

    /// Move reserve out of engine custody behind its back.
    pub fn siphon_reserve(&self, to: &str, amount: Amount) {
        self.reserve_asset()
            .transfer(self.engine.address(), &acct(to), amount)
            .expect("siphon");
    }

    fn reserve_asset(&self) -> &dyn FungibleAsset {
        match &self.reserve {
            Reserve::Native(bank) => &**bank,
            Reserve::Token(token) => &**token,
        }
    }

    pub fn claimable(&self, address: &str) -> &InMemoryToken {
        self.claimables
            .get(&acct(address))
            .unwrap_or_else(|| panic!("no claimable token {address}"))
    }

    pub fn set_inviter(&self, account: &str, inviter: &str) {
        self.directory
            .set_inviter(&acct(account), &acct(inviter))
            .expect("set inviter");
    }

    pub fn grant_role(&self, account: &str, role: &str) {
        self.directory
            .grant_role(&acct(account), role)
            .expect("grant role");
    }

    pub fn stats(&self) -> &InMemoryStatsRecorder {
        &self.stats
    }

    /// Deposit native value and return the minted Token1.
    pub fn deposit_native(&mut self, account: &str, amount: Amount) -> Amount {
        self.fund(account, amount);
        self.engine
            .receive_native(&acct(account), amount)
            .expect("native deposit")
            .minted
    }
}
