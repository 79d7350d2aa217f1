#![deny(unsafe_code)]

use currency_adapters::{
    AssetBook, InMemoryDirectory, InMemoryStatsRecorder, InMemoryToken, NativeValueBank,
    StatAdded,
};
use currency_core::{
    Account, Amount, ClaimReceipt, Collaborators, CurrencyConfig, CurrencyEngine, CurrencyError,
    DepositReceipt, FungibleAsset, JournalEntry, RedemptionReceipt, ReserveKind, TransferOutcome,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("core engine error: {0}")]
    Core(#[from] CurrencyError),
    #[error("read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("scenario parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Initial world state before any step runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSetup {
    /// Reserve asset credited to each account (native value or reserve token).
    pub funds: BTreeMap<Account, Amount>,
    /// Transfers of at least this much Token1 are recorded as statistics.
    pub stats_threshold: Amount,
    /// Account -> inviter.
    pub inviters: BTreeMap<Account, Account>,
    /// Role -> holders.
    pub roles: BTreeMap<String, Vec<Account>>,
    pub claimable_tokens: Vec<ClaimableTokenSetup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimableTokenSetup {
    pub address: Account,
    #[serde(default)]
    pub balances: BTreeMap<Account, Amount>,
}

/// One operation against the engine or its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStep {
    ReceiveNative {
        depositor: Account,
        value: Amount,
    },
    /// Approve the engine to pull `amount` of an external token.
    ApproveToken {
        token: Account,
        owner: Account,
        amount: Amount,
    },
    ReceiveReserveToken {
        depositor: Account,
    },
    DepositReserveToken {
        depositor: Account,
        amount: Amount,
    },
    Redeem {
        holder: Account,
        amount: Amount,
    },
    Transfer {
        from: Account,
        to: Account,
        amount: Amount,
    },
    Approve {
        owner: Account,
        spender: Account,
        amount: Amount,
    },
    TransferFrom {
        spender: Account,
        owner: Account,
        to: Account,
        amount: Amount,
    },
    Claim {
        claimant: Account,
        token: Account,
        amount: Amount,
    },
    ClaimAll {
        claimant: Account,
    },
    ClaimingTokenAdd {
        caller: Account,
        token: Account,
    },
    ClaimingTokenRemove {
        caller: Account,
        token: Account,
    },
    WhitelistAdd {
        caller: Account,
        accounts: Vec<Account>,
    },
    WhitelistRemove {
        caller: Account,
        accounts: Vec<Account>,
    },
    TransferOwnership {
        caller: Account,
        new_owner: Account,
    },
}

impl ScenarioStep {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ReceiveNative { .. } => "receive_native",
            Self::ApproveToken { .. } => "approve_token",
            Self::ReceiveReserveToken { .. } => "receive_reserve_token",
            Self::DepositReserveToken { .. } => "deposit_reserve_token",
            Self::Redeem { .. } => "redeem",
            Self::Transfer { .. } => "transfer",
            Self::Approve { .. } => "approve",
            Self::TransferFrom { .. } => "transfer_from",
            Self::Claim { .. } => "claim",
            Self::ClaimAll { .. } => "claim_all",
            Self::ClaimingTokenAdd { .. } => "claiming_token_add",
            Self::ClaimingTokenRemove { .. } => "claiming_token_remove",
            Self::WhitelistAdd { .. } => "whitelist_add",
            Self::WhitelistRemove { .. } => "whitelist_remove",
            Self::TransferOwnership { .. } => "transfer_ownership",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub setup: ScenarioSetup,
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn from_json_str(contents: &str) -> Result<Self, SimulationError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimulationError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SimulationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }
}

/// What a successful step produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Deposit(DepositReceipt),
    Redemption(RedemptionReceipt),
    Transfer(TransferOutcome),
    Claims(Vec<ClaimReceipt>),
    Approval {
        owner: Account,
        spender: Account,
        amount: Amount,
    },
    TokenApproval {
        token: Account,
        owner: Account,
        amount: Amount,
    },
    /// Claim registry edit; `changed` is false when it was a no-op.
    ClaimingToken { token: Account, changed: bool },
    /// Whitelist edit; lists the accounts actually added or removed.
    Whitelist { changed: Vec<Account> },
    Ownership { owner: Account },
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub op: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<StepOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub name: String,
    pub symbol: String,
    pub owner: Account,
    pub total_supply: Amount,
    pub reserve_held: Amount,
    pub balances: BTreeMap<Account, Amount>,
    pub whitelist: Vec<Account>,
    pub claiming_tokens: Vec<Account>,
    pub steps: Vec<StepRecord>,
    pub stats: Vec<StatAdded>,
    pub journal: Vec<JournalEntry>,
    pub invariants_ok: bool,
}

enum ReserveHandle {
    Native(Arc<NativeValueBank>),
    Token(Arc<InMemoryToken>),
}

/// An engine wired to in-memory collaborators.
pub struct Simulation {
    engine: CurrencyEngine,
    reserve: ReserveHandle,
    tokens: BTreeMap<Account, Arc<InMemoryToken>>,
    stats: Arc<InMemoryStatsRecorder>,
    steps: Vec<StepRecord>,
}

impl Simulation {
    pub fn bootstrap(config: CurrencyConfig, setup: &ScenarioSetup) -> Result<Self, SimulationError> {
        let assets = Arc::new(AssetBook::new());
        let mut tokens = BTreeMap::new();

        let (reserve, reserve_asset): (ReserveHandle, Arc<dyn FungibleAsset>) =
            match &config.reserve {
                ReserveKind::Native => {
                    let bank = Arc::new(NativeValueBank::new());
                    for (account, amount) in &setup.funds {
                        bank.fund(account, *amount)?;
                    }
                    let asset: Arc<dyn FungibleAsset> = bank.clone();
                    (ReserveHandle::Native(bank), asset)
                }
                ReserveKind::Token { address } => {
                    let token = Arc::new(InMemoryToken::new(address.as_str()));
                    for (account, amount) in &setup.funds {
                        token.mint(account, *amount)?;
                    }
                    assets.register(token.clone())?;
                    tokens.insert(address.clone(), token.clone());
                    let asset: Arc<dyn FungibleAsset> = token.clone();
                    (ReserveHandle::Token(token), asset)
                }
            };

        for claimable in &setup.claimable_tokens {
            let token = Arc::new(InMemoryToken::new(claimable.address.as_str()));
            for (account, amount) in &claimable.balances {
                token.mint(account, *amount)?;
            }
            assets.register(token.clone())?;
            tokens.insert(claimable.address.clone(), token);
        }

        let directory = Arc::new(InMemoryDirectory::new());
        for (account, inviter) in &setup.inviters {
            directory.set_inviter(account, inviter)?;
        }
        for (role, holders) in &setup.roles {
            for holder in holders {
                directory.grant_role(holder, role)?;
            }
        }

        let stats = Arc::new(InMemoryStatsRecorder::new(setup.stats_threshold));
        let engine = CurrencyEngine::new(
            config,
            Collaborators {
                reserve: reserve_asset,
                directory,
                stats: stats.clone(),
                assets,
            },
        )?;

        Ok(Self {
            engine,
            reserve,
            tokens,
            stats,
            steps: Vec::new(),
        })
    }

    pub fn engine(&self) -> &CurrencyEngine {
        &self.engine
    }

    /// Reserve balance of an arbitrary account, outside the engine.
    pub fn reserve_balance(&self, account: &Account) -> Result<Amount, SimulationError> {
        let balance = match &self.reserve {
            ReserveHandle::Native(bank) => bank.balance_of(account)?,
            ReserveHandle::Token(token) => token.balance_of(account)?,
        };
        Ok(balance)
    }

    /// Run one step. Engine rejections are recorded, not propagated.
    pub fn apply(&mut self, step: &ScenarioStep) -> &StepRecord {
        let index = self.steps.len();
        let record = match self.dispatch(step) {
            Ok(outcome) => StepRecord {
                index,
                op: step.label().to_string(),
                ok: true,
                outcome: Some(outcome),
                error: None,
            },
            Err(err) => {
                warn!(step = index, op = step.label(), error = %err, "Step rejected");
                StepRecord {
                    index,
                    op: step.label().to_string(),
                    ok: false,
                    outcome: None,
                    error: Some(err.to_string()),
                }
            }
        };
        self.steps.push(record);
        &self.steps[index]
    }

    pub fn run(&mut self, steps: &[ScenarioStep]) {
        for step in steps {
            self.apply(step);
        }
        info!(steps = steps.len(), "Scenario finished");
    }

    fn dispatch(&mut self, step: &ScenarioStep) -> Result<StepOutcome, SimulationError> {
        let engine = &mut self.engine;
        let outcome = match step {
            ScenarioStep::ReceiveNative { depositor, value } => {
                StepOutcome::Deposit(engine.receive_native(depositor, *value)?)
            }
            ScenarioStep::ApproveToken {
                token,
                owner,
                amount,
            } => {
                let asset = self.tokens.get(token).ok_or_else(|| {
                    CurrencyError::collaborator("simulator", format!("unknown token {token}"))
                })?;
                asset.approve(owner, engine.address(), *amount)?;
                StepOutcome::TokenApproval {
                    token: token.clone(),
                    owner: owner.clone(),
                    amount: *amount,
                }
            }
            ScenarioStep::ReceiveReserveToken { depositor } => {
                StepOutcome::Deposit(engine.receive_reserve_token(depositor)?)
            }
            ScenarioStep::DepositReserveToken { depositor, amount } => {
                StepOutcome::Deposit(engine.deposit_reserve_token(depositor, *amount)?)
            }
            ScenarioStep::Redeem { holder, amount } => {
                StepOutcome::Redemption(engine.redeem(holder, *amount)?)
            }
            ScenarioStep::Transfer { from, to, amount } => {
                StepOutcome::Transfer(engine.transfer(from, to, *amount)?)
            }
            ScenarioStep::Approve {
                owner,
                spender,
                amount,
            } => {
                engine.approve(owner, spender, *amount)?;
                StepOutcome::Approval {
                    owner: owner.clone(),
                    spender: spender.clone(),
                    amount: *amount,
                }
            }
            ScenarioStep::TransferFrom {
                spender,
                owner,
                to,
                amount,
            } => StepOutcome::Transfer(engine.transfer_from(spender, owner, to, *amount)?),
            ScenarioStep::Claim {
                claimant,
                token,
                amount,
            } => StepOutcome::Claims(vec![engine.claim(claimant, token, *amount)?]),
            ScenarioStep::ClaimAll { claimant } => StepOutcome::Claims(engine.claim_all(claimant)?),
            ScenarioStep::ClaimingTokenAdd { caller, token } => StepOutcome::ClaimingToken {
                token: token.clone(),
                changed: engine.claiming_token_add(caller, token)?,
            },
            ScenarioStep::ClaimingTokenRemove { caller, token } => StepOutcome::ClaimingToken {
                token: token.clone(),
                changed: engine.claiming_token_remove(caller, token)?,
            },
            ScenarioStep::WhitelistAdd { caller, accounts } => StepOutcome::Whitelist {
                changed: engine.whitelist_add(caller, accounts)?,
            },
            ScenarioStep::WhitelistRemove { caller, accounts } => StepOutcome::Whitelist {
                changed: engine.whitelist_remove(caller, accounts)?,
            },
            ScenarioStep::TransferOwnership { caller, new_owner } => {
                engine.transfer_ownership(caller, new_owner)?;
                StepOutcome::Ownership {
                    owner: new_owner.clone(),
                }
            }
        };
        Ok(outcome)
    }

    pub fn report(&self) -> Result<SimulationReport, SimulationError> {
        let engine = &self.engine;
        let invariants_ok = match engine.check_invariants() {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Invariant check failed");
                false
            }
        };

        Ok(SimulationReport {
            name: engine.name().to_string(),
            symbol: engine.symbol().to_string(),
            owner: engine.owner().clone(),
            total_supply: engine.total_supply(),
            reserve_held: engine.reserve_held()?,
            balances: engine.balances().into_iter().collect(),
            whitelist: engine.whitelist_members(),
            claiming_tokens: engine.claiming_tokens_view(),
            steps: self.steps.clone(),
            stats: self.stats.entries()?,
            journal: engine.journal().entries().to_vec(),
            invariants_ok,
        })
    }
}

/// Bootstrap, run every step, and report.
pub fn simulate(
    config: CurrencyConfig,
    scenario: &Scenario,
) -> Result<SimulationReport, SimulationError> {
    let mut simulation = Simulation::bootstrap(config, &scenario.setup)?;
    simulation.run(&scenario.steps);
    simulation.report()
}
