use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Amount in the smallest unit (18 decimals by convention).
pub type Amount = u128;

/// Decimals reported for Token1.
pub const DECIMALS: u8 = 18;

/// Opaque address-like account key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(pub String);

impl Account {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Account {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Channel through which reserve value reaches the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReserveKind {
    /// Native value attached to the call.
    Native,
    /// ERC20-style token pulled through an allowance.
    Token { address: Account },
}

impl ReserveKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Token { .. } => "token",
        }
    }
}

/// Logical events emitted by committed operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurrencyEvent {
    Transfer {
        from: Account,
        to: Account,
        amount: Amount,
    },
    Approval {
        owner: Account,
        spender: Account,
        amount: Amount,
    },
    Minted {
        account: Account,
        amount: Amount,
        total_supply: Amount,
    },
    Burned {
        account: Account,
        amount: Amount,
        total_supply: Amount,
    },
    Exchanged {
        depositor: Account,
        reserve_in: Amount,
        token1_out: Amount,
    },
    Redeemed {
        holder: Account,
        token1_in: Amount,
        reserve_out: Amount,
    },
    RewardPaid {
        inviter: Account,
        depositor: Account,
        amount: Amount,
    },
    Claimed {
        token: Account,
        claimant: Account,
        amount: Amount,
    },
    OwnershipTransferred {
        previous: Account,
        next: Account,
    },
    ClaimingTokenAdded {
        token: Account,
    },
    ClaimingTokenRemoved {
        token: Account,
    },
    WhitelistAdded {
        account: Account,
    },
    WhitelistRemoved {
        account: Account,
    },
}

/// Outcome of a reserve deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub trace_id: String,
    pub depositor: Account,
    pub reserve_in: Amount,
    pub commission: Amount,
    pub inviter: Option<Account>,
    pub converted_reserve: Amount,
    pub minted: Amount,
    pub settled_at: DateTime<Utc>,
}

/// Outcome of a Token1 redemption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionReceipt {
    pub trace_id: String,
    pub holder: Account,
    pub burned: Amount,
    pub payout: Amount,
    pub settled_at: DateTime<Utc>,
}

/// Outcome of a claim against one registered token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub trace_id: String,
    pub token: Account,
    pub claimant: Account,
    pub amount: Amount,
}

/// Result of a transfer: plain peer transfer or the redemption trigger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    Transferred {
        from: Account,
        to: Account,
        amount: Amount,
    },
    Redeemed(RedemptionReceipt),
}
