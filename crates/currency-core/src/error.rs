use crate::types::{Account, Amount};
use thiserror::Error;

/// Currency engine errors.
///
/// Every variant aborts the enclosing operation without leaving partial state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("insufficient balance for {account}: have {have}, need {need}")]
    InsufficientBalance {
        account: Account,
        have: Amount,
        need: Amount,
    },

    #[error("insufficient reserve: held {held}, owed {owed}")]
    InsufficientReserve { held: Amount, owed: Amount },

    #[error("invalid rate configuration: {0}")]
    InvalidRateConfig(String),

    #[error("sender is not in whitelist: {0}")]
    SenderNotWhitelisted(Account),

    #[error("token is not claimable: {0}")]
    TokenNotClaimable(String),

    #[error("claim target must be a token contract: {0}")]
    InvalidClaimTarget(String),

    #[error("amount exceeds allowed balance: allowed {allowed}, requested {requested}")]
    AllowanceExceeded { allowed: Amount, requested: Amount },

    #[error("caller is not the owner: {0}")]
    NotOwner(Account),

    #[error("zero amount not allowed: {0}")]
    ZeroAmount(&'static str),

    #[error("arithmetic overflow")]
    Overflow,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("the currency cannot deposit into its own address")]
    SelfDeposit,

    #[error("reserve channel mismatch: engine accepts {expected} deposits")]
    ReserveChannelMismatch { expected: &'static str },

    #[error("collaborator '{collaborator}' failed: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("journal error: {0}")]
    Journal(String),
}

impl CurrencyError {
    pub fn collaborator(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    /// Accounting defects that must be alerted on rather than retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InsufficientReserve { .. } | Self::InvariantViolation(_)
        )
    }
}

/// Result type for currency operations.
pub type CurrencyResult<T> = Result<T, CurrencyError>;
