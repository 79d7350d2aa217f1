//! Token1 exchange engine.
//!
//! Holders deposit a reserve asset (native value or an ERC20-style token)
//! and receive Token1 at a fixed buy rate; Token1 sent back to the engine's
//! own address is burned and redeemed at the sell rate. Deposits pay a
//! referral commission to the depositor's inviter, plain transfers are
//! gated by a whitelist, and registered third-party tokens can be claimed
//! into Token1 one-for-one.

#![deny(unsafe_code)]

pub mod claim;
pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod rate;
pub mod referral;
pub mod stats;
pub mod tx;
pub mod types;
pub mod whitelist;

#[cfg(test)]
mod testkit;

pub use claim::ClaimRegistry;
pub use collaborators::{AssetLocator, Collaborators, Directory, FungibleAsset, StatsRecorder};
pub use config::CurrencyConfig;
pub use engine::CurrencyEngine;
pub use error::{CurrencyError, CurrencyResult};
pub use journal::{EventJournal, JournalEntry, StagedEntries};
pub use ledger::{Ledger, SupplyChange, SupplyDelta};
pub use rate::{RateModel, RATE_DENOMINATOR};
pub use referral::{CommissionSplit, ReferralHook, COMMISSION_DENOMINATOR};
pub use stats::StatsHook;
pub use tx::Transaction;
pub use types::{
    Account, Amount, ClaimReceipt, CurrencyEvent, DepositReceipt, RedemptionReceipt, ReserveKind,
    TransferOutcome, DECIMALS,
};
pub use whitelist::{Whitelist, MEMBERS_ROLE};
