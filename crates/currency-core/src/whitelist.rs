use crate::collaborators::Directory;
use crate::error::CurrencyResult;
use crate::types::Account;
use std::collections::BTreeSet;

/// Community role under which directory members are admitted as senders.
pub const MEMBERS_ROLE: &str = "members";

/// Sender gate for plain transfers.
///
/// An account passes when enforcement is off, when it was added explicitly,
/// or when the configured role is recognized and the directory reports the
/// account as holding it. An unrecognized role admits nobody through the
/// directory; only explicit members pass.
#[derive(Debug, Clone)]
pub struct Whitelist {
    members: BTreeSet<Account>,
    enforced: bool,
    role: String,
    role_recognized: bool,
}

impl Whitelist {
    pub fn new(role: impl Into<String>, enforced: bool) -> Self {
        let role = role.into();
        let role_recognized = role == MEMBERS_ROLE;
        Self {
            members: BTreeSet::new(),
            enforced,
            role,
            role_recognized,
        }
    }

    pub fn role_recognized(&self) -> bool {
        self.role_recognized
    }

    pub fn enforced(&self) -> bool {
        self.enforced
    }

    pub fn members(&self) -> Vec<Account> {
        self.members.iter().cloned().collect()
    }

    pub fn is_whitelisted(
        &self,
        account: &Account,
        directory: &dyn Directory,
    ) -> CurrencyResult<bool> {
        if !self.enforced || self.members.contains(account) {
            return Ok(true);
        }
        if self.role_recognized {
            return directory.has_role(account, &self.role);
        }
        Ok(false)
    }

    /// Insert accounts; returns those that were not already members.
    pub fn add(&mut self, accounts: &[Account]) -> Vec<Account> {
        accounts
            .iter()
            .filter(|account| self.members.insert((*account).clone()))
            .cloned()
            .collect()
    }

    /// Remove accounts; returns those that were members.
    pub fn remove(&mut self, accounts: &[Account]) -> Vec<Account> {
        accounts
            .iter()
            .filter(|account| self.members.remove(*account))
            .cloned()
            .collect()
    }
}
