use crate::error::{CurrencyError, CurrencyResult};
use crate::types::{Account, Amount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Supply-changing side effect reported by `mint` and `burn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyChange {
    pub account: Account,
    pub delta: SupplyDelta,
    pub total_supply: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyDelta {
    Minted(Amount),
    Burned(Amount),
}

/// Token1 balance book.
///
/// `total_supply` always equals the sum of `balances`. Every mutation checks
/// its preconditions before touching state, so a failed call leaves the book
/// unchanged. Accounts that drop to zero keep their entry.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    balances: HashMap<Account, Amount>,
    allowances: HashMap<(Account, Account), Amount>,
    total_supply: Amount,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, account: &Account) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Accounts with an entry, sorted for deterministic reporting.
    pub fn accounts(&self) -> Vec<(Account, Amount)> {
        let mut entries: Vec<_> = self
            .balances
            .iter()
            .map(|(account, amount)| (account.clone(), *amount))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn mint(&mut self, account: &Account, amount: Amount) -> CurrencyResult<SupplyChange> {
        if amount == 0 {
            return Err(CurrencyError::ZeroAmount("mint"));
        }
        let balance = self.balance_of(account);
        let new_balance = balance.checked_add(amount).ok_or(CurrencyError::Overflow)?;
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(CurrencyError::Overflow)?;

        self.balances.insert(account.clone(), new_balance);
        self.total_supply = new_supply;

        Ok(SupplyChange {
            account: account.clone(),
            delta: SupplyDelta::Minted(amount),
            total_supply: new_supply,
        })
    }

    pub fn burn(&mut self, account: &Account, amount: Amount) -> CurrencyResult<SupplyChange> {
        if amount == 0 {
            return Err(CurrencyError::ZeroAmount("burn"));
        }
        let balance = self.balance_of(account);
        if balance < amount {
            return Err(CurrencyError::InsufficientBalance {
                account: account.clone(),
                have: balance,
                need: amount,
            });
        }
        let new_supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or_else(|| CurrencyError::InvariantViolation("supply underflow on burn".into()))?;

        self.balances.insert(account.clone(), balance - amount);
        self.total_supply = new_supply;

        Ok(SupplyChange {
            account: account.clone(),
            delta: SupplyDelta::Burned(amount),
            total_supply: new_supply,
        })
    }

    /// Move balance between two accounts. Routing of engine-addressed
    /// transfers happens in the engine; here every destination is a peer.
    pub fn transfer(&mut self, from: &Account, to: &Account, amount: Amount) -> CurrencyResult<()> {
        if amount == 0 {
            return Err(CurrencyError::ZeroAmount("transfer"));
        }
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(CurrencyError::InsufficientBalance {
                account: from.clone(),
                have: from_balance,
                need: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self.balance_of(to);
        let new_to_balance = to_balance.checked_add(amount).ok_or(CurrencyError::Overflow)?;

        self.balances.insert(from.clone(), from_balance - amount);
        self.balances.insert(to.clone(), new_to_balance);
        Ok(())
    }

    pub fn allowance(&self, owner: &Account, spender: &Account) -> Amount {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn approve(&mut self, owner: &Account, spender: &Account, amount: Amount) {
        self.allowances
            .insert((owner.clone(), spender.clone()), amount);
    }

    pub fn spend_allowance(
        &mut self,
        owner: &Account,
        spender: &Account,
        amount: Amount,
    ) -> CurrencyResult<()> {
        let allowed = self.allowance(owner, spender);
        if allowed < amount {
            return Err(CurrencyError::AllowanceExceeded {
                allowed,
                requested: amount,
            });
        }
        self.approve(owner, spender, allowed - amount);
        Ok(())
    }

    /// Recompute the balance sum and compare it with the supply counter.
    pub fn check_invariant(&self) -> CurrencyResult<()> {
        let sum = self
            .balances
            .values()
            .try_fold(0 as Amount, |acc, v| acc.checked_add(*v))
            .ok_or(CurrencyError::Overflow)?;
        if sum != self.total_supply {
            return Err(CurrencyError::InvariantViolation(format!(
                "total supply {} != sum of balances {}",
                self.total_supply, sum
            )));
        }
        Ok(())
    }
}
