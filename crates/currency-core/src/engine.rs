use crate::claim::ClaimRegistry;
use crate::collaborators::{Collaborators, FungibleAsset};
use crate::config::CurrencyConfig;
use crate::error::{CurrencyError, CurrencyResult};
use crate::journal::EventJournal;
use crate::ledger::Ledger;
use crate::rate::RateModel;
use crate::referral::ReferralHook;
use crate::stats::StatsHook;
use crate::tx::Transaction;
use crate::types::{
    Account, Amount, ClaimReceipt, CurrencyEvent, DepositReceipt, RedemptionReceipt, ReserveKind,
    TransferOutcome, DECIMALS,
};
use crate::whitelist::Whitelist;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// How deposited reserve reaches engine custody.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Funding {
    /// Value attached to the call, moved by the runtime.
    Attached,
    /// Pulled through the depositor's allowance to the engine.
    Allowance,
}

/// Token1 exchange engine.
///
/// Every mutating operation takes `&mut self` and runs inside a
/// [`Transaction`]: either the staged ledger and its events are committed
/// together, or external transfers are compensated and nothing changes.
pub struct CurrencyEngine {
    name: String,
    symbol: String,
    address: Account,
    owner: Account,
    reserve_kind: ReserveKind,
    ledger: Ledger,
    rates: RateModel,
    whitelist: Whitelist,
    claims: ClaimRegistry,
    referral: ReferralHook,
    stats: StatsHook,
    journal: EventJournal,
    collaborators: Collaborators,
}

impl CurrencyEngine {
    pub fn new(config: CurrencyConfig, collaborators: Collaborators) -> CurrencyResult<Self> {
        config.validate()?;
        let rates = config.rate_model()?;
        let referral = config.referral_hook()?;

        if let ReserveKind::Token { address } = &config.reserve {
            if collaborators.reserve.address() != address {
                return Err(CurrencyError::InvalidConfig(format!(
                    "reserve collaborator {} does not match configured token {}",
                    collaborators.reserve.address(),
                    address
                )));
            }
        }

        let whitelist = Whitelist::new(config.members_role.clone(), config.whitelist_enforced);
        if whitelist.enforced() && !whitelist.role_recognized() {
            info!(
                role = %config.members_role,
                "Members role not recognized; only explicit whitelist members may transfer"
            );
        }

        info!(
            name = %config.name,
            symbol = %config.symbol,
            address = %config.address,
            reserve = config.reserve.name(),
            buy_rate = rates.buy_rate(),
            sell_rate = rates.sell_rate(),
            commission_ppm = referral.commission_ppm(),
            "Currency engine initialized"
        );

        Ok(Self {
            name: config.name,
            symbol: config.symbol,
            address: config.address,
            owner: config.owner,
            reserve_kind: config.reserve,
            ledger: Ledger::new(),
            rates,
            whitelist,
            claims: ClaimRegistry::new(),
            referral,
            stats: StatsHook::new(collaborators.stats.clone()),
            journal: EventJournal::new(),
            collaborators,
        })
    }

    // ----- read surface -------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        DECIMALS
    }

    pub fn address(&self) -> &Account {
        &self.address
    }

    pub fn owner(&self) -> &Account {
        &self.owner
    }

    pub fn rates(&self) -> RateModel {
        self.rates
    }

    pub fn commission_ppm(&self) -> u32 {
        self.referral.commission_ppm()
    }

    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    pub fn balance_of(&self, account: &Account) -> Amount {
        self.ledger.balance_of(account)
    }

    pub fn allowance(&self, owner: &Account, spender: &Account) -> Amount {
        self.ledger.allowance(owner, spender)
    }

    pub fn balances(&self) -> Vec<(Account, Amount)> {
        self.ledger.accounts()
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    /// Reserve asset currently held by the engine.
    pub fn reserve_held(&self) -> CurrencyResult<Amount> {
        self.collaborators.reserve.balance_of(&self.address)
    }

    pub fn is_whitelisted(&self, account: &Account) -> CurrencyResult<bool> {
        self.whitelist
            .is_whitelisted(account, self.collaborators.directory.as_ref())
    }

    pub fn whitelist_members(&self) -> Vec<Account> {
        self.whitelist.members()
    }

    pub fn claiming_tokens_view(&self) -> Vec<Account> {
        self.claims.tokens().to_vec()
    }

    /// Supply equals the sum of balances and the journal chain verifies.
    pub fn check_invariants(&self) -> CurrencyResult<()> {
        self.ledger.check_invariant()?;
        self.journal
            .verify()
            .map_err(|err| CurrencyError::InvariantViolation(err.to_string()))
    }

    // ----- administration -----------------------------------------------

    pub fn transfer_ownership(&mut self, caller: &Account, new_owner: &Account) -> CurrencyResult<()> {
        self.ensure_owner(caller)?;
        self.record_admin(vec![CurrencyEvent::OwnershipTransferred {
            previous: self.owner.clone(),
            next: new_owner.clone(),
        }])?;
        let previous = std::mem::replace(&mut self.owner, new_owner.clone());
        info!(previous = %previous, next = %new_owner, "Ownership transferred");
        Ok(())
    }

    /// Register a claimable token. Returns false if it was already listed.
    pub fn claiming_token_add(&mut self, caller: &Account, token: &Account) -> CurrencyResult<bool> {
        self.ensure_owner(caller)?;
        if self.collaborators.assets.asset_at(token).is_none() {
            return Err(CurrencyError::InvalidClaimTarget(format!(
                "{token} is not a token contract"
            )));
        }
        if *token == self.address {
            return Err(CurrencyError::InvalidClaimTarget(format!(
                "{token} is this currency"
            )));
        }
        if let ReserveKind::Token { address } = &self.reserve_kind {
            if address == token {
                return Err(CurrencyError::InvalidClaimTarget(format!(
                    "{token} is the reserve token"
                )));
            }
        }

        let mut claims = self.claims.clone();
        if !claims.add(token.clone()) {
            return Ok(false);
        }
        self.record_admin(vec![CurrencyEvent::ClaimingTokenAdded {
            token: token.clone(),
        }])?;
        self.claims = claims;
        debug!(token = %token, "Claiming token added");
        Ok(true)
    }

    /// Unregister a claimable token. Returns false if it was not listed.
    pub fn claiming_token_remove(
        &mut self,
        caller: &Account,
        token: &Account,
    ) -> CurrencyResult<bool> {
        self.ensure_owner(caller)?;
        let mut claims = self.claims.clone();
        if !claims.remove(token) {
            return Ok(false);
        }
        self.record_admin(vec![CurrencyEvent::ClaimingTokenRemoved {
            token: token.clone(),
        }])?;
        self.claims = claims;
        debug!(token = %token, "Claiming token removed");
        Ok(true)
    }

    pub fn whitelist_add(
        &mut self,
        caller: &Account,
        accounts: &[Account],
    ) -> CurrencyResult<Vec<Account>> {
        self.ensure_owner(caller)?;
        let mut whitelist = self.whitelist.clone();
        let added = whitelist.add(accounts);
        let events = added
            .iter()
            .map(|account| CurrencyEvent::WhitelistAdded {
                account: account.clone(),
            })
            .collect();
        self.record_admin(events)?;
        self.whitelist = whitelist;
        Ok(added)
    }

    pub fn whitelist_remove(
        &mut self,
        caller: &Account,
        accounts: &[Account],
    ) -> CurrencyResult<Vec<Account>> {
        self.ensure_owner(caller)?;
        let mut whitelist = self.whitelist.clone();
        let removed = whitelist.remove(accounts);
        let events = removed
            .iter()
            .map(|account| CurrencyEvent::WhitelistRemoved {
                account: account.clone(),
            })
            .collect();
        self.record_admin(events)?;
        self.whitelist = whitelist;
        Ok(removed)
    }

    // ----- deposits -------------------------------------------------------

    /// Deposit native value attached to the call.
    pub fn receive_native(
        &mut self,
        depositor: &Account,
        value: Amount,
    ) -> CurrencyResult<DepositReceipt> {
        if self.reserve_kind != ReserveKind::Native {
            return Err(CurrencyError::ReserveChannelMismatch {
                expected: self.reserve_kind.name(),
            });
        }
        self.deposit(depositor, value, Funding::Attached)
    }

    /// Deposit the depositor's entire reserve-token allowance to the engine.
    pub fn receive_reserve_token(&mut self, depositor: &Account) -> CurrencyResult<DepositReceipt> {
        self.ensure_token_reserve()?;
        let allowance = self
            .collaborators
            .reserve
            .allowance(depositor, &self.address)?;
        if allowance == 0 {
            return Err(CurrencyError::ZeroAmount("reserve token allowance"));
        }
        self.deposit(depositor, allowance, Funding::Allowance)
    }

    /// Deposit an explicit amount of the reserve token.
    pub fn deposit_reserve_token(
        &mut self,
        depositor: &Account,
        amount: Amount,
    ) -> CurrencyResult<DepositReceipt> {
        self.ensure_token_reserve()?;
        let allowed = self
            .collaborators
            .reserve
            .allowance(depositor, &self.address)?;
        if allowed < amount {
            return Err(CurrencyError::AllowanceExceeded {
                allowed,
                requested: amount,
            });
        }
        self.deposit(depositor, amount, Funding::Allowance)
    }

    fn deposit(
        &mut self,
        depositor: &Account,
        amount: Amount,
        funding: Funding,
    ) -> CurrencyResult<DepositReceipt> {
        if amount == 0 {
            return Err(CurrencyError::ZeroAmount("deposit"));
        }
        if *depositor == self.address {
            return Err(CurrencyError::SelfDeposit);
        }

        let split = self
            .referral
            .split(self.collaborators.directory.as_ref(), depositor, amount)?;
        let minted = self.rates.reserve_to_token1(split.remainder)?;
        if minted == 0 {
            return Err(CurrencyError::ZeroAmount("deposit converts to zero Token1"));
        }

        let receipt = self.execute("deposit", |engine, tx| {
            let reserve = engine.collaborators.reserve.clone();
            match funding {
                Funding::Attached => tx.send(&reserve, depositor, &engine.address, amount)?,
                Funding::Allowance => tx.pull(&reserve, depositor, amount)?,
            }

            if let Some(inviter) = split.inviter.as_ref().filter(|_| split.commission > 0) {
                tx.send(&reserve, &engine.address, inviter, split.commission)?;
                tx.emit(CurrencyEvent::RewardPaid {
                    inviter: inviter.clone(),
                    depositor: depositor.clone(),
                    amount: split.commission,
                });
            }

            let change = tx.ledger_mut().mint(depositor, minted)?;
            tx.emit(CurrencyEvent::Minted {
                account: depositor.clone(),
                amount: minted,
                total_supply: change.total_supply,
            });
            tx.emit(CurrencyEvent::Exchanged {
                depositor: depositor.clone(),
                reserve_in: amount,
                token1_out: minted,
            });

            Ok(DepositReceipt {
                trace_id: tx.trace_id().to_string(),
                depositor: depositor.clone(),
                reserve_in: amount,
                commission: split.commission,
                inviter: split.inviter.clone(),
                converted_reserve: split.remainder,
                minted,
                settled_at: Utc::now(),
            })
        })?;

        self.stats.notify(depositor, minted);
        info!(
            trace_id = %receipt.trace_id,
            depositor = %depositor,
            reserve_in = amount,
            commission = receipt.commission,
            minted,
            "Deposit settled"
        );
        Ok(receipt)
    }

    // ----- redemption -----------------------------------------------------

    /// Burn Token1 and release reserve at the sell rate. No whitelist check.
    pub fn redeem(&mut self, holder: &Account, amount: Amount) -> CurrencyResult<RedemptionReceipt> {
        let receipt = self.execute("redeem", |engine, tx| {
            engine.stage_redemption(tx, holder, amount)
        })?;
        info!(
            trace_id = %receipt.trace_id,
            holder = %holder,
            burned = receipt.burned,
            payout = receipt.payout,
            "Redemption settled"
        );
        Ok(receipt)
    }

    fn stage_redemption(
        &self,
        tx: &mut Transaction,
        holder: &Account,
        amount: Amount,
    ) -> CurrencyResult<RedemptionReceipt> {
        if amount == 0 {
            return Err(CurrencyError::ZeroAmount("redeem"));
        }
        let change = tx.ledger_mut().burn(holder, amount)?;

        let payout = self.rates.token1_to_reserve(amount)?;
        if payout == 0 {
            return Err(CurrencyError::ZeroAmount("redemption pays zero reserve"));
        }

        let held = self.reserve_held()?;
        if held < payout {
            return Err(CurrencyError::InsufficientReserve { held, owed: payout });
        }
        let reserve = self.collaborators.reserve.clone();
        tx.send(&reserve, &self.address, holder, payout)?;

        tx.emit(CurrencyEvent::Burned {
            account: holder.clone(),
            amount,
            total_supply: change.total_supply,
        });
        tx.emit(CurrencyEvent::Redeemed {
            holder: holder.clone(),
            token1_in: amount,
            reserve_out: payout,
        });

        Ok(RedemptionReceipt {
            trace_id: tx.trace_id().to_string(),
            holder: holder.clone(),
            burned: amount,
            payout,
            settled_at: Utc::now(),
        })
    }

    // ----- transfers ------------------------------------------------------

    /// Transfer Token1. Sending to the currency's own address redeems.
    pub fn transfer(
        &mut self,
        sender: &Account,
        to: &Account,
        amount: Amount,
    ) -> CurrencyResult<TransferOutcome> {
        if *to == self.address {
            return self.redeem(sender, amount).map(TransferOutcome::Redeemed);
        }
        self.plain_transfer(sender, None, to, amount)
    }

    pub fn approve(
        &mut self,
        owner: &Account,
        spender: &Account,
        amount: Amount,
    ) -> CurrencyResult<()> {
        self.execute("approve", |_, tx| {
            tx.ledger_mut().approve(owner, spender, amount);
            tx.emit(CurrencyEvent::Approval {
                owner: owner.clone(),
                spender: spender.clone(),
                amount,
            });
            Ok(())
        })
    }

    /// Spend `spender`'s allowance over `owner`'s Token1.
    pub fn transfer_from(
        &mut self,
        spender: &Account,
        owner: &Account,
        to: &Account,
        amount: Amount,
    ) -> CurrencyResult<TransferOutcome> {
        if *to == self.address {
            return self
                .execute("redeem", |engine, tx| {
                    tx.ledger_mut().spend_allowance(owner, spender, amount)?;
                    engine.stage_redemption(tx, owner, amount)
                })
                .map(TransferOutcome::Redeemed);
        }
        self.plain_transfer(owner, Some(spender), to, amount)
    }

    fn plain_transfer(
        &mut self,
        owner: &Account,
        spender: Option<&Account>,
        to: &Account,
        amount: Amount,
    ) -> CurrencyResult<TransferOutcome> {
        if !self.is_whitelisted(owner)? {
            debug!(sender = %owner, "Transfer rejected by whitelist");
            return Err(CurrencyError::SenderNotWhitelisted(owner.clone()));
        }

        let outcome = self.execute("transfer", |_, tx| {
            if let Some(spender) = spender {
                tx.ledger_mut().spend_allowance(owner, spender, amount)?;
            }
            tx.ledger_mut().transfer(owner, to, amount)?;
            tx.emit(CurrencyEvent::Transfer {
                from: owner.clone(),
                to: to.clone(),
                amount,
            });
            Ok(TransferOutcome::Transferred {
                from: owner.clone(),
                to: to.clone(),
                amount,
            })
        })?;

        self.stats.notify(to, amount);
        Ok(outcome)
    }

    // ----- claims ---------------------------------------------------------

    /// Convert `amount` of a registered token into Token1, 1:1.
    pub fn claim(
        &mut self,
        claimant: &Account,
        token: &Account,
        amount: Amount,
    ) -> CurrencyResult<ClaimReceipt> {
        if !self.claims.contains(token) {
            return Err(CurrencyError::TokenNotClaimable(token.to_string()));
        }
        if amount == 0 {
            return Err(CurrencyError::ZeroAmount("claim"));
        }
        let asset = self.claimable_asset(token)?;
        let allowed = asset.allowance(claimant, &self.address)?;
        if allowed < amount {
            return Err(CurrencyError::AllowanceExceeded {
                allowed,
                requested: amount,
            });
        }

        let receipt = self.execute("claim", |engine, tx| {
            engine.stage_claim(tx, &asset, claimant, amount)
        })?;
        info!(
            trace_id = %receipt.trace_id,
            claimant = %claimant,
            token = %token,
            amount,
            "Claim settled"
        );
        Ok(receipt)
    }

    /// Claim the full allowance of every registered token, in registry order.
    pub fn claim_all(&mut self, claimant: &Account) -> CurrencyResult<Vec<ClaimReceipt>> {
        if self.claims.is_empty() {
            return Err(CurrencyError::TokenNotClaimable(
                "no tokens registered for claiming".into(),
            ));
        }

        let mut pending = Vec::new();
        for token in self.claims.tokens() {
            let asset = self.claimable_asset(token)?;
            let allowed = asset.allowance(claimant, &self.address)?;
            if allowed > 0 {
                pending.push((asset, allowed));
            }
        }
        if pending.is_empty() {
            // A claim must move at least one unit.
            return Err(CurrencyError::AllowanceExceeded {
                allowed: 0,
                requested: 1,
            });
        }

        let receipts = self.execute("claim_all", |engine, tx| {
            pending
                .iter()
                .map(|(asset, amount)| engine.stage_claim(tx, asset, claimant, *amount))
                .collect::<CurrencyResult<Vec<_>>>()
        })?;
        info!(claimant = %claimant, tokens = receipts.len(), "Claims settled");
        Ok(receipts)
    }

    fn stage_claim(
        &self,
        tx: &mut Transaction,
        asset: &Arc<dyn FungibleAsset>,
        claimant: &Account,
        amount: Amount,
    ) -> CurrencyResult<ClaimReceipt> {
        let change = tx.ledger_mut().mint(claimant, amount)?;
        tx.pull(asset, claimant, amount)?;

        let token = asset.address().clone();
        tx.emit(CurrencyEvent::Minted {
            account: claimant.clone(),
            amount,
            total_supply: change.total_supply,
        });
        tx.emit(CurrencyEvent::Claimed {
            token: token.clone(),
            claimant: claimant.clone(),
            amount,
        });

        Ok(ClaimReceipt {
            trace_id: tx.trace_id().to_string(),
            token,
            claimant: claimant.clone(),
            amount,
        })
    }

    fn claimable_asset(&self, token: &Account) -> CurrencyResult<Arc<dyn FungibleAsset>> {
        self.collaborators
            .assets
            .asset_at(token)
            .ok_or_else(|| CurrencyError::InvalidClaimTarget(format!("{token} no longer resolves")))
    }

    // ----- plumbing -------------------------------------------------------

    fn ensure_owner(&self, caller: &Account) -> CurrencyResult<()> {
        if *caller != self.owner {
            return Err(CurrencyError::NotOwner(caller.clone()));
        }
        Ok(())
    }

    fn ensure_token_reserve(&self) -> CurrencyResult<()> {
        match self.reserve_kind {
            ReserveKind::Token { .. } => Ok(()),
            ReserveKind::Native => Err(CurrencyError::ReserveChannelMismatch {
                expected: self.reserve_kind.name(),
            }),
        }
    }

    /// Journal administrative events. Callers apply the change itself only
    /// after this succeeds.
    fn record_admin(&mut self, events: Vec<CurrencyEvent>) -> CurrencyResult<()> {
        if events.is_empty() {
            return Ok(());
        }
        let trace_id = Uuid::new_v4().to_string();
        let staged = self.journal.stage(&trace_id, &events)?;
        self.journal.extend(staged)
    }

    /// Run `stage` in a fresh transaction. The journal is extended before the
    /// staged ledger is swapped in; any failure up to that point compensates
    /// external transfers and leaves ledger and journal untouched.
    fn execute<T>(
        &mut self,
        operation: &'static str,
        stage: impl FnOnce(&Self, &mut Transaction) -> CurrencyResult<T>,
    ) -> CurrencyResult<T> {
        let trace_id = Uuid::new_v4().to_string();
        let mut tx = Transaction::begin(trace_id.clone(), &self.address, &self.ledger);

        let staged = stage(&*self, &mut tx).and_then(|value| {
            tx.ledger().check_invariant()?;
            let entries = self.journal.stage(&trace_id, tx.events())?;
            Ok((value, entries))
        });
        let journaled =
            staged.and_then(|(value, entries)| self.journal.extend(entries).map(|()| value));

        match journaled {
            Ok(value) => {
                self.ledger = tx.commit();
                Ok(value)
            }
            Err(err) => {
                if err.is_fatal() {
                    error!(trace_id = %trace_id, operation, error = %err, "Accounting defect; operation aborted");
                } else {
                    debug!(trace_id = %trace_id, operation, error = %err, "Operation rejected");
                }
                tx.rollback();
                Err(err)
            }
        }
    }
}
