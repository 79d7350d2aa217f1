use crate::collaborators::FungibleAsset;
use crate::error::CurrencyResult;
use crate::ledger::Ledger;
use crate::types::{Account, Amount, CurrencyEvent};
use std::sync::Arc;
use tracing::error;

/// External movement already executed by a pending operation.
struct ExecutedTransfer {
    asset: Arc<dyn FungibleAsset>,
    from: Account,
    to: Account,
    amount: Amount,
}

/// All-or-nothing unit of work.
///
/// Ledger changes are applied to a private copy and events are buffered;
/// neither reaches the engine until `commit`. External transfers run
/// immediately and are recorded so `rollback` can reverse them newest-first.
pub struct Transaction {
    trace_id: String,
    engine: Account,
    ledger: Ledger,
    events: Vec<CurrencyEvent>,
    executed: Vec<ExecutedTransfer>,
}

impl Transaction {
    pub fn begin(trace_id: impl Into<String>, engine: &Account, ledger: &Ledger) -> Self {
        Self {
            trace_id: trace_id.into(),
            engine: engine.clone(),
            ledger: ledger.clone(),
            events: Vec::new(),
            executed: Vec::new(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn emit(&mut self, event: CurrencyEvent) {
        self.events.push(event);
    }

    /// Pull `amount` from `owner` into engine custody through an allowance.
    pub fn pull(
        &mut self,
        asset: &Arc<dyn FungibleAsset>,
        owner: &Account,
        amount: Amount,
    ) -> CurrencyResult<()> {
        asset.transfer_from(&self.engine, owner, &self.engine, amount)?;
        self.executed.push(ExecutedTransfer {
            asset: asset.clone(),
            from: owner.clone(),
            to: self.engine.clone(),
            amount,
        });
        Ok(())
    }

    /// Move `amount` from `from` to `to` directly. Used for native value
    /// attached to a call and for payouts out of engine custody.
    pub fn send(
        &mut self,
        asset: &Arc<dyn FungibleAsset>,
        from: &Account,
        to: &Account,
        amount: Amount,
    ) -> CurrencyResult<()> {
        asset.transfer(from, to, amount)?;
        self.executed.push(ExecutedTransfer {
            asset: asset.clone(),
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    pub fn events(&self) -> &[CurrencyEvent] {
        &self.events
    }

    /// Hand back the staged ledger. Buffered events must already have been
    /// journaled through [`Transaction::events`].
    pub fn commit(self) -> Ledger {
        self.ledger
    }

    /// Reverse executed transfers, newest first. The staged ledger and
    /// buffered events are dropped.
    pub fn rollback(self) {
        for transfer in self.executed.into_iter().rev() {
            if let Err(err) = transfer
                .asset
                .transfer(&transfer.to, &transfer.from, transfer.amount)
            {
                error!(
                    trace_id = %self.trace_id,
                    asset = %transfer.asset.address(),
                    from = %transfer.to,
                    to = %transfer.from,
                    amount = transfer.amount,
                    error = %err,
                    "Compensating transfer failed"
                );
            }
        }
    }
}
