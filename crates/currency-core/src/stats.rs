use crate::collaborators::StatsRecorder;
use crate::types::{Account, Amount};
use std::sync::Arc;
use tracing::warn;

/// Best-effort forwarding of plain transfers and deposit mints to the
/// statistics recorder.
#[derive(Clone)]
pub struct StatsHook {
    recorder: Arc<dyn StatsRecorder>,
}

impl StatsHook {
    pub fn new(recorder: Arc<dyn StatsRecorder>) -> Self {
        Self { recorder }
    }

    /// Returns whether the recorder accepted the notification. Failures are
    /// logged and swallowed; they never revert the transfer.
    pub fn notify(&self, recipient: &Account, amount: Amount) -> bool {
        match self.recorder.record_transfer(recipient, amount) {
            Ok(()) => true,
            Err(err) => {
                warn!(recipient = %recipient, amount, error = %err, "Stats recorder failed");
                false
            }
        }
    }
}
