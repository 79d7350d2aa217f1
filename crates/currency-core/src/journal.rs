use crate::error::{CurrencyError, CurrencyResult};
use crate::types::CurrencyEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hash-chained journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub entry_id: String,
    pub index: u64,
    pub trace_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: CurrencyEvent,
    pub previous_hash: Option<String>,
    pub entry_hash: String,
}

/// Fields covered by `entry_hash`. Serialized straight to bytes so `u128`
/// amounts keep full precision.
#[derive(Serialize)]
struct HashMaterial<'a> {
    index: u64,
    trace_id: &'a str,
    timestamp: &'a DateTime<Utc>,
    event: &'a CurrencyEvent,
    previous_hash: Option<&'a str>,
}

impl HashMaterial<'_> {
    fn digest(&self) -> CurrencyResult<String> {
        let bytes = serde_json::to_vec(self).map_err(|e| CurrencyError::Journal(e.to_string()))?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}

/// Entries hashed against the journal tail but not yet part of it.
///
/// Produced by [`EventJournal::stage`] and applied with
/// [`EventJournal::extend`], which refuses them if the tail has moved.
#[derive(Debug)]
pub struct StagedEntries {
    base: usize,
    entries: Vec<JournalEntry>,
}

impl StagedEntries {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Append-only record of committed events.
///
/// Entries are only appended once the operation that produced them has
/// committed, so an aborted operation never shows up here.
#[derive(Debug, Default, Clone)]
pub struct EventJournal {
    entries: Vec<JournalEntry>,
    #[cfg(test)]
    sealed: bool,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `stage` fail.
    #[cfg(test)]
    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn events_for_trace(&self, trace_id: &str) -> Vec<&CurrencyEvent> {
        self.entries
            .iter()
            .filter(|entry| entry.trace_id == trace_id)
            .map(|entry| &entry.event)
            .collect()
    }

    /// Hash `events` onto the current tail without touching the journal.
    pub fn stage(&self, trace_id: &str, events: &[CurrencyEvent]) -> CurrencyResult<StagedEntries> {
        #[cfg(test)]
        if self.sealed {
            return Err(CurrencyError::Journal("journal sealed".into()));
        }
        let base = self.entries.len();
        let mut previous_hash = self.entries.last().map(|entry| entry.entry_hash.clone());
        let mut entries = Vec::with_capacity(events.len());

        for (offset, event) in events.iter().enumerate() {
            let index = (base + offset) as u64;
            let timestamp = Utc::now();
            let entry_hash = HashMaterial {
                index,
                trace_id,
                timestamp: &timestamp,
                event,
                previous_hash: previous_hash.as_deref(),
            }
            .digest()?;

            entries.push(JournalEntry {
                entry_id: Uuid::new_v4().to_string(),
                index,
                trace_id: trace_id.to_string(),
                timestamp,
                event: event.clone(),
                previous_hash: previous_hash.replace(entry_hash.clone()),
                entry_hash,
            });
        }

        Ok(StagedEntries { base, entries })
    }

    /// Apply entries staged against this journal.
    ///
    /// Entries staged against a tail that has since moved are refused.
    pub fn extend(&mut self, staged: StagedEntries) -> CurrencyResult<()> {
        if staged.base != self.entries.len() {
            return Err(CurrencyError::Journal(format!(
                "staged at position {} but journal holds {} entries",
                staged.base,
                self.entries.len()
            )));
        }
        self.entries.extend(staged.entries);
        Ok(())
    }

    pub fn append(&mut self, trace_id: &str, event: CurrencyEvent) -> CurrencyResult<()> {
        let staged = self.stage(trace_id, std::slice::from_ref(&event))?;
        self.extend(staged)
    }

    /// Recompute every hash and check each entry links to its predecessor.
    pub fn verify(&self) -> CurrencyResult<()> {
        self.entries
            .iter()
            .enumerate()
            .try_fold(None::<&str>, |previous, (position, entry)| {
                let broken = |what: &str| {
                    CurrencyError::Journal(format!("{what} at position {position}"))
                };
                if entry.index != position as u64 {
                    return Err(broken("index out of sequence"));
                }
                if entry.previous_hash.as_deref() != previous {
                    return Err(broken("previous-hash link broken"));
                }
                let expected = HashMaterial {
                    index: entry.index,
                    trace_id: &entry.trace_id,
                    timestamp: &entry.timestamp,
                    event: &entry.event,
                    previous_hash: previous,
                }
                .digest()?;
                if expected != entry.entry_hash {
                    return Err(broken("entry hash mismatch"));
                }
                Ok(Some(entry.entry_hash.as_str()))
            })
            .map(|_| ())
    }
}
