use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use super::record::ExecutionRecord;
use crate::core::api::ExecutionReport;

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// A registry mutation, as seen by subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub crew_id: String,
    pub record: ExecutionRecord,
}

/// Outcome of folding a watcher write into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollApplied {
    /// Record updated, execution still running.
    Continue,
    /// Record updated and now terminal.
    Terminal,
    /// The slot no longer belongs to this execution (superseded or already
    /// terminal); nothing was written.
    Stale,
}

/// In-memory map from crew id to its current or most recent execution record.
///
/// Cheap to clone; clones share the same map. Independent registries are
/// fully isolated.
#[derive(Clone)]
pub struct ExecutionRegistry {
    records: Arc<Mutex<HashMap<String, ExecutionRecord>>>,
    updates: broadcast::Sender<RecordUpdate>,
}

impl Default for ExecutionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionRegistry {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            updates,
        }
    }

    pub fn get(&self, crew_id: &str) -> Option<ExecutionRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.get(crew_id).cloned()
    }

    /// Replace the crew's record wholesale.
    pub fn set(&self, crew_id: &str, record: ExecutionRecord) {
        {
            let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
            records.insert(crew_id.to_string(), record.clone());
        }
        self.publish(crew_id, record);
    }

    /// Keep the caller's in-progress input text, creating a `NOT_STARTED`
    /// record on first edit. Execution state is left alone.
    pub fn update_input_text(&self, crew_id: &str, text: &str) {
        let record = {
            let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
            let record = records
                .entry(crew_id.to_string())
                .or_insert_with(|| ExecutionRecord::draft(text));
            record.set_raw_input_text(text);
            record.clone()
        };
        self.publish(crew_id, record);
    }

    /// All records, ordered by crew id.
    pub fn snapshot(&self) -> Vec<(String, ExecutionRecord)> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<_> = records
            .iter()
            .map(|(crew_id, record)| (crew_id.clone(), record.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecordUpdate> {
        self.updates.subscribe()
    }

    /// Apply a poll response, but only if the crew's slot still tracks
    /// `execution_id` and is not yet terminal.
    pub fn apply_report(
        &self,
        crew_id: &str,
        execution_id: &str,
        report: &ExecutionReport,
    ) -> PollApplied {
        self.apply_current(crew_id, execution_id, |record| record.apply_report(report))
    }

    /// Mark the watched execution failed because polling broke down.
    pub fn apply_poll_failure(&self, crew_id: &str, execution_id: &str) -> PollApplied {
        self.apply_current(crew_id, execution_id, |record| {
            record.fail_polling();
            record.is_terminal()
        })
    }

    fn apply_current(
        &self,
        crew_id: &str,
        execution_id: &str,
        apply: impl FnOnce(&mut ExecutionRecord) -> bool,
    ) -> PollApplied {
        let (record, terminal) = {
            let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
            let Some(record) = records.get_mut(crew_id) else {
                return PollApplied::Stale;
            };
            if record.execution_id() != Some(execution_id) || record.is_terminal() {
                return PollApplied::Stale;
            }
            let terminal = apply(record);
            (record.clone(), terminal)
        };
        self.publish(crew_id, record);
        if terminal {
            PollApplied::Terminal
        } else {
            PollApplied::Continue
        }
    }

    fn publish(&self, crew_id: &str, record: ExecutionRecord) {
        // No subscribers is fine; readers can still call get().
        let _ = self.updates.send(RecordUpdate {
            crew_id: crew_id.to_string(),
            record,
        });
    }
}
