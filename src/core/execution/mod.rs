mod launcher;
mod policy;
mod record;
mod registry;
#[cfg(test)]
pub(crate) mod testing;
mod watcher;

pub use launcher::{KickoffInputs, Launcher};
pub use policy::{PollDecision, PollFailurePolicy};
pub use record::{
    ExecutionRecord, ExecutionStatus, POLL_FAILURE_DETAIL, can_transition, failure_detail,
};
pub use registry::{ExecutionRegistry, PollApplied, RecordUpdate};
pub use watcher::{DEFAULT_POLL_INTERVAL, ExecutionWatcher, KickoffError, WatcherSettings};
