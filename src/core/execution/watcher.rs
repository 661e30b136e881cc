//! Per-crew execution watcher.
//!
//! A kickoff launches a remote execution and installs one watch for the crew:
//! a spawned poll loop plus the `CancellationToken` that stops it. The loop
//! sleeps one interval, asks for the execution's status, folds the answer into
//! the registry, and repeats until the record is terminal. Installing a watch
//! always cancels the crew's previous one first, so two loops never write the
//! same registry slot. Registry writes are additionally keyed on the execution
//! id, which makes a late answer from a cancelled loop a no-op.
//!
//! Each kickoff also takes a per-crew generation number before launching. A
//! launch that returns after a newer kickoff for the same crew has begun is
//! dropped: it neither writes the record nor installs a watch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::launcher::{KickoffInputs, Launcher};
use super::policy::{PollDecision, PollFailurePolicy};
use super::record::ExecutionRecord;
use super::registry::{ExecutionRegistry, PollApplied};
use crate::core::api::{ApiError, EntityStore, ValidationError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum KickoffError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to start execution: {0}")]
    Launch(#[source] ApiError),

    /// The launch went through, but a newer kickoff for the crew had already
    /// begun, so the execution is not watched.
    #[error("execution {execution_id} was superseded by a newer kickoff")]
    Superseded { execution_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherSettings {
    /// Wait before each poll, including the first.
    pub poll_interval: Duration,
    pub failure_policy: PollFailurePolicy,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            failure_policy: PollFailurePolicy::default(),
        }
    }
}

struct ActiveWatch {
    execution_id: String,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

type WatchTable = Arc<Mutex<HashMap<String, ActiveWatch>>>;

#[derive(Clone)]
struct PollContext {
    store: Arc<dyn EntityStore>,
    registry: ExecutionRegistry,
    watches: WatchTable,
    settings: WatcherSettings,
}

pub struct ExecutionWatcher {
    launcher: Launcher,
    ctx: PollContext,
    generations: Mutex<HashMap<String, u64>>,
}

impl ExecutionWatcher {
    pub fn new(
        store: Arc<dyn EntityStore>,
        registry: ExecutionRegistry,
        settings: WatcherSettings,
    ) -> Self {
        Self {
            launcher: Launcher::new(Arc::clone(&store)),
            ctx: PollContext {
                store,
                registry,
                watches: Arc::new(Mutex::new(HashMap::new())),
                settings,
            },
            generations: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &ExecutionRegistry {
        &self.ctx.registry
    }

    pub fn settings(&self) -> WatcherSettings {
        self.ctx.settings
    }

    /// Remember the caller's draft input text for a crew.
    pub fn edit_inputs(&self, crew_id: &str, text: &str) {
        self.ctx.registry.update_input_text(crew_id, text);
    }

    /// Kick off a crew using the draft text stored by `edit_inputs`.
    pub async fn kickoff_draft(&self, crew_id: &str) -> Result<String, KickoffError> {
        let raw = self
            .ctx
            .registry
            .get(crew_id)
            .map(|record| record.raw_input_text().to_string())
            .unwrap_or_default();
        self.kickoff(crew_id, &raw).await
    }

    /// Validate `raw_inputs`, launch the crew, and start watching the new
    /// execution. Any watch still running for the crew is cancelled first.
    ///
    /// Validation failures return before anything is cancelled, sent, or
    /// recorded. Launch failures leave the crew `NOT_STARTED` with the launch
    /// error recorded and no watch installed. If another kickoff for the crew
    /// began while this launch was in flight, the outcome is discarded.
    pub async fn kickoff(&self, crew_id: &str, raw_inputs: &str) -> Result<String, KickoffError> {
        let inputs = KickoffInputs::parse(raw_inputs)?;

        if self.cancel(crew_id) {
            info!("Superseding previous execution watch for crew {}", crew_id);
        }
        let generation = self.next_generation(crew_id);

        let outcome = self.launcher.launch(crew_id, &inputs).await;

        // Held until the outcome is recorded so a newer kickoff cannot slip in.
        let generations = lock_generations(&self.generations);
        if generations.get(crew_id) != Some(&generation) {
            drop(generations);
            return match outcome {
                Ok(execution_id) => {
                    warn!(
                        "Execution {} for crew {} was superseded while launching; not watching it",
                        execution_id, crew_id
                    );
                    Err(KickoffError::Superseded { execution_id })
                }
                Err(err) => {
                    debug!(
                        "Dropping launch failure for crew {} from a superseded kickoff: {}",
                        crew_id, err
                    );
                    Err(KickoffError::Launch(err))
                }
            };
        }

        match outcome {
            Ok(execution_id) => {
                self.ctx
                    .registry
                    .set(crew_id, ExecutionRecord::running(&execution_id, raw_inputs));
                self.install_watch(crew_id, &execution_id);
                Ok(execution_id)
            }
            Err(err) => {
                warn!("Kickoff for crew {} failed: {}", crew_id, err);
                self.ctx.registry.set(
                    crew_id,
                    ExecutionRecord::launch_failed(raw_inputs, &err.to_string()),
                );
                Err(KickoffError::Launch(err))
            }
        }
    }

    /// Stop watching a crew. Returns whether a watch was active.
    pub fn cancel(&self, crew_id: &str) -> bool {
        let removed = lock_table(&self.ctx.watches).remove(crew_id);
        match removed {
            Some(watch) => {
                debug!(
                    "Cancelling watch on execution {} for crew {}",
                    watch.execution_id, crew_id
                );
                watch.cancel.cancel();
                true
            }
            None => false,
        }
    }

    fn next_generation(&self, crew_id: &str) -> u64 {
        let mut generations = lock_generations(&self.generations);
        let generation = generations.entry(crew_id.to_string()).or_insert(0);
        *generation += 1;
        *generation
    }

    pub fn is_watching(&self, crew_id: &str) -> bool {
        lock_table(&self.ctx.watches).contains_key(crew_id)
    }

    pub fn watched_execution(&self, crew_id: &str) -> Option<String> {
        lock_table(&self.ctx.watches)
            .get(crew_id)
            .map(|watch| watch.execution_id.clone())
    }

    pub fn active_watches(&self) -> usize {
        lock_table(&self.ctx.watches).len()
    }

    /// Cancel every watch and wait for the poll loops to exit.
    pub async fn shutdown(&self) {
        let drained: Vec<ActiveWatch> = lock_table(&self.ctx.watches)
            .drain()
            .map(|(_, watch)| watch)
            .collect();
        for watch in &drained {
            watch.cancel.cancel();
        }
        for watch in drained {
            let _ = watch.task.await;
        }
    }

    fn install_watch(&self, crew_id: &str, execution_id: &str) {
        let cancel = CancellationToken::new();
        let mut table = lock_table(&self.ctx.watches);
        // A concurrent kickoff for the same crew may have installed a watch
        // while our launch was in flight; the newest launch wins the slot.
        let task = tokio::spawn(poll_loop(
            self.ctx.clone(),
            crew_id.to_string(),
            execution_id.to_string(),
            cancel.clone(),
        ));
        let previous = table.insert(
            crew_id.to_string(),
            ActiveWatch {
                execution_id: execution_id.to_string(),
                cancel,
                task,
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }
        debug!("Watching execution {} for crew {}", execution_id, crew_id);
    }
}

impl Drop for ExecutionWatcher {
    fn drop(&mut self) {
        for (_, watch) in lock_table(&self.ctx.watches).drain() {
            watch.cancel.cancel();
        }
    }
}

fn lock_generations(
    generations: &Mutex<HashMap<String, u64>>,
) -> std::sync::MutexGuard<'_, HashMap<String, u64>> {
    generations.lock().unwrap_or_else(|e| e.into_inner())
}

fn lock_table(table: &WatchTable) -> std::sync::MutexGuard<'_, HashMap<String, ActiveWatch>> {
    table.lock().unwrap_or_else(|e| e.into_inner())
}

async fn poll_loop(
    ctx: PollContext,
    crew_id: String,
    execution_id: String,
    cancel: CancellationToken,
) {
    let mut consecutive_failures = 0u32;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(ctx.settings.poll_interval) => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = ctx.store.execution_status(&execution_id) => outcome,
        };

        let applied = match outcome {
            Ok(report) => {
                consecutive_failures = 0;
                debug!(
                    "Execution {} for crew {} reported {:?}",
                    execution_id, crew_id, report.status
                );
                ctx.registry.apply_report(&crew_id, &execution_id, &report)
            }
            Err(err) => {
                consecutive_failures += 1;
                match ctx.settings.failure_policy.decide(consecutive_failures) {
                    PollDecision::Retry => {
                        warn!(
                            "Polling execution {} failed ({} in a row), retrying: {}",
                            execution_id, consecutive_failures, err
                        );
                        continue;
                    }
                    PollDecision::GiveUp => {
                        warn!(
                            "Polling execution {} failed, giving up: {}",
                            execution_id, err
                        );
                        ctx.registry.apply_poll_failure(&crew_id, &execution_id)
                    }
                }
            }
        };

        match applied {
            PollApplied::Continue => {}
            PollApplied::Terminal => {
                info!("Execution {} for crew {} finished", execution_id, crew_id);
                break;
            }
            PollApplied::Stale => {
                debug!(
                    "Execution {} no longer owns crew {}; stopping",
                    execution_id, crew_id
                );
                break;
            }
        }
    }

    release_watch(&ctx.watches, &crew_id, &execution_id);
}

// Drop the table entry only if it is still ours; a newer kickoff may own it.
fn release_watch(watches: &WatchTable, crew_id: &str, execution_id: &str) {
    let mut table = lock_table(watches);
    if table
        .get(crew_id)
        .is_some_and(|watch| watch.execution_id == execution_id)
    {
        table.remove(crew_id);
    }
}
