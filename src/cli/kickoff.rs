use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::debug;

use crate::core::api::{EntityStore, RemoteStatus};
use crate::core::execution::{
    ExecutionRegistry, ExecutionStatus, ExecutionWatcher, KickoffError, WatcherSettings,
    failure_detail,
};
use crate::core::terminal::{
    print_error, print_info, print_launch, print_record, print_status, print_success, print_warn,
};

/// Kick off every crew with the same inputs and follow them to completion.
pub async fn run_kickoff(
    store: Arc<dyn EntityStore>,
    settings: WatcherSettings,
    crew_ids: &[String],
    inputs: &str,
) -> Result<()> {
    let registry = ExecutionRegistry::new();
    let mut updates = BroadcastStream::new(registry.subscribe());
    let watcher = ExecutionWatcher::new(store, registry.clone(), settings);

    // Last status shown per crew, so steady RUNNING polls print nothing.
    let mut shown: HashMap<String, ExecutionStatus> = HashMap::new();
    let mut launch_failures = 0usize;

    // A crew named twice would only supersede its own launch.
    let mut crews: Vec<&String> = Vec::with_capacity(crew_ids.len());
    for crew_id in crew_ids {
        if !crews.contains(&crew_id) {
            crews.push(crew_id);
        }
    }

    for &crew_id in &crews {
        match watcher.kickoff(crew_id, inputs).await {
            Ok(execution_id) => {
                print_launch(crew_id, &execution_id);
                shown.insert(crew_id.clone(), ExecutionStatus::Running);
            }
            Err(KickoffError::Validation(err)) => return Err(err.into()),
            Err(err) => {
                launch_failures += 1;
                print_error(&format!("crew {}: {}", crew_id, err));
            }
        }
    }

    if shown.is_empty() {
        return Err(anyhow!("no execution was started"));
    }
    print_info(&format!(
        "Watching {} execution(s), polling every {:?}",
        shown.len(),
        settings.poll_interval
    ));

    while !all_settled(&registry, &shown) {
        tokio::select! {
            update = updates.next() => match update {
                Some(Ok(update)) => {
                    let status = update.record.status();
                    if let Some(last) = shown.get_mut(&update.crew_id)
                        && *last != status
                    {
                        *last = status;
                        print_record(&update.crew_id, &update.record);
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    debug!("Skipped {} registry updates", skipped);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                print_warn("Interrupted; cancelling watches.");
                watcher.shutdown().await;
                return Ok(());
            }
        }
    }

    // Terminal updates may still be queued behind the settle check.
    let mut failed = launch_failures;
    for (crew_id, last) in &shown {
        let Some(record) = registry.get(crew_id) else {
            continue;
        };
        if record.status() != *last {
            print_record(crew_id, &record);
        }
        if record.status() == ExecutionStatus::Failed {
            failed += 1;
        }
    }

    let total = crews.len();
    if failed > 0 {
        return Err(anyhow!("{} of {} execution(s) did not complete", failed, total));
    }
    print_success(&format!("{} execution(s) completed", total));
    Ok(())
}

fn all_settled(registry: &ExecutionRegistry, watched: &HashMap<String, ExecutionStatus>) -> bool {
    watched.keys().all(|crew_id| {
        registry
            .get(crew_id)
            .is_none_or(|record| !record.is_running())
    })
}

/// One-off status query, without starting a watch.
pub async fn show_status(store: &dyn EntityStore, execution_id: &str) -> Result<()> {
    let report = store.execution_status(execution_id).await?;
    let status = ExecutionStatus::from(report.status);
    print_status("Execution", execution_id);
    print_status("Status", status.as_str());
    match report.status {
        RemoteStatus::Running => {}
        RemoteStatus::Completed => {
            println!("{}", serde_json::to_string_pretty(&report.result)?);
        }
        RemoteStatus::Failed => print_error(&failure_detail(&report.result)),
    }
    Ok(())
}
