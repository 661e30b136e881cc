//! Scripted in-memory `EntityStore` for watcher and launcher tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::KickoffInputs;
use crate::core::api::{
    AgentSpec, ApiError, CreatedAgent, CreatedCrew, CreatedTask, CrewSpec, EntityStore,
    ExecutionReport, KickoffAccepted, TaskSpec, Welcome,
};

#[derive(Default)]
struct Script {
    launches: VecDeque<(Result<String, ApiError>, Option<Duration>)>,
    reports: HashMap<String, VecDeque<Result<ExecutionReport, ApiError>>>,
    delays: HashMap<String, Duration>,
    kickoffs: Vec<String>,
    polls: Vec<String>,
}

#[derive(Default)]
pub struct FakeStore {
    script: Mutex<Script>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_launch(&self, outcome: Result<&str, ApiError>) {
        self.lock()
            .launches
            .push_back((outcome.map(str::to_string), None));
    }

    /// Queue a launch outcome that is only delivered after `delay`.
    pub fn push_launch_after(&self, outcome: Result<&str, ApiError>, delay: Duration) {
        self.lock()
            .launches
            .push_back((outcome.map(str::to_string), Some(delay)));
    }

    /// Queue a poll response for `execution_id`. Once the queue is drained the
    /// execution reports RUNNING.
    pub fn push_report(&self, execution_id: &str, outcome: Result<ExecutionReport, ApiError>) {
        self.lock()
            .reports
            .entry(execution_id.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Make every status call for `execution_id` take `delay` to answer.
    pub fn delay_reports(&self, execution_id: &str, delay: Duration) {
        self.lock().delays.insert(execution_id.to_string(), delay);
    }

    pub fn kickoffs(&self) -> Vec<String> {
        self.lock().kickoffs.clone()
    }

    pub fn polls(&self) -> Vec<String> {
        self.lock().polls.clone()
    }

    pub fn polls_for(&self, execution_id: &str) -> usize {
        self.lock()
            .polls
            .iter()
            .filter(|id| id.as_str() == execution_id)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl EntityStore for FakeStore {
    async fn ping(&self) -> Result<Welcome, ApiError> {
        Ok(Welcome {
            message: "fake".to_string(),
        })
    }

    async fn list_agents(&self) -> Result<Vec<AgentSpec>, ApiError> {
        Ok(Vec::new())
    }

    async fn create_agent(&self, agent: &AgentSpec) -> Result<CreatedAgent, ApiError> {
        Ok(CreatedAgent {
            role: agent.role.clone(),
            message: None,
        })
    }

    async fn list_tasks(&self) -> Result<Vec<TaskSpec>, ApiError> {
        Ok(Vec::new())
    }

    async fn create_task(&self, task: &TaskSpec) -> Result<CreatedTask, ApiError> {
        Ok(CreatedTask {
            description: task.description.clone(),
            message: None,
        })
    }

    async fn list_crews(&self) -> Result<BTreeMap<String, CrewSpec>, ApiError> {
        Ok(BTreeMap::new())
    }

    async fn create_crew(&self, _crew: &CrewSpec) -> Result<CreatedCrew, ApiError> {
        Ok(CreatedCrew {
            crew_id: "crew-fake".to_string(),
            message: None,
        })
    }

    async fn kickoff_crew(
        &self,
        crew_id: &str,
        _inputs: &KickoffInputs,
    ) -> Result<KickoffAccepted, ApiError> {
        let (outcome, delay) = {
            let mut script = self.lock();
            script.kickoffs.push(crew_id.to_string());
            script.launches.pop_front().unwrap_or_else(|| {
                (
                    Err(ApiError::Transport("no launch scripted".to_string())),
                    None,
                )
            })
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome.map(|execution_id| KickoffAccepted {
            execution_id,
            message: None,
        })
    }

    async fn execution_status(&self, execution_id: &str) -> Result<ExecutionReport, ApiError> {
        let delay = {
            let mut script = self.lock();
            script.polls.push(execution_id.to_string());
            script.delays.get(execution_id).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.lock()
            .reports
            .get_mut(execution_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(ExecutionReport::running()))
    }
}
