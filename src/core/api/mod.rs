mod error;
mod http;
mod types;

use std::collections::BTreeMap;

use async_trait::async_trait;

pub use error::{ApiError, ValidationError};
pub use http::HttpEntityStore;
pub use types::{
    AgentSpec, CreatedAgent, CreatedCrew, CreatedTask, CrewProcess, CrewSpec, ExecutionReport,
    KickoffAccepted, RemoteStatus, TaskSpec, Welcome, short_id,
};

use crate::core::execution::KickoffInputs;

/// The crew backend: owns agents, tasks and crews, and runs executions.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn ping(&self) -> Result<Welcome, ApiError>;

    async fn list_agents(&self) -> Result<Vec<AgentSpec>, ApiError>;

    async fn create_agent(&self, agent: &AgentSpec) -> Result<CreatedAgent, ApiError>;

    async fn list_tasks(&self) -> Result<Vec<TaskSpec>, ApiError>;

    async fn create_task(&self, task: &TaskSpec) -> Result<CreatedTask, ApiError>;

    async fn list_crews(&self) -> Result<BTreeMap<String, CrewSpec>, ApiError>;

    async fn create_crew(&self, crew: &CrewSpec) -> Result<CreatedCrew, ApiError>;

    // Starts a server-side execution; returns as soon as the backend accepts it.
    async fn kickoff_crew(
        &self,
        crew_id: &str,
        inputs: &KickoffInputs,
    ) -> Result<KickoffAccepted, ApiError>;

    async fn execution_status(&self, execution_id: &str) -> Result<ExecutionReport, ApiError>;
}
