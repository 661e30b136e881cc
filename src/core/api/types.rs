use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

use super::error::ValidationError;

fn default_true() -> bool {
    true
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<String>,
    #[serde(default = "default_true")]
    pub allow_delegation: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub tools: Vec<String>,
}

impl AgentSpec {
    pub fn new(role: &str, goal: &str, backstory: &str) -> Self {
        Self {
            role: role.to_string(),
            goal: goal.to_string(),
            backstory: backstory.to_string(),
            llm: None,
            allow_delegation: true,
            verbose: false,
            tools: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("role", &self.role)?;
        require("goal", &self.goal)?;
        require("backstory", &self.backstory)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub description: String,
    pub expected_output: String,
    /// Role of the agent the task is assigned to.
    pub agent: String,
}

impl TaskSpec {
    pub fn new(description: &str, expected_output: &str, agent: &str) -> Self {
        Self {
            description: description.to_string(),
            expected_output: expected_output.to_string(),
            agent: agent.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("description", &self.description)?;
        require("expected_output", &self.expected_output)?;
        require("agent", &self.agent)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrewProcess {
    #[default]
    Sequential,
    Hierarchical,
}

impl CrewProcess {
    pub fn as_str(self) -> &'static str {
        match self {
            CrewProcess::Sequential => "sequential",
            CrewProcess::Hierarchical => "hierarchical",
        }
    }
}

impl FromStr for CrewProcess {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "sequential" => Ok(CrewProcess::Sequential),
            "hierarchical" => Ok(CrewProcess::Hierarchical),
            other => Err(ValidationError::UnknownProcess(other.to_string())),
        }
    }
}

// The backend lowercases the process name itself, so stored crews may carry
// any casing.
impl<'de> Deserialize<'de> for CrewProcess {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl fmt::Display for CrewProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A crew as the backend stores it: agent roles and task descriptions, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewSpec {
    pub agents: Vec<String>,
    pub tasks: Vec<String>,
    #[serde(default)]
    pub process: CrewProcess,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_llm: Option<String>,
}

impl CrewSpec {
    pub fn new(agents: Vec<String>, tasks: Vec<String>) -> Self {
        Self {
            agents,
            tasks,
            process: CrewProcess::default(),
            manager_llm: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.agents.iter().all(|a| a.trim().is_empty()) {
            return Err(ValidationError::EmptyList("agents"));
        }
        if self.tasks.iter().all(|t| t.trim().is_empty()) {
            return Err(ValidationError::EmptyList("tasks"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Welcome {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedAgent {
    pub role: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedTask {
    pub description: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedCrew {
    pub crew_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KickoffAccepted {
    pub execution_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Status values reported by `GET /executions/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub status: RemoteStatus,
    #[serde(default)]
    pub result: Value,
}

impl ExecutionReport {
    pub fn running() -> Self {
        Self {
            status: RemoteStatus::Running,
            result: Value::Null,
        }
    }

    pub fn completed(result: Value) -> Self {
        Self {
            status: RemoteStatus::Completed,
            result,
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            status: RemoteStatus::Failed,
            result: Value::String(message.to_string()),
        }
    }
}

/// Shortened crew id for listings.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
