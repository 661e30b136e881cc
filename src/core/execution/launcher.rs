use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::core::api::{ApiError, EntityStore, ValidationError};

/// Kickoff inputs that passed validation: a non-empty JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct KickoffInputs(Map<String, Value>);

impl KickoffInputs {
    /// Parse caller-composed text. Nothing here touches the network.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyInputs);
        }
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| ValidationError::MalformedInputs(e.to_string()))?;
        Self::try_from(value)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl TryFrom<Value> for KickoffInputs {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) if map.is_empty() => Err(ValidationError::EmptyInputs),
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ValidationError::InputsNotObject),
        }
    }
}

/// Starts crew executions. Status tracking is the watcher's job.
#[derive(Clone)]
pub struct Launcher {
    store: Arc<dyn EntityStore>,
}

impl Launcher {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub async fn launch(&self, crew_id: &str, inputs: &KickoffInputs) -> Result<String, ApiError> {
        debug!(
            "Launching crew {} with {} input(s)",
            crew_id,
            inputs.as_map().len()
        );
        let accepted = self.store.kickoff_crew(crew_id, inputs).await?;
        if accepted.execution_id.trim().is_empty() {
            return Err(ApiError::Decode(
                "kickoff response carried an empty execution_id".to_string(),
            ));
        }
        info!(
            "Crew {} started execution {}",
            crew_id, accepted.execution_id
        );
        Ok(accepted.execution_id)
    }
}
