use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use super::{
    AgentSpec, ApiError, CreatedAgent, CreatedCrew, CreatedTask, CrewSpec, EntityStore,
    ExecutionReport, KickoffAccepted, TaskSpec, Welcome,
};
use crate::core::execution::KickoffInputs;

/// `EntityStore` backed by the crew backend's JSON REST API.
pub struct HttpEntityStore {
    base_url: Url,
    client: Client,
}

impl HttpEntityStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);
        let resp = self.client.get(url).send().await?;
        decode(resp).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        debug!("POST {}", url);
        let resp = self.client.post(url).json(body).send().await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            detail: rejection_detail(&body),
        });
    }
    resp.json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Pull a readable message out of an error body. The backend answers with
/// `{"detail": "..."}`, or a list of `{"msg": ...}` entries for schema errors.
fn rejection_detail(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        let trimmed = body.trim();
        return if trimmed.is_empty() {
            "request failed".to_string()
        } else {
            trimmed.to_string()
        };
    };

    match parsed.get("detail") {
        Some(Value::String(detail)) => detail.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => other.to_string(),
        None => parsed.to_string(),
    }
}

#[async_trait]
impl EntityStore for HttpEntityStore {
    async fn ping(&self) -> Result<Welcome, ApiError> {
        self.get(&[""]).await
    }

    async fn list_agents(&self) -> Result<Vec<AgentSpec>, ApiError> {
        self.get(&["agents"]).await
    }

    async fn create_agent(&self, agent: &AgentSpec) -> Result<CreatedAgent, ApiError> {
        self.post(&["agents"], agent).await
    }

    async fn list_tasks(&self) -> Result<Vec<TaskSpec>, ApiError> {
        self.get(&["tasks"]).await
    }

    async fn create_task(&self, task: &TaskSpec) -> Result<CreatedTask, ApiError> {
        self.post(&["tasks"], task).await
    }

    async fn list_crews(&self) -> Result<BTreeMap<String, CrewSpec>, ApiError> {
        self.get(&["crews"]).await
    }

    async fn create_crew(&self, crew: &CrewSpec) -> Result<CreatedCrew, ApiError> {
        self.post(&["crews"], crew).await
    }

    async fn kickoff_crew(
        &self,
        crew_id: &str,
        inputs: &KickoffInputs,
    ) -> Result<KickoffAccepted, ApiError> {
        self.post(&["crews", crew_id, "kickoff"], &json!({ "inputs": inputs }))
            .await
    }

    async fn execution_status(&self, execution_id: &str) -> Result<ExecutionReport, ApiError> {
        self.get(&["executions", execution_id]).await
    }
}
