#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

use crewdeck::core::execution::ExecutionRegistry;

pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

type Reply = (StatusCode, Json<Value>);

struct MockExecution {
    polls_left: u32,
    inputs: Map<String, Value>,
}

#[derive(Default)]
struct Backend {
    agents: Vec<Value>,
    tasks: Vec<Value>,
    crews: Map<String, Value>,
    executions: HashMap<String, MockExecution>,
    polls_until_done: u32,
    kickoffs: Vec<(String, Value)>,
}

#[derive(Clone)]
struct MockBackendState {
    inner: Arc<Mutex<Backend>>,
}

impl MockBackendState {
    fn with<R>(&self, f: impl FnOnce(&mut Backend) -> R) -> R {
        let mut backend = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut backend)
    }
}

fn detail(status: StatusCode, msg: &str) -> Reply {
    (status, Json(json!({ "detail": msg })))
}

fn str_field<'a>(body: &'a Value, key: &str) -> &'a str {
    body.get(key).and_then(Value::as_str).unwrap_or("")
}

async fn welcome() -> Json<Value> {
    Json(json!({ "message": "Welcome to the CrewAI API" }))
}

async fn list_agents(State(state): State<MockBackendState>) -> Json<Value> {
    Json(Value::Array(state.with(|b| b.agents.clone())))
}

async fn create_agent(State(state): State<MockBackendState>, Json(agent): Json<Value>) -> Reply {
    let role = str_field(&agent, "role").to_string();
    state.with(|b| {
        if b.agents.iter().any(|a| str_field(a, "role") == role) {
            return detail(StatusCode::BAD_REQUEST, "Agent with this role already exists.");
        }
        b.agents.push(agent);
        (
            StatusCode::CREATED,
            Json(json!({ "role": role, "message": "Agent created successfully." })),
        )
    })
}

async fn list_tasks(State(state): State<MockBackendState>) -> Json<Value> {
    Json(Value::Array(state.with(|b| b.tasks.clone())))
}

async fn create_task(State(state): State<MockBackendState>, Json(task): Json<Value>) -> Reply {
    state.with(|b| {
        let agent = str_field(&task, "agent");
        if !b.agents.iter().any(|a| str_field(a, "role") == agent) {
            return detail(StatusCode::NOT_FOUND, "Agent not found.");
        }
        let description = str_field(&task, "description").to_string();
        b.tasks.push(task);
        (
            StatusCode::CREATED,
            Json(json!({ "description": description, "message": "Task created successfully." })),
        )
    })
}

async fn list_crews(State(state): State<MockBackendState>) -> Json<Value> {
    Json(Value::Object(state.with(|b| b.crews.clone())))
}

async fn create_crew(State(state): State<MockBackendState>, Json(crew): Json<Value>) -> Reply {
    state.with(|b| {
        let names = |key: &str| -> Vec<String> {
            crew.get(key)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };
        for role in names("agents") {
            if !b.agents.iter().any(|a| str_field(a, "role") == role) {
                return detail(StatusCode::NOT_FOUND, &format!("Agent '{}' not found.", role));
            }
        }
        for description in names("tasks") {
            if !b.tasks.iter().any(|t| str_field(t, "description") == description) {
                return detail(
                    StatusCode::NOT_FOUND,
                    &format!("Task '{}' not found.", description),
                );
            }
        }
        let crew_id = Uuid::new_v4().to_string();
        b.crews.insert(crew_id.clone(), crew);
        (
            StatusCode::CREATED,
            Json(json!({ "crew_id": crew_id, "message": "Crew created successfully." })),
        )
    })
}

async fn kickoff(
    State(state): State<MockBackendState>,
    Path(crew_id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    state.with(|b| {
        b.kickoffs.push((crew_id.clone(), body.clone()));
        if !b.crews.contains_key(&crew_id) {
            return detail(StatusCode::NOT_FOUND, "Crew not found.");
        }
        let inputs = body
            .get("inputs")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let execution_id = Uuid::new_v4().to_string();
        b.executions.insert(
            execution_id.clone(),
            MockExecution {
                polls_left: b.polls_until_done,
                inputs,
            },
        );
        (
            StatusCode::ACCEPTED,
            Json(json!({ "execution_id": execution_id, "message": "Crew execution started." })),
        )
    })
}

async fn execution_status(
    State(state): State<MockBackendState>,
    Path(execution_id): Path<String>,
) -> Reply {
    state.with(|b| {
        let Some(execution) = b.executions.get_mut(&execution_id) else {
            return detail(StatusCode::NOT_FOUND, "Execution not found.");
        };
        if execution.polls_left > 0 {
            execution.polls_left -= 1;
            return (StatusCode::OK, Json(json!({ "status": "RUNNING" })));
        }
        let body = match execution.inputs.get("fail").and_then(Value::as_str) {
            Some(reason) => json!({ "status": "FAILED", "result": reason }),
            None => json!({
                "status": "COMPLETED",
                "result": { "report": execution.inputs.get("topic").cloned().unwrap_or(Value::Null) }
            }),
        };
        (StatusCode::OK, Json(body))
    })
}

/// In-process stand-in for the crew backend's REST surface.
pub struct MockBackend {
    pub port: u16,
    state: MockBackendState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl MockBackend {
    pub async fn start() -> TestResult<Self> {
        let port = find_free_port()?;
        let state = MockBackendState {
            inner: Arc::new(Mutex::new(Backend::default())),
        };
        let app = Router::new()
            .route("/", get(welcome))
            .route("/agents", get(list_agents).post(create_agent))
            .route("/tasks", get(list_tasks).post(create_task))
            .route("/crews", get(list_crews).post(create_crew))
            .route("/crews/{crew_id}/kickoff", post(kickoff))
            .route("/executions/{execution_id}", get(execution_status))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Ok(Self {
            port,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Number of RUNNING answers each new execution gives before settling.
    pub fn set_polls_until_done(&self, polls: u32) {
        self.state.with(|b| b.polls_until_done = polls);
    }

    /// Drop every execution, as a backend restart would.
    pub fn forget_executions(&self) {
        self.state.with(|b| b.executions.clear());
    }

    pub fn kickoffs(&self) -> Vec<(String, Value)> {
        self.state.with(|b| b.kickoffs.clone())
    }

    /// Seed one agent, one task and one crew; returns the crew id.
    pub fn seed_crew(&self) -> String {
        self.state.with(|b| {
            b.agents.push(json!({
                "role": "Researcher",
                "goal": "Find sources",
                "backstory": "Ex-librarian",
                "allow_delegation": true,
                "verbose": false,
                "tools": []
            }));
            b.tasks.push(json!({
                "description": "Research the topic",
                "expected_output": "A summary",
                "agent": "Researcher"
            }));
            let crew_id = Uuid::new_v4().to_string();
            b.crews.insert(
                crew_id.clone(),
                json!({
                    "agents": ["Researcher"],
                    "tasks": ["Research the topic"],
                    "process": "sequential"
                }),
            );
            crew_id
        })
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

pub fn find_free_port() -> TestResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

/// Wait until the crew's record leaves RUNNING.
pub async fn wait_until_settled(registry: &ExecutionRegistry, crew_id: &str) -> TestResult<()> {
    for _ in 0..200 {
        if registry
            .get(crew_id)
            .is_some_and(|record| !record.is_running())
        {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    Err(format!("crew {} never settled", crew_id).into())
}
