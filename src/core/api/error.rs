use thiserror::Error;

/// Failure talking to the crew backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not reach backend: {0}")]
    Transport(String),

    #[error("backend rejected request ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("unexpected response from backend: {0}")]
    Decode(String),

    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Local input problems. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0} must list at least one entry")]
    EmptyList(&'static str),

    #[error(
        "inputs are empty; provide at least one input variable, e.g. {{\"topic\": \"AI in healthcare\"}}"
    )]
    EmptyInputs,

    #[error("inputs are not valid JSON: {0}")]
    MalformedInputs(String),

    #[error("inputs must be a JSON object")]
    InputsNotObject,

    #[error("unknown crew process '{0}' (expected sequential or hierarchical)")]
    UnknownProcess(String),
}
