use thiserror::Error;

pub const GENERIC_CONNECT_ERROR: &str = "Failed to connect to the backend API.";

/// Failure of one submitted query. The `Display` text is what ends up in the
/// query's error field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("{0}")]
    Transport(String),
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("query cancelled")]
    Cancelled,
    #[error("stream ended before a final result was received")]
    Incomplete,
}

impl QueryError {
    pub fn transport(description: impl Into<String>) -> Self {
        let description = description.into();
        if description.trim().is_empty() {
            QueryError::Transport(GENERIC_CONNECT_ERROR.to_string())
        } else {
            QueryError::Transport(description)
        }
    }
}

/// Why a complete NDJSON line could not be turned into a progress event.
#[derive(Debug, Error)]
pub enum LineError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("expected a JSON object, found {kind}")]
    NotAnObject { kind: &'static str },
}
