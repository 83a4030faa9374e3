use serde::Serialize;
use thiserror::Error;

/// Client-level error type.
/// Every failure is recoverable: the session keeps its prior state and the
/// user may retry.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Another request is still in progress")]
    Busy,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Message reported by the backend itself (`error` field or HTTP `detail`).
    #[error("{0}")]
    Backend(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// A transient, user-facing message shown once and then cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub code: &'static str,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            code: "INFO",
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.code != "INFO"
    }
}

impl StudioError {
    /// Maps the error onto the notice the user sees.
    /// Backend messages are passed through verbatim.
    pub fn notice(&self) -> Notice {
        let (code, message) = match self {
            StudioError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            StudioError::Busy => (
                "BUSY",
                "Please wait for the current request to finish".to_string(),
            ),
            StudioError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            StudioError::Backend(msg) => ("BACKEND_ERROR", msg.clone()),
            StudioError::Http(e) => {
                tracing::error!("HTTP error: {e}");
                ("HTTP_ERROR", format!("API error: {e}"))
            }
            StudioError::Parse(e) => {
                tracing::error!("Unexpected backend payload: {e}");
                (
                    "PARSE_ERROR",
                    "The server returned an unexpected response".to_string(),
                )
            }
            StudioError::Io(e) => {
                tracing::error!("I/O error: {e}");
                ("IO_ERROR", e.to_string())
            }
            StudioError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                ("INTERNAL_ERROR", "An internal error occurred".to_string())
            }
        };

        Notice { code, message }
    }
}
