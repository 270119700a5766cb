use std::time::Duration;

/// Local decode failure for a single frame.
///
/// Frame errors never end a session: the reader logs them and moves on to the
/// next frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The `data:` line did not hold a JSON event object.
    #[error("invalid event JSON: {message}")]
    InvalidJson { message: String, preview: String },
}

impl FrameError {
    pub(crate) fn invalid_json(err: &serde_json::Error, data: &str) -> Self {
        const PREVIEW_CHARS: usize = 120;
        Self::InvalidJson {
            message: err.to_string(),
            preview: data.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

/// Coarse classification of a terminal session failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The deadline elapsed before the stream completed.
    Timeout,
    /// Connection, HTTP status or stream read failure.
    Network,
    /// The backend reported `RUN_ERROR`.
    RunError,
    /// The caller aborted the search.
    Cancelled,
    /// Anything else (validation, missing results, protocol violations).
    Other,
}

/// Top-level error type for the search client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid input to the search builder.
    #[error("validation error: {0}")]
    Validation(String),
    /// Connection or stream read failure.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The backend answered with a non-2xx status before streaming began.
    #[error("HTTP error! status: {status}")]
    Status { status: u16, body: String },
    /// The request/stream deadline elapsed.
    #[error("Request timeout after {} seconds. Please try again.", .timeout.as_secs_f64())]
    Timeout { timeout: Duration },
    /// The backend's agent run failed (`RUN_ERROR` event).
    #[error("{message}")]
    RunFailed { message: String },
    /// Legacy `error` event. Reported to handlers but never terminal.
    #[error("{message}")]
    BackendError { message: String },
    /// The stream closed without ever producing a usable result set.
    #[error("No search results received")]
    NoResults,
    /// An unterminated frame grew past the configured buffer cap.
    #[error("stream buffer exceeded {limit} bytes without a complete frame")]
    BufferOverflow { limit: usize },
    /// The caller aborted the search.
    #[error("search cancelled")]
    Cancelled,
    /// Internal protocol misuse or invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SearchError {
    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a run-level error from an optional backend message.
    pub fn run_failed(message: Option<&str>) -> Self {
        Self::RunFailed {
            message: message
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or("Agent run failed")
                .to_string(),
        }
    }

    /// Returns `false` only for the legacy non-terminal `error` event.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::BackendError { .. })
    }

    /// Classifies the error for session state reporting.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Transport { .. } | Self::Status { .. } | Self::BufferOverflow { .. } => {
                FailureKind::Network
            }
            Self::RunFailed { .. } => FailureKind::RunError,
            Self::Cancelled => FailureKind::Cancelled,
            Self::Config(_)
            | Self::Validation(_)
            | Self::BackendError { .. }
            | Self::NoResults
            | Self::Protocol(_) => FailureKind::Other,
        }
    }

    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}
