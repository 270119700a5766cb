use std::fmt;
use std::time::Duration;

/// Default backend inference model.
pub const DEFAULT_MODEL: &str = "einfracz/gpt-oss-120b";
/// Default bound on request plus stream duration.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);
/// Default cap on bytes buffered for one unterminated frame.
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 8 * 1024 * 1024;

/// Backend model identifier (for example `einfracz/gpt-oss-120b`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub String);

impl ModelId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ModelId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Which tool call a `TOOL_CALL_RESULT` belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolRoute {
    Search,
    Rerank,
}

/// Tool-call identifiers agreed with the backend.
///
/// Compared by string equality only.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolCallIds {
    pub search: String,
    pub rerank: String,
}

impl Default for ToolCallIds {
    fn default() -> Self {
        Self {
            search: "search".to_string(),
            rerank: "rerank".to_string(),
        }
    }
}

impl ToolCallIds {
    pub fn new(search: impl Into<String>, rerank: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            rerank: rerank.into(),
        }
    }

    /// Routes a tool-call id; `None` for ids this client does not dispatch.
    pub fn route(&self, tool_call_id: &str) -> Option<ToolRoute> {
        if tool_call_id == self.rerank {
            Some(ToolRoute::Rerank)
        } else if tool_call_id == self.search {
            Some(ToolRoute::Search)
        } else {
            None
        }
    }
}

/// Per-search behavior options.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SearchOptions {
    /// Bound on request plus stream duration.
    pub timeout: Duration,
    /// Bounded update buffer used by `start_channel`.
    pub stream_buffer_capacity: usize,
    /// Cap on bytes buffered for one unterminated frame.
    pub max_buffer_bytes: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            stream_buffer_capacity: 64,
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
        }
    }
}
