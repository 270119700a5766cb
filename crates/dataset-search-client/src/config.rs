use std::time::Duration;

use crate::errors::SearchError;
use crate::model::{DEFAULT_MAX_BUFFER_BYTES, DEFAULT_TIMEOUT, ModelId, ToolCallIds};

/// Configuration for the search client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Origin of the search backend (or the proxy in front of it).
    pub base_url: String,
    /// Path of the streaming search endpoint.
    pub search_path: String,
    /// Value sent verbatim as the `Authorization` header.
    pub api_key: Option<String>,
    /// Model used when a search does not pick one.
    pub default_model: ModelId,
    /// Default bound on request plus stream duration.
    pub timeout: Duration,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Cap on bytes buffered for one unterminated frame.
    pub max_buffer_bytes: usize,
    /// Tool-call identifiers used for dispatch.
    pub tool_call_ids: ToolCallIds,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

impl ClientConfig {
    /// Creates a config for the given backend origin with defaults elsewhere.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            search_path: "/api/search".to_string(),
            api_key: None,
            default_model: ModelId::default(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: Duration::from_secs(10),
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            tool_call_ids: ToolCallIds::default(),
        }
    }

    /// Builds a config from `DATASET_SEARCH_*` environment variables.
    ///
    /// Unset variables keep their defaults; set but unparseable numeric
    /// values are config errors.
    pub fn from_env() -> Result<Self, SearchError> {
        let mut config = Self::default();
        if let Some(base_url) = env_value("DATASET_SEARCH_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(path) = env_value("DATASET_SEARCH_PATH") {
            config.search_path = path;
        }
        config.api_key = env_value("DATASET_SEARCH_API_KEY");
        if let Some(model) = env_value("DATASET_SEARCH_MODEL") {
            config.default_model = ModelId::new(model);
        }
        if let Some(ms) = env_parsed::<u64>("DATASET_SEARCH_TIMEOUT_MS")? {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(bytes) = env_parsed::<usize>("DATASET_SEARCH_MAX_BUFFER_BYTES")? {
            config.max_buffer_bytes = bytes;
        }
        if let Some(id) = env_value("DATASET_SEARCH_TOOL_SEARCH_ID") {
            config.tool_call_ids.search = id;
        }
        if let Some(id) = env_value("DATASET_SEARCH_TOOL_RERANK_ID") {
            config.tool_call_ids.rerank = id;
        }
        Ok(config)
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn search_path(mut self, path: impl Into<String>) -> Self {
        self.search_path = path.into();
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn default_model(mut self, model: impl Into<ModelId>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_buffer_bytes(mut self, bytes: usize) -> Self {
        self.max_buffer_bytes = bytes;
        self
    }

    pub fn tool_call_ids(mut self, ids: ToolCallIds) -> Self {
        self.tool_call_ids = ids;
        self
    }

    /// Checks the values a search cannot run without.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.base_url.trim().is_empty() {
            return Err(SearchError::Config("base_url must not be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(SearchError::Config("timeout must be greater than 0".into()));
        }
        if self.max_buffer_bytes == 0 {
            return Err(SearchError::Config(
                "max_buffer_bytes must be greater than 0".into(),
            ));
        }
        if self.tool_call_ids.search == self.tool_call_ids.rerank {
            return Err(SearchError::Config(format!(
                "search and rerank tool call ids must differ (both {:?})",
                self.tool_call_ids.search
            )));
        }
        Ok(())
    }

    pub(crate) fn search_url(&self) -> String {
        let path = self.search_path.trim_start_matches('/');
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, SearchError> {
    match env_value(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| SearchError::Config(format!("invalid value for {key}: {raw:?}"))),
        None => Ok(None),
    }
}
