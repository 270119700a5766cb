use std::path::Path;

use clap::Parser;
use dataset_search_client::{ClientConfig, SearchError, ToolCallIds};

/// Loads `.env` next to the crate manifest, then from the working directory.
pub fn load_env_files() {
    let _ = dotenvy::from_path(Path::new(
        format!("{}/.env", env!("CARGO_MANIFEST_DIR")).as_str(),
    ));
    dotenvy::dotenv().ok();
}

/// Search scientific datasets through the streaming search backend.
#[derive(Debug, Parser)]
#[command(name = "dataset-search", version)]
pub struct Args {
    /// Free-text query.
    pub query: String,

    /// Backend model id (defaults to DATASET_SEARCH_MODEL or the built-in default).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Backend origin, e.g. http://localhost:8080.
    #[arg(long, env = "DATASET_SEARCH_BASE_URL")]
    pub base_url: Option<String>,

    /// Bound on request plus stream duration in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Tool-call id of the initial search result.
    #[arg(long)]
    pub search_tool_id: Option<String>,

    /// Tool-call id of the reranked result.
    #[arg(long)]
    pub rerank_tool_id: Option<String>,

    /// Maximum number of hits printed per phase.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Print every decoded stream event.
    #[arg(long)]
    pub show_events: bool,

    /// Print the final result set as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Environment settings overridden by command-line flags.
    pub fn client_config(&self) -> Result<ClientConfig, SearchError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(base_url) = &self.base_url {
            config = config.base_url(base_url.clone());
        }
        if self.search_tool_id.is_some() || self.rerank_tool_id.is_some() {
            let current = config.tool_call_ids.clone();
            config = config.tool_call_ids(ToolCallIds::new(
                self.search_tool_id.clone().unwrap_or(current.search),
                self.rerank_tool_id.clone().unwrap_or(current.rerank),
            ));
        }
        Ok(config)
    }
}
