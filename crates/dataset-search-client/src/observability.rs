use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::model::ModelId;

const DEFAULT_FILTER: &str = "info";
const DEFAULT_JSON_LOG_FILE: &str = "dataset-search.jsonl";

static SUBSCRIBER: OnceCell<()> = OnceCell::new();

/// Logging settings for client applications.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    /// `false` leaves the global subscriber untouched.
    pub enabled: bool,
    /// `EnvFilter` directives; `info` when unset or invalid.
    pub filter: Option<String>,
    /// JSON lines file. Console output on stderr when unset.
    pub json_path: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            filter: None,
            json_path: None,
        }
    }
}

impl LogSettings {
    /// Reads `DATASET_SEARCH_OBSERVABILITY`, `DATASET_SEARCH_LOG_LEVEL`
    /// (falling back to `RUST_LOG`) and `DATASET_SEARCH_JSON_LOG_PATH`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            enabled: value("DATASET_SEARCH_OBSERVABILITY").is_none_or(|v| !is_off(&v)),
            filter: value("DATASET_SEARCH_LOG_LEVEL").or_else(|| value("RUST_LOG")),
            json_path: value("DATASET_SEARCH_JSON_LOG_PATH").map(PathBuf::from),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        self.filter
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
    }
}

fn is_off(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off" | "disabled"
    )
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let file = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_JSON_LOG_FILE)
        .to_string();
    (dir, file)
}

/// Installs the global subscriber from [`LogSettings::from_env`].
pub fn init_observability() {
    init_with(&LogSettings::from_env());
}

/// Installs the global subscriber once per process; later calls are no-ops.
///
/// Every record emitted while a search runs sits inside [`search_span`], so
/// both outputs carry `search_id` and `model` from the span.
pub fn init_with(settings: &LogSettings) {
    SUBSCRIBER.get_or_init(|| {
        if !settings.enabled {
            return;
        }
        let json = settings.json_path.as_deref().map(|path| {
            let (dir, file) = split_log_path(path);
            let _ = std::fs::create_dir_all(&dir);
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_target(false)
                .with_writer(tracing_appender::rolling::never(dir, file))
        });
        // stdout is left to the caller's search output.
        let console = json.is_none().then(|| {
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
        });
        let _ = tracing_subscriber::registry()
            .with(settings.env_filter())
            .with(console)
            .with(json)
            .try_init();
    });
}

/// Span that scopes the log records of one search.
pub fn search_span(search_id: uuid::Uuid, model: &ModelId) -> tracing::Span {
    tracing::info_span!("dataset_search", %search_id, %model)
}
