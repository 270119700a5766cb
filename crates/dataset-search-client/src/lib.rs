//! Streaming client for the dataset discovery search API.
//!
//! A search posts the user's query to the backend, which answers with a
//! server-sent-event stream. Initial search hits arrive first as a tool-call
//! result; a reranked result set may follow. A `RUN_ERROR` event ends the
//! search with the backend's message.
//!
//! # Handler-based usage
//!
//! ```no_run
//! use dataset_search_client::prelude::*;
//!
//! struct Printer;
//!
//! impl SearchHandler for Printer {
//!     fn on_search_data(&mut self, results: &ResultSet) {
//!         println!("{} initial hits", results.len());
//!     }
//!
//!     fn on_reranked_data(&mut self, results: &ResultSet) {
//!         println!("{} reranked hits", results.len());
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), SearchError> {
//! let client = SearchClient::builder()
//!     .config(ClientConfig::new("http://localhost:8080"))
//!     .build()?;
//!
//! let results = client
//!     .search("sea surface temperature, daily, 2020")
//!     .model("einfracz/gpt-oss-120b")
//!     .run(&mut Printer)
//!     .await?;
//! println!("{:?}", results.summary);
//! # Ok(())
//! # }
//! ```

/// Search client entry point and builder.
pub mod client;
/// Client configuration.
pub mod config;
/// Error taxonomy.
pub mod errors;
/// Wire event records.
pub mod event;
/// Model ids, tool-call ids and per-search options.
pub mod model;
/// Tracing subscriber bootstrap and the per-search span.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Frame splitting and event decoding.
pub mod reader;
/// Dataset hit and result-set payloads.
pub mod results;
/// Search builder, pull stream, channel stream and cancellation.
pub mod run;
/// Per-search dispatch state machine.
pub mod session;
/// Initial/reranked result accumulator.
pub mod state;
/// HTTP transport and request body.
pub mod transport;
/// Session updates and handler trait.
pub mod update;

pub use client::{SearchClient, SearchClientBuilder};
pub use config::ClientConfig;
pub use errors::{FailureKind, FrameError, SearchError};
pub use event::{EventKind, StreamEvent};
pub use model::{ModelId, SearchOptions, ToolCallIds};
pub use observability::{LogSettings, init_observability, init_with, search_span};
pub use reader::{ByteStream, FrameDecoder, RawFrame};
pub use results::{DatasetHit, ResultSet};
pub use run::{AbortHandle, SearchBuilder, SearchChannel, SearchStream};
pub use session::{SearchSession, SessionState};
pub use state::{ResultSlots, SearchPhase};
pub use transport::{HttpTransport, SearchRequest, SearchTransport};
pub use update::{SearchHandler, SessionUpdate};
