//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, ClientConfig, DatasetHit, ModelId, ResultSet, SearchBuilder, SearchClient,
    SearchError, SearchHandler, SearchPhase, SearchStream, SessionUpdate, StreamEvent,
};
