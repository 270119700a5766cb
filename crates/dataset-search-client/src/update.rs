use crate::errors::SearchError;
use crate::event::StreamEvent;
use crate::results::ResultSet;

/// Normalized updates produced by a search session, in delivery order.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionUpdate {
    /// Every decoded event, before any dispatch it triggers.
    Event(StreamEvent),
    /// Initial search results (replaces earlier ones).
    SearchData(ResultSet),
    /// Reranked results (replaces earlier ones).
    RerankedData(ResultSet),
    /// Legacy `error` event; the session keeps streaming.
    BackendError(SearchError),
    /// Terminal success with the final result set.
    Completed(ResultSet),
    /// Terminal failure. Emitted at most once per session.
    Failed(SearchError),
}

impl SessionUpdate {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }

    /// Invokes the matching handler method.
    pub fn dispatch_to<H: SearchHandler + ?Sized>(&self, handler: &mut H) {
        match self {
            Self::Event(event) => handler.on_event(event),
            Self::SearchData(results) => handler.on_search_data(results),
            Self::RerankedData(results) => handler.on_reranked_data(results),
            Self::BackendError(err) | Self::Failed(err) => handler.on_error(err),
            Self::Completed(_) => {}
        }
    }
}

/// Callbacks invoked synchronously while a search streams.
///
/// All methods default to no-ops. `on_error` receives the terminal failure
/// exactly once; legacy backend errors are passed to it as well and can be
/// told apart with [`SearchError::is_fatal`].
pub trait SearchHandler {
    fn on_event(&mut self, _event: &StreamEvent) {}

    fn on_search_data(&mut self, _results: &ResultSet) {}

    fn on_reranked_data(&mut self, _results: &ResultSet) {}

    fn on_error(&mut self, _error: &SearchError) {}
}

impl SearchHandler for () {}
