use tracing::{debug, warn};

use crate::errors::{FailureKind, SearchError};
use crate::event::{EventKind, StreamEvent};
use crate::model::{ToolCallIds, ToolRoute};
use crate::results::ResultSet;
use crate::state::{ResultSlots, SearchPhase};
use crate::update::SessionUpdate;

/// Lifecycle of one search.
///
/// `Idle -> Requesting -> Streaming -> Succeeded | Failed(kind)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting,
    Streaming,
    Succeeded,
    Failed(FailureKind),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }
}

/// Per-search dispatcher: interprets decoded events and owns the result
/// accumulator and the fault slot.
#[derive(Debug)]
pub struct SearchSession {
    search_id: uuid::Uuid,
    tool_ids: ToolCallIds,
    slots: ResultSlots,
    fault: Option<SearchError>,
    state: SessionState,
    events_seen: u64,
}

impl SearchSession {
    pub fn new(search_id: uuid::Uuid, tool_ids: ToolCallIds) -> Self {
        Self {
            search_id,
            tool_ids,
            slots: ResultSlots::default(),
            fault: None,
            state: SessionState::Idle,
            events_seen: 0,
        }
    }

    pub fn search_id(&self) -> uuid::Uuid {
        self.search_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn phase(&self) -> SearchPhase {
        self.slots.phase()
    }

    pub fn slots(&self) -> &ResultSlots {
        &self.slots
    }

    pub fn fault(&self) -> Option<&SearchError> {
        self.fault.as_ref()
    }

    pub fn events_seen(&self) -> u64 {
        self.events_seen
    }

    pub(crate) fn mark_requesting(&mut self) {
        if self.state == SessionState::Idle {
            self.state = SessionState::Requesting;
        }
    }

    pub(crate) fn mark_streaming(&mut self) {
        if self.state == SessionState::Requesting {
            self.state = SessionState::Streaming;
        }
    }

    /// Interprets one event and returns the updates it produces.
    ///
    /// The first update is always `Event`. Events arriving after the session
    /// reached a terminal state produce nothing.
    pub fn apply(&mut self, event: StreamEvent) -> Vec<SessionUpdate> {
        if self.state.is_terminal() {
            debug!(kind = %event.kind, "ignoring event after terminal state");
            return Vec::new();
        }
        self.events_seen = self.events_seen.saturating_add(1);
        debug!(seq = self.events_seen, kind = %event.kind, "stream event");

        let dispatched = self.dispatch(&event);
        let mut updates = Vec::with_capacity(2);
        updates.push(SessionUpdate::Event(event));
        updates.extend(dispatched);
        updates
    }

    fn dispatch(&mut self, event: &StreamEvent) -> Option<SessionUpdate> {
        match &event.kind {
            EventKind::RunError => {
                let err = SearchError::run_failed(event.content.as_deref());
                self.fail(err.clone()).then_some(SessionUpdate::Failed(err))
            }
            EventKind::ToolCallResult => self.dispatch_tool_result(event),
            EventKind::LegacyError => {
                let message = event
                    .content
                    .clone()
                    .unwrap_or_else(|| "Unknown stream error".to_string());
                warn!(%message, "backend reported legacy error event");
                Some(SessionUpdate::BackendError(SearchError::BackendError {
                    message,
                }))
            }
            EventKind::Other(_) => None,
        }
    }

    fn dispatch_tool_result(&mut self, event: &StreamEvent) -> Option<SessionUpdate> {
        let Some(content) = event.content.as_deref() else {
            warn!("tool call result without content");
            return None;
        };
        let tool_call_id = event.tool_call_id.as_deref().unwrap_or_default();
        let Some(route) = self.tool_ids.route(tool_call_id) else {
            debug!(tool_call_id, "tool call result for undispatched tool");
            return None;
        };
        let results = match ResultSet::from_content(content) {
            Ok(results) => results,
            Err(err) => {
                warn!(tool_call_id, error = %err, "skipping unparseable tool call result");
                return None;
            }
        };
        debug!(?route, hits = results.len(), "result set received");
        match route {
            ToolRoute::Search => {
                self.slots.record_initial(results.clone());
                Some(SessionUpdate::SearchData(results))
            }
            ToolRoute::Rerank => {
                self.slots.record_reranked(results.clone());
                Some(SessionUpdate::RerankedData(results))
            }
        }
    }

    /// Records a terminal failure.
    ///
    /// Returns `false` if the session had already terminated; the first
    /// outcome always wins.
    pub fn fail(&mut self, err: SearchError) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = SessionState::Failed(err.failure_kind());
        self.fault = Some(err);
        true
    }

    /// Resolves the session at end of stream.
    pub fn finish(&mut self) -> Result<ResultSet, SearchError> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        match self.slots.current().cloned() {
            Some(results) => {
                self.state = SessionState::Succeeded;
                Ok(results)
            }
            None => {
                let err = SearchError::NoResults;
                self.fail(err.clone());
                Err(err)
            }
        }
    }
}
