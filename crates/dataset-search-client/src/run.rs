use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{Instrument as _, debug, info, warn};

use crate::client::ClientInner;
use crate::errors::SearchError;
use crate::model::{ModelId, SearchOptions, ToolCallIds};
use crate::observability::search_span;
use crate::reader::{EventStream, event_stream};
use crate::results::ResultSet;
use crate::session::{SearchSession, SessionState};
use crate::state::SearchPhase;
use crate::transport::{SearchRequest, SearchTransport};
use crate::update::{SearchHandler, SessionUpdate};

/// Handle used to cancel a running search.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The search ends with `SearchError::Cancelled` unless it already
    /// reached a terminal state.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

async fn wait_for_abort(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Builder for configuring and starting a single search.
pub struct SearchBuilder {
    client: Arc<ClientInner>,
    query: String,
    model: Option<ModelId>,
    options: SearchOptions,
}

impl SearchBuilder {
    pub(crate) fn new(client: Arc<ClientInner>, query: String) -> Self {
        let options = SearchOptions {
            timeout: client.config.timeout,
            max_buffer_bytes: client.config.max_buffer_bytes,
            ..SearchOptions::default()
        };
        Self {
            client,
            query,
            model: None,
            options,
        }
    }

    /// Selects the backend model (defaults to the configured model).
    pub fn model(mut self, model: impl Into<ModelId>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Bounds request plus stream duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Sets the bounded update buffer used by `start_channel`.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.options.stream_buffer_capacity = capacity;
        self
    }

    /// Validates the search and opens the stream.
    ///
    /// Request failures (transport, HTTP status, timeout before the first
    /// byte) are returned here; everything later arrives through
    /// [`SearchStream::next_update`].
    pub async fn start_stream(self) -> Result<SearchStream, SearchError> {
        let prepared = self.validate_and_prepare()?;
        let (abort_tx, abort_rx) = watch::channel(false);
        SearchStream::connect(prepared, AbortHandle { tx: abort_tx }, abort_rx).await
    }

    /// Runs the search to completion, invoking `handler` synchronously for
    /// every update.
    ///
    /// Any failure is passed to `handler.on_error` exactly once and returned.
    pub async fn run<H: SearchHandler + ?Sized>(
        self,
        handler: &mut H,
    ) -> Result<ResultSet, SearchError> {
        let mut stream = match self.start_stream().await {
            Ok(stream) => stream,
            Err(err) => {
                handler.on_error(&err);
                return Err(err);
            }
        };
        while let Some(update) = stream.next_update().await {
            update.dispatch_to(handler);
        }
        stream.finish().await
    }

    /// Runs the search to completion without handlers.
    pub async fn collect(self) -> Result<ResultSet, SearchError> {
        self.run(&mut ()).await
    }

    /// Spawns the search on the tokio runtime and returns a channel of updates.
    pub fn start_channel(self) -> Result<SearchChannel, SearchError> {
        let capacity = self.options.stream_buffer_capacity;
        let prepared = self.validate_and_prepare()?;
        let search_id = prepared.search_id;

        let (tx, rx) = mpsc::channel(capacity);
        let (final_tx, final_rx) = oneshot::channel();
        let (abort_tx, abort_rx) = watch::channel(false);
        let abort_handle = AbortHandle { tx: abort_tx };
        tokio::spawn(channel_task(
            prepared,
            abort_handle.clone(),
            abort_rx,
            tx,
            final_tx,
        ));

        Ok(SearchChannel {
            search_id,
            rx,
            final_rx,
            abort_handle,
            saw_terminal: false,
        })
    }

    fn validate_and_prepare(self) -> Result<PreparedSearch, SearchError> {
        if self.query.trim().is_empty() {
            return Err(SearchError::Validation("query must not be empty".into()));
        }
        let model = self
            .model
            .unwrap_or_else(|| self.client.config.default_model.clone());
        if model.as_str().trim().is_empty() {
            return Err(SearchError::Validation("model must not be empty".into()));
        }
        if self.options.timeout.is_zero() {
            return Err(SearchError::Validation(
                "timeout must be greater than 0".into(),
            ));
        }
        if self.options.stream_buffer_capacity == 0 {
            return Err(SearchError::Validation(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        if self.options.max_buffer_bytes == 0 {
            return Err(SearchError::Validation(
                "max_buffer_bytes must be greater than 0".into(),
            ));
        }

        Ok(PreparedSearch {
            search_id: uuid::Uuid::new_v4(),
            transport: self.client.transport.clone(),
            request: SearchRequest::new(self.query, model),
            options: self.options,
            tool_ids: self.client.config.tool_call_ids.clone(),
        })
    }
}

struct PreparedSearch {
    search_id: uuid::Uuid,
    transport: Arc<dyn SearchTransport>,
    request: SearchRequest,
    options: SearchOptions,
    tool_ids: ToolCallIds,
}

enum Step {
    Event(crate::event::StreamEvent),
    Fail(SearchError),
    End,
}

/// Pull-based handle for one streaming search.
///
/// Frames are read lazily: the next frame is only read once every update of
/// the previous one has been returned by `next_update()`.
pub struct SearchStream {
    session: SearchSession,
    span: tracing::Span,
    model: ModelId,
    timeout: Duration,
    started: Instant,
    deadline: Instant,
    events: Option<EventStream>,
    pending: VecDeque<SessionUpdate>,
    outcome: Option<Result<ResultSet, SearchError>>,
    abort_handle: AbortHandle,
    abort_rx: watch::Receiver<bool>,
}

impl SearchStream {
    async fn connect(
        prepared: PreparedSearch,
        abort_handle: AbortHandle,
        mut abort_rx: watch::Receiver<bool>,
    ) -> Result<Self, SearchError> {
        let PreparedSearch {
            search_id,
            transport,
            request,
            options,
            tool_ids,
        } = prepared;
        let mut session = SearchSession::new(search_id, tool_ids);
        let started = Instant::now();
        let deadline = started + options.timeout;
        let span = search_span(search_id, &request.model);
        session.mark_requesting();
        span.in_scope(|| {
            info!(timeout_ms = options.timeout.as_millis() as u64, "starting dataset search");
        });

        let open = tokio::time::timeout_at(deadline, transport.open(&request))
            .instrument(span.clone());
        let opened = tokio::select! {
            biased;
            _ = wait_for_abort(&mut abort_rx) => Err(SearchError::Cancelled),
            opened = open => match opened {
                Ok(result) => result,
                Err(_) => Err(SearchError::Timeout { timeout: options.timeout }),
            },
        };
        let bytes = match opened {
            Ok(bytes) => bytes,
            Err(err) => {
                session.fail(err.clone());
                span.in_scope(|| warn!(error = %err, "search request failed"));
                return Err(err);
            }
        };
        session.mark_streaming();
        span.in_scope(|| debug!("search stream opened"));

        Ok(Self {
            session,
            span,
            model: request.model,
            timeout: options.timeout,
            started,
            deadline,
            events: Some(event_stream(bytes, options.max_buffer_bytes)),
            pending: VecDeque::new(),
            outcome: None,
            abort_handle,
            abort_rx,
        })
    }

    pub fn search_id(&self) -> uuid::Uuid {
        self.session.search_id()
    }

    pub fn model(&self) -> &ModelId {
        &self.model
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn phase(&self) -> SearchPhase {
        self.session.phase()
    }

    /// Best result so far: reranked if received, else initial.
    pub fn latest(&self) -> Option<&ResultSet> {
        self.session.slots().current()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Returns the next update, reading from the network when none is queued.
    ///
    /// Returns `None` once the terminal update has been returned.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        loop {
            if let Some(update) = self.pending.pop_front() {
                return Some(update);
            }
            let events = self.events.as_mut()?;

            let step = tokio::select! {
                biased;
                _ = wait_for_abort(&mut self.abort_rx) => Step::Fail(SearchError::Cancelled),
                _ = tokio::time::sleep_until(self.deadline) => Step::Fail(SearchError::Timeout { timeout: self.timeout }),
                next = events.next() => match next {
                    Some(Ok(event)) => Step::Event(event),
                    Some(Err(err)) => Step::Fail(err),
                    None => Step::End,
                },
            };

            let span = self.span.clone();
            span.in_scope(|| self.apply_step(step));
        }
    }

    fn apply_step(&mut self, step: Step) {
        match step {
            Step::Event(event) => {
                let updates = self.session.apply(event);
                self.pending.extend(updates);
                if self.session.state().is_terminal() {
                    self.conclude();
                }
            }
            Step::Fail(err) => {
                if self.session.fail(err.clone()) {
                    self.pending.push_back(SessionUpdate::Failed(err));
                }
                self.conclude();
            }
            Step::End => {
                let update = match self.session.finish() {
                    Ok(results) => SessionUpdate::Completed(results),
                    Err(err) => SessionUpdate::Failed(err),
                };
                self.pending.push_back(update);
                self.conclude();
            }
        }
    }

    fn conclude(&mut self) {
        // Dropping the event stream releases the response body.
        self.events = None;
        let outcome = self.session.finish();
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let events = self.session.events_seen();
        match &outcome {
            Ok(results) => {
                info!(elapsed_ms, events, hits = results.len(), phase = ?self.session.phase(), "dataset search completed");
            }
            Err(err) => {
                warn!(elapsed_ms, events, error = %err, "dataset search failed");
            }
        }
        self.outcome = Some(outcome);
    }

    /// Drains remaining updates and returns the final result.
    pub async fn finish(mut self) -> Result<ResultSet, SearchError> {
        while self.next_update().await.is_some() {}
        match self.outcome.take() {
            Some(outcome) => outcome,
            None => Err(SearchError::protocol_msg(format!(
                "search {} ended without an outcome",
                self.session.search_id()
            ))),
        }
    }
}

/// Channel handle returned by `SearchBuilder::start_channel`.
pub struct SearchChannel {
    search_id: uuid::Uuid,
    rx: mpsc::Receiver<SessionUpdate>,
    final_rx: oneshot::Receiver<Result<ResultSet, SearchError>>,
    abort_handle: AbortHandle,
    saw_terminal: bool,
}

impl SearchChannel {
    pub fn search_id(&self) -> uuid::Uuid {
        self.search_id
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for the next update; `None` after the channel closes.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        let update = self.rx.recv().await;
        if update.as_ref().is_some_and(SessionUpdate::is_terminal) {
            self.saw_terminal = true;
        }
        update
    }

    /// Drains the channel (if needed) and returns the final result.
    pub async fn finish(mut self) -> Result<ResultSet, SearchError> {
        while !self.saw_terminal {
            match self.rx.recv().await {
                Some(update) if update.is_terminal() => self.saw_terminal = true,
                Some(_) => {}
                None => break,
            }
        }

        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(SearchError::protocol_msg(format!(
                "search task {} ended without final result",
                self.search_id
            ))),
        }
    }
}

async fn channel_task(
    prepared: PreparedSearch,
    abort_handle: AbortHandle,
    abort_rx: watch::Receiver<bool>,
    tx: mpsc::Sender<SessionUpdate>,
    final_tx: oneshot::Sender<Result<ResultSet, SearchError>>,
) {
    let mut stream = match SearchStream::connect(prepared, abort_handle, abort_rx).await {
        Ok(stream) => stream,
        Err(err) => {
            let _ = tx.send(SessionUpdate::Failed(err.clone())).await;
            let _ = final_tx.send(Err(err));
            return;
        }
    };

    while let Some(update) = stream.next_update().await {
        if tx.send(update).await.is_err() {
            stream
                .span
                .in_scope(|| debug!("update receiver dropped, abandoning search"));
            let _ = final_tx.send(Err(SearchError::Cancelled));
            return;
        }
    }
    let _ = final_tx.send(stream.finish().await);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SearchClient;
    use crate::config::ClientConfig;
    use crate::event::{EventKind, StreamEvent};
    use crate::model::DEFAULT_MODEL;
    use crate::reader::ByteStream;
    use futures::stream;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Script {
        Frames(Vec<String>),
        FramesThenPending(Vec<String>),
        FramesThenError(Vec<String>, SearchError),
        OpenError(SearchError),
        SlowOpen(Duration),
    }

    struct ScriptedTransport {
        script: Script,
        opened: Arc<AtomicUsize>,
        last_request: Arc<Mutex<Option<SearchRequest>>>,
    }

    fn chunks_of(frames: &[String]) -> Vec<Result<bytes::Bytes, SearchError>> {
        frames
            .iter()
            .map(|f| Ok(bytes::Bytes::from(f.clone())))
            .collect()
    }

    #[async_trait::async_trait]
    impl SearchTransport for ScriptedTransport {
        async fn open(&self, request: &SearchRequest) -> Result<ByteStream, SearchError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().expect("lock") = Some(request.clone());
            match &self.script {
                Script::Frames(frames) => Ok(Box::pin(stream::iter(chunks_of(frames)))),
                Script::FramesThenPending(frames) => Ok(Box::pin(
                    stream::iter(chunks_of(frames)).chain(stream::pending()),
                )),
                Script::FramesThenError(frames, err) => {
                    let mut chunks = chunks_of(frames);
                    chunks.push(Err(err.clone()));
                    Ok(Box::pin(stream::iter(chunks)))
                }
                Script::OpenError(err) => Err(err.clone()),
                Script::SlowOpen(delay) => {
                    tokio::time::sleep(*delay).await;
                    Ok(Box::pin(stream::empty()))
                }
            }
        }
    }

    struct Harness {
        client: SearchClient,
        opened: Arc<AtomicUsize>,
        last_request: Arc<Mutex<Option<SearchRequest>>>,
    }

    fn harness(script: Script) -> Harness {
        harness_with(script, ClientConfig::default())
    }

    fn harness_with(script: Script, config: ClientConfig) -> Harness {
        let opened = Arc::new(AtomicUsize::new(0));
        let last_request = Arc::new(Mutex::new(None));
        let client = SearchClient::builder()
            .config(config)
            .transport(Arc::new(ScriptedTransport {
                script,
                opened: opened.clone(),
                last_request: last_request.clone(),
            }))
            .build()
            .expect("client");
        Harness {
            client,
            opened,
            last_request,
        }
    }

    fn results(summary: &str) -> ResultSet {
        serde_json::from_value(serde_json::json!({
            "hits": [{"_id": summary, "_score": 1.0, "_source": {"titles": [{"title": summary}]}}],
            "summary": summary,
        }))
        .expect("results")
    }

    fn tool_frame(id: &str, summary: &str) -> String {
        StreamEvent::tool_call_result(id, &results(summary))
            .and_then(|e| e.to_frame())
            .expect("frame")
    }

    fn frame(kind: &str, content: Option<&str>) -> String {
        let mut event = StreamEvent::new(EventKind::from(kind.to_string()));
        event.content = content.map(ToOwned::to_owned);
        event.to_frame().expect("frame")
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        errors: Vec<SearchError>,
    }

    impl SearchHandler for Recorder {
        fn on_event(&mut self, event: &StreamEvent) {
            self.calls.push(format!("event:{}", event.kind));
        }

        fn on_search_data(&mut self, results: &ResultSet) {
            self.calls
                .push(format!("search:{}", results.summary.as_deref().unwrap_or("")));
        }

        fn on_reranked_data(&mut self, results: &ResultSet) {
            self.calls
                .push(format!("rerank:{}", results.summary.as_deref().unwrap_or("")));
        }

        fn on_error(&mut self, error: &SearchError) {
            self.calls.push("error".into());
            self.errors.push(error.clone());
        }
    }

    #[tokio::test]
    async fn search_then_rerank_resolves_with_rerank_payload() {
        let h = harness(Script::Frames(vec![
            frame("RUN_STARTED", None),
            tool_frame("search", "initial"),
            tool_frame("rerank", "final"),
            frame("RUN_FINISHED", None),
        ]));
        let mut recorder = Recorder::default();
        let result = h.client.search("sea ice").run(&mut recorder).await;

        assert_eq!(result, Ok(results("final")));
        assert_eq!(
            recorder.calls,
            vec![
                "event:RUN_STARTED",
                "event:TOOL_CALL_RESULT",
                "search:initial",
                "event:TOOL_CALL_RESULT",
                "rerank:final",
                "event:RUN_FINISHED",
            ]
        );
        assert!(recorder.errors.is_empty());
    }

    #[tokio::test]
    async fn run_error_rejects_and_stops_dispatch() {
        let h = harness(Script::Frames(vec![
            tool_frame("search", "initial"),
            frame("RUN_ERROR", Some("reranker crashed")),
            tool_frame("rerank", "too late"),
            frame("RUN_FINISHED", None),
        ]));
        let mut recorder = Recorder::default();
        let result = h.client.search("sea ice").run(&mut recorder).await;

        let expected = SearchError::RunFailed {
            message: "reranker crashed".into(),
        };
        assert_eq!(result, Err(expected.clone()));
        assert_eq!(recorder.errors, vec![expected]);
        assert_eq!(
            recorder.calls,
            vec![
                "event:TOOL_CALL_RESULT",
                "search:initial",
                "event:RUN_ERROR",
                "error",
            ]
        );
    }

    #[tokio::test]
    async fn run_error_without_content_uses_fallback_message() {
        let h = harness(Script::Frames(vec![frame("RUN_ERROR", None)]));
        let err = h.client.search("q").collect().await.expect_err("run error");
        assert_eq!(err.to_string(), "Agent run failed");
    }

    #[tokio::test]
    async fn end_of_stream_without_results_rejects() {
        let h = harness(Script::Frames(vec![
            frame("RUN_STARTED", None),
            frame("RUN_FINISHED", None),
        ]));
        let mut recorder = Recorder::default();
        let err = h
            .client
            .search("q")
            .run(&mut recorder)
            .await
            .expect_err("no results");
        assert_eq!(err.to_string(), "No search results received");
        assert_eq!(recorder.errors, vec![SearchError::NoResults]);
    }

    #[tokio::test]
    async fn legacy_error_is_reported_without_ending_the_search() {
        let h = harness(Script::Frames(vec![
            frame("error", Some("rerank degraded")),
            tool_frame("search", "initial"),
        ]));
        let mut recorder = Recorder::default();
        let result = h.client.search("q").run(&mut recorder).await;

        assert_eq!(result, Ok(results("initial")));
        assert_eq!(recorder.errors.len(), 1);
        assert!(!recorder.errors[0].is_fatal());
    }

    #[tokio::test]
    async fn malformed_frames_do_not_fail_the_search() {
        let h = harness(Script::Frames(vec![
            "data: {broken\n\n".to_string(),
            tool_frame("search", "initial"),
        ]));
        let result = h.client.search("q").collect().await;
        assert_eq!(result, Ok(results("initial")));
    }

    #[tokio::test]
    async fn timeout_after_partial_data_rejects_and_stops_handlers() {
        let h = harness(Script::FramesThenPending(vec![tool_frame("search", "initial")]));
        let mut recorder = Recorder::default();
        let err = h
            .client
            .search("q")
            .timeout(Duration::from_millis(50))
            .run(&mut recorder)
            .await
            .expect_err("timeout");

        assert_eq!(
            err,
            SearchError::Timeout {
                timeout: Duration::from_millis(50)
            }
        );
        assert!(err.to_string().contains("0.05 seconds"));
        assert_eq!(recorder.errors.len(), 1);
        assert_eq!(recorder.calls.last().map(String::as_str), Some("error"));
    }

    #[tokio::test]
    async fn timeout_covers_request_phase() {
        let h = harness(Script::SlowOpen(Duration::from_secs(5)));
        let mut recorder = Recorder::default();
        let err = h
            .client
            .run_search("q", "m", &mut recorder, Some(Duration::from_millis(30)))
            .await
            .expect_err("timeout");
        assert!(matches!(err, SearchError::Timeout { .. }));
        assert_eq!(recorder.calls, vec!["error"]);
    }

    #[tokio::test]
    async fn transport_failure_before_streaming_is_reported_once() {
        let h = harness(Script::OpenError(SearchError::Status {
            status: 503,
            body: "busy".into(),
        }));
        let mut recorder = Recorder::default();
        let err = h
            .client
            .search("q")
            .run(&mut recorder)
            .await
            .expect_err("status");
        assert_eq!(err.to_string(), "HTTP error! status: 503");
        assert_eq!(recorder.errors.len(), 1);
    }

    #[tokio::test]
    async fn stream_read_failure_after_results_is_fatal() {
        let h = harness(Script::FramesThenError(
            vec![tool_frame("search", "initial")],
            SearchError::transport("connection reset"),
        ));
        let mut stream = h.client.search("q").start_stream().await.expect("start");
        let mut saw_search = false;
        let mut failure = None;
        while let Some(update) = stream.next_update().await {
            match update {
                SessionUpdate::SearchData(_) => saw_search = true,
                SessionUpdate::Failed(err) => failure = Some(err),
                _ => {}
            }
        }
        assert!(saw_search);
        assert_eq!(failure, Some(SearchError::transport("connection reset")));
        assert_eq!(
            stream.state(),
            SessionState::Failed(crate::errors::FailureKind::Network)
        );
        assert_eq!(stream.latest(), Some(&results("initial")));
        assert!(stream.finish().await.is_err());
    }

    #[tokio::test]
    async fn overflowing_chunk_still_delivers_its_complete_search_frame() {
        let chunk = format!(
            "{}data: {{\"type\":\"{}",
            tool_frame("search", "initial"),
            "x".repeat(512)
        );
        let h = harness_with(
            Script::Frames(vec![chunk]),
            ClientConfig::default().max_buffer_bytes(256),
        );
        let mut stream = h.client.search("q").start_stream().await.expect("start");
        let mut updates = Vec::new();
        while let Some(update) = stream.next_update().await {
            updates.push(update);
        }

        let overflow = SearchError::BufferOverflow { limit: 256 };
        assert!(matches!(
            updates.as_slice(),
            [
                SessionUpdate::Event(_),
                SessionUpdate::SearchData(r),
                SessionUpdate::Failed(err),
            ] if r == &results("initial") && err == &overflow
        ));
        assert_eq!(stream.latest(), Some(&results("initial")));
        assert_eq!(stream.finish().await, Err(overflow));
    }

    #[tokio::test]
    async fn pull_stream_reports_phases() {
        let h = harness(Script::Frames(vec![
            tool_frame("search", "initial"),
            tool_frame("rerank", "final"),
        ]));
        let mut stream = h.client.search("q").start_stream().await.expect("start");
        assert_eq!(stream.phase(), SearchPhase::Loading);
        assert_eq!(stream.state(), SessionState::Streaming);

        let mut phases = Vec::new();
        while let Some(update) = stream.next_update().await {
            if matches!(
                update,
                SessionUpdate::SearchData(_) | SessionUpdate::RerankedData(_)
            ) {
                phases.push(stream.phase());
            }
        }
        assert_eq!(phases, vec![SearchPhase::Ranked, SearchPhase::Reranked]);
        assert_eq!(stream.state(), SessionState::Succeeded);
        assert_eq!(stream.finish().await, Ok(results("final")));
    }

    #[tokio::test]
    async fn request_uses_default_model_and_raw_query() {
        let h = harness(Script::Frames(vec![tool_frame("search", "x")]));
        h.client.search("  padded  ").collect().await.expect("search");
        let request = h.last_request.lock().expect("lock").clone().expect("request");
        assert_eq!(request.model.as_str(), DEFAULT_MODEL);
        assert_eq!(request.query(), "  padded  ");
    }

    #[tokio::test]
    async fn validation_rejects_blank_query_without_opening() {
        let h = harness(Script::Frames(vec![]));
        let mut recorder = Recorder::default();
        let err = h
            .client
            .search("   ")
            .run(&mut recorder)
            .await
            .expect_err("blank query");
        assert!(matches!(err, SearchError::Validation(msg) if msg.contains("query")));
        assert_eq!(h.opened.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.errors.len(), 1);
    }

    #[tokio::test]
    async fn channel_delivers_updates_and_final_result() {
        let h = harness(Script::Frames(vec![
            tool_frame("search", "initial"),
            tool_frame("rerank", "final"),
        ]));
        let mut channel = h
            .client
            .search("q")
            .stream_buffer_capacity(1)
            .start_channel()
            .expect("channel");

        let mut kinds = Vec::new();
        while let Some(update) = channel.next_update().await {
            let terminal = update.is_terminal();
            kinds.push(match update {
                SessionUpdate::Event(_) => "event",
                SessionUpdate::SearchData(_) => "search",
                SessionUpdate::RerankedData(_) => "rerank",
                SessionUpdate::BackendError(_) => "backend-error",
                SessionUpdate::Completed(_) => "completed",
                SessionUpdate::Failed(_) => "failed",
            });
            if terminal {
                break;
            }
        }
        assert_eq!(kinds, vec!["event", "search", "event", "rerank", "completed"]);
        assert_eq!(channel.finish().await, Ok(results("final")));
    }

    #[tokio::test]
    async fn abort_cancels_channel_search() {
        let h = harness(Script::FramesThenPending(vec![tool_frame("search", "initial")]));
        let mut channel = h.client.search("q").start_channel().expect("channel");
        let abort = channel.abort_handle();

        let mut saw_cancel = false;
        while let Some(update) = channel.next_update().await {
            match update {
                SessionUpdate::SearchData(_) => abort.abort(),
                SessionUpdate::Failed(SearchError::Cancelled) => {
                    saw_cancel = true;
                    break;
                }
                _ => {}
            }
        }
        assert!(saw_cancel);
        assert!(abort.is_aborted());
        assert_eq!(channel.finish().await, Err(SearchError::Cancelled));
    }
}
