use std::time::Duration;

use dataset_search_client::{
    ClientConfig, ResultSet, SearchClient, SearchError, SearchHandler, StreamEvent,
};
use dataset_search_client::transport::MAX_ERROR_BODY_BYTES;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn results(summary: &str) -> ResultSet {
    serde_json::from_value(serde_json::json!({
        "hits": [{
            "_id": format!("{summary}-1"),
            "_score": 4.2,
            "_source": {"titles": [{"title": "Arctic sea ice extent"}], "descriptions": []}
        }],
        "summary": summary
    }))
    .expect("results")
}

fn sse_body() -> String {
    let mut body = String::from(": connected\n\n");
    body.push_str("event: RUN_STARTED\ndata: {\"type\":\"RUN_STARTED\"}\n\n");
    for (id, summary) in [("search", "initial"), ("rerank", "reranked")] {
        let event = StreamEvent::tool_call_result(id, &results(summary)).expect("event");
        body.push_str(&event.to_frame().expect("frame"));
    }
    body.push_str("data: {\"type\":\"RUN_FINISHED\"}\n\n");
    body
}

fn client_for(server: &MockServer) -> SearchClient {
    SearchClient::builder()
        .config(ClientConfig::new(server.uri()).api_key("test-key"))
        .build()
        .expect("client")
}

#[derive(Default)]
struct Counts {
    search: usize,
    rerank: usize,
    errors: Vec<String>,
}

impl SearchHandler for Counts {
    fn on_search_data(&mut self, _results: &ResultSet) {
        self.search += 1;
    }

    fn on_reranked_data(&mut self, _results: &ResultSet) {
        self.rerank += 1;
    }

    fn on_error(&mut self, error: &SearchError) {
        self.errors.push(error.to_string());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn streams_search_and_rerank_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .and(header("accept", "text/event-stream"))
        .and(header("x-accel-buffering", "no"))
        .and(header("authorization", "test-key"))
        .and(body_json(serde_json::json!({
            "messages": [{"role": "user", "content": "arctic sea ice"}],
            "model": "einfracz/gpt-oss-120b"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body(), "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let mut counts = Counts::default();
    let result = client_for(&server)
        .search("arctic sea ice")
        .run(&mut counts)
        .await
        .expect("search");

    assert_eq!(result, results("reranked"));
    assert_eq!((counts.search, counts.rerank), (1, 1));
    assert!(counts.errors.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn non_success_status_is_a_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let mut counts = Counts::default();
    let err = client_for(&server)
        .search("q")
        .run(&mut counts)
        .await
        .expect_err("status error");

    assert_eq!(
        err,
        SearchError::Status {
            status: 502,
            body: "bad gateway".into()
        }
    );
    assert_eq!(counts.errors, vec!["HTTP error! status: 502".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_error_body_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("e".repeat(64 * 1024)))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search("q")
        .collect()
        .await
        .expect_err("status error");

    match err {
        SearchError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body.len(), MAX_ERROR_BODY_BYTES);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_backend_hits_the_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(), "text/event-stream")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search("q")
        .timeout(Duration::from_millis(200))
        .collect()
        .await
        .expect_err("timeout");

    assert_eq!(
        err.to_string(),
        "Request timeout after 0.2 seconds. Please try again."
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn run_error_event_over_http_rejects_with_backend_message() {
    let server = MockServer::start().await;
    let body = format!(
        "{}{}",
        StreamEvent::tool_call_result("search", &results("initial"))
            .and_then(|e| e.to_frame())
            .expect("frame"),
        StreamEvent::run_error(Some("LLM quota exhausted"))
            .to_frame()
            .expect("frame"),
    );
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut counts = Counts::default();
    let err = client_for(&server)
        .search("q")
        .run(&mut counts)
        .await
        .expect_err("run error");

    assert_eq!(err.to_string(), "LLM quota exhausted");
    assert_eq!(counts.search, 1);
    assert_eq!(counts.errors.len(), 1);
}
