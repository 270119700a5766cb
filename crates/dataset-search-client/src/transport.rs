use futures::StreamExt as _;
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL};
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::SearchError;
use crate::model::ModelId;
use crate::reader::ByteStream;

/// Bytes of a non-2xx response body kept in [`SearchError::Status`].
pub const MAX_ERROR_BODY_BYTES: usize = 4096;

/// Author of a chat message sent to the search backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// JSON body of a search request.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SearchRequest {
    pub messages: Vec<ChatMessage>,
    pub model: ModelId,
}

impl SearchRequest {
    /// Wraps a query as the single user message.
    pub fn new(query: impl Into<String>, model: ModelId) -> Self {
        Self {
            messages: vec![ChatMessage {
                role: Role::User,
                content: query.into(),
            }],
            model,
        }
    }

    pub fn query(&self) -> &str {
        self.messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// Opens the streaming response for a search request.
///
/// Implementations must fail before returning if the backend rejects the
/// request; the returned stream only carries body chunks.
#[async_trait::async_trait]
pub trait SearchTransport: Send + Sync {
    async fn open(&self, request: &SearchRequest) -> Result<ByteStream, SearchError>;
}

/// HTTP transport posting to the search endpoint with reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| SearchError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl SearchTransport for HttpTransport {
    async fn open(&self, request: &SearchRequest) -> Result<ByteStream, SearchError> {
        let url = self.config.search_url();
        debug!(%url, model = %request.model, "opening search stream");

        let mut http_req = self
            .client
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .header("X-Accel-Buffering", "no")
            .json(request);
        if let Some(api_key) = self.config.api_key.as_deref() {
            http_req = http_req.header(AUTHORIZATION, api_key);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| SearchError::transport(format!("search request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: read_error_body(response).await,
            });
        }

        Ok(Box::pin(response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| SearchError::transport(format!("search stream read failed: {e}")))
        })))
    }
}

/// Reads at most [`MAX_ERROR_BODY_BYTES`] of an error response.
async fn read_error_body(response: reqwest::Response) -> String {
    let mut body = Vec::new();
    let mut chunks = response.bytes_stream();
    while let Some(Ok(chunk)) = chunks.next().await {
        let room = MAX_ERROR_BODY_BYTES - body.len();
        body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if body.len() == MAX_ERROR_BODY_BYTES {
            break;
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
