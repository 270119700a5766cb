use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::errors::SearchError;
use crate::model::ModelId;
use crate::results::ResultSet;
use crate::run::SearchBuilder;
use crate::transport::{HttpTransport, SearchTransport};
use crate::update::SearchHandler;

pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    pub(crate) transport: Arc<dyn SearchTransport>,
}

/// Entry point for running dataset searches.
#[derive(Clone)]
pub struct SearchClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl SearchClient {
    /// Starts a builder for configuring a `SearchClient`.
    pub fn builder() -> SearchClientBuilder {
        SearchClientBuilder::default()
    }

    /// Creates a client using the HTTP transport and `DATASET_SEARCH_*` settings.
    pub fn from_env() -> Result<Self, SearchError> {
        Self::builder().config(ClientConfig::from_env()?).build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Starts building a search for `query`.
    pub fn search(&self, query: impl Into<String>) -> SearchBuilder {
        SearchBuilder::new(self.inner.clone(), query.into())
    }

    /// Runs one search to completion, invoking `handler` as updates arrive.
    ///
    /// `timeout` falls back to the configured default when `None`.
    pub async fn run_search<H: SearchHandler + ?Sized>(
        &self,
        query: impl Into<String>,
        model: impl Into<ModelId>,
        handler: &mut H,
        timeout: Option<Duration>,
    ) -> Result<ResultSet, SearchError> {
        let mut builder = self.search(query).model(model);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder.run(handler).await
    }
}

/// Builder used to pick configuration and transport before creating a `SearchClient`.
#[derive(Default)]
pub struct SearchClientBuilder {
    config: Option<ClientConfig>,
    transport: Option<Arc<dyn SearchTransport>>,
}

impl SearchClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replaces the HTTP transport (scripted transports in tests, proxies, ...).
    pub fn transport(mut self, transport: Arc<dyn SearchTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validates the configuration and builds the client.
    pub fn build(self) -> Result<SearchClient, SearchError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(config.clone())?),
        };
        Ok(SearchClient {
            inner: Arc::new(ClientInner { config, transport }),
        })
    }
}
