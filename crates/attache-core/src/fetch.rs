//! HTTP fetching for URL-backed attachments.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Instant;
use tracing::{debug, warn};

use crate::defaults::FetchConfig;
use crate::error::{Error, Result};
use crate::logging;

/// Remote content access used by [`crate::Attachment`] for URL sources.
///
/// Each call is a single attempt with no retries; implementations own and
/// release any response before returning.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Issue a HEAD request and return the `Content-Type` header, or an
    /// empty string if the header is absent.
    async fn head_content_type(&self, url: &str) -> Result<String>;

    /// Issue a GET request and return the full response body.
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

static SHARED: Lazy<HttpFetcher> = Lazy::new(|| {
    HttpFetcher::new(FetchConfig::from_env()).unwrap_or_else(|e| {
        warn!(
            subsystem = logging::SUBSYSTEM,
            component = logging::COMPONENT_FETCH,
            error = %e,
            "Falling back to default HTTP client"
        );
        HttpFetcher {
            client: Client::new(),
            config: FetchConfig::default(),
        }
    })
});

/// [`Fetch`] implementation backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout());

        if let Some(ref agent) = config.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(FetchConfig::from_env())
    }

    /// Process-wide fetcher configured from the environment on first use.
    pub fn shared() -> &'static HttpFetcher {
        &SHARED
    }

    /// Get the current configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn head_content_type(&self, url: &str) -> Result<String> {
        let start = Instant::now();
        let response = self.client.head(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!(
                subsystem = logging::SUBSYSTEM,
                component = logging::COMPONENT_FETCH,
                op = logging::OP_HEAD,
                url,
                status = status.as_u16(),
                "Non-success status"
            );
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            // Header values may carry obs-text (e.g. Latin-1 parameters).
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();

        debug!(
            subsystem = logging::SUBSYSTEM,
            component = logging::COMPONENT_FETCH,
            op = logging::OP_HEAD,
            url,
            status = status.as_u16(),
            mime_type = %content_type,
            duration_ms = start.elapsed().as_millis() as u64,
            "HEAD complete"
        );
        Ok(content_type)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!(
                subsystem = logging::SUBSYSTEM,
                component = logging::COMPONENT_FETCH,
                op = logging::OP_GET,
                url,
                status = status.as_u16(),
                "Non-success status"
            );
        }

        let body = response.bytes().await?;

        debug!(
            subsystem = logging::SUBSYSTEM,
            component = logging::COMPONENT_FETCH,
            op = logging::OP_GET,
            url,
            status = status.as_u16(),
            byte_len = body.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "GET complete"
        );
        Ok(body.to_vec())
    }
}
