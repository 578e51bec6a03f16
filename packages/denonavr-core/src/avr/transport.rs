//! HTTP transport abstraction.
//!
//! [`AvrClient`](super::AvrClient) depends on the [`AvrTransport`] trait
//! rather than on `reqwest` directly, so the polling and reconciliation
//! logic can be exercised against scripted responses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::error::AvrResult;
use crate::protocol_constants::CONTENT_TYPE_XML;

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

/// Raw HTTP operations used by the client.
#[async_trait]
pub trait AvrTransport: Send + Sync {
    /// POSTs an XML body and returns the status and response text.
    ///
    /// # Arguments
    /// * `url` - Absolute request URL
    /// * `body` - XML request body, sent as `application/xml`
    async fn post_xml(&self, url: &str, body: &str) -> AvrResult<HttpReply>;

    /// Performs a GET and returns the status code. The body is discarded.
    ///
    /// # Arguments
    /// * `url` - Absolute request URL
    async fn get(&self, url: &str) -> AvrResult<u16>;
}

/// [`AvrTransport`] backed by a shared `reqwest` client.
///
/// The client is cheap to clone and pools connections, so one instance can
/// serve every receiver in the process.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> AvrResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client. The caller is responsible for its timeouts.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AvrTransport for ReqwestTransport {
    async fn post_xml(&self, url: &str, body: &str) -> AvrResult<HttpReply> {
        let start = std::time::Instant::now();
        let res = self
            .client
            .post(url)
            .header(CONTENT_TYPE, CONTENT_TYPE_XML)
            .body(body.to_string())
            .send()
            .await;

        log::debug!(
            "[Avr] POST {} completed in {:?}: {:?}",
            url,
            start.elapsed(),
            res.as_ref().map(|r| r.status())
        );

        let res = res?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        Ok(HttpReply { status, body })
    }

    async fn get(&self, url: &str) -> AvrResult<u16> {
        let start = std::time::Instant::now();
        let res = self.client.get(url).send().await;

        log::debug!(
            "[Avr] GET {} completed in {:?}: {:?}",
            url,
            start.elapsed(),
            res.as_ref().map(|r| r.status())
        );

        Ok(res?.status().as_u16())
    }
}
