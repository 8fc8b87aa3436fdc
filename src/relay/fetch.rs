//! HTTP access to the relay source.
//!
//! The pipeline only sees the [`SourceFetcher`] trait; [`ReqwestFetcher`] is
//! the production implementation.

use crate::config::SOURCE_CONNECT_TIMEOUT_SECS;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Lazy, finite, non-restartable sequence of body chunks
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// Errors raised while talking to the source host
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// Connection, TLS or mid-stream transport failure
    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Status line and headers of a HEAD response
#[derive(Debug, Clone)]
pub struct SourceHead {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
}

/// Streaming GET response
pub struct SourceResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Body chunks, `None` when the response carries no body
    pub body: Option<ByteStream>,
}

impl std::fmt::Debug for SourceResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// HTTP fetch collaborator used by the relay pipeline
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Issues a HEAD request.
    async fn head(&self, url: &str) -> Result<SourceHead, FetchError>;

    /// Issues a GET request whose body is consumed lazily.
    async fn get(&self, url: &str) -> Result<SourceResponse, FetchError>;
}

/// [`SourceFetcher`] backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Builds a fetcher with the default connect timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(SOURCE_CONNECT_TIMEOUT_SECS))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn parse_url(url: &str) -> Result<Url, FetchError> {
    Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))
}

#[async_trait]
impl SourceFetcher for ReqwestFetcher {
    async fn head(&self, url: &str) -> Result<SourceHead, FetchError> {
        let response = self.client.head(parse_url(url)?).send().await?;
        debug!(url = %url, status = %response.status(), "HEAD response");
        Ok(SourceHead {
            status: response.status(),
            headers: response.headers().clone(),
        })
    }

    async fn get(&self, url: &str) -> Result<SourceResponse, FetchError> {
        let response = self.client.get(parse_url(url)?).send().await?;
        debug!(url = %url, status = %response.status(), "GET response");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map_err(FetchError::from).boxed();
        Ok(SourceResponse {
            status,
            headers,
            body: Some(body),
        })
    }
}
