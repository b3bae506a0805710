//! Transport seam for metadata documents.
//!
//! The fetch cache talks to the network through [`RemoteSource`] so tests
//! can substitute a scripted fake; [`HttpSource`] is the reqwest-backed
//! implementation used in production.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header;
use tracing::debug;

use crate::FetchError;

/// Conditional-request validators from a previous response. An expired
/// cache entry still supplies these for revalidation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// One upstream response, reduced to what the cache needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteResponse {
    /// 304: the cached body is still current.
    NotModified,
    /// 200: fresh body plus any validators the server handed back.
    Body {
        text: String,
        etag: Option<String>,
        last_modified: Option<String>,
    },
}

/// A source of metadata documents addressed by URL.
#[async_trait::async_trait]
pub trait RemoteSource: Send + Sync {
    /// Issue one conditional GET. Any non-200/304 status or transport
    /// problem is an error; the caller decides whether stale cache covers
    /// it. No retries happen at this layer.
    async fn get(&self, url: &str, validators: &Validators)
    -> Result<RemoteResponse, FetchError>;
}

/// HTTP implementation with a caller-supplied timeout.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl RemoteSource for HttpSource {
    async fn get(
        &self,
        url: &str,
        validators: &Validators,
    ) -> Result<RemoteResponse, FetchError> {
        let mut request = self.client.get(url);
        if let Some(etag) = &validators.etag {
            request = request.header(header::IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &validators.last_modified {
            request = request.header(header::IF_MODIFIED_SINCE, last_modified);
        }

        debug!(url, "metadata request");
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(RemoteResponse::NotModified);
        }
        if !response.status().is_success() {
            return Err(FetchError::Upstream(response.status().as_u16()));
        }

        let etag = header_string(&response, header::ETAG);
        let last_modified = header_string(&response, header::LAST_MODIFIED);
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(RemoteResponse::Body {
            text,
            etag,
            last_modified,
        })
    }
}

fn header_string(response: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
