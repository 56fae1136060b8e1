//! HTTP transport to the remote end.
//!
//! The bridge talks to the driver through the [`HttpClient`] trait so that
//! tests can substitute a scripted transport. [`ReqwestClient`] is the
//! production implementation.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::trace;
use url::Url;

use crate::error::Result;
use crate::protocol::Verb;

// ============================================================================
// Constants
// ============================================================================

/// Per-request timeout. Generous because `newSession` can block while the
/// browser cold-starts.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ============================================================================
// HttpResponse
// ============================================================================

/// A raw transport-level response, before envelope decoding.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,

    /// Decoded JSON body, `None` when empty or not JSON.
    pub body: Option<Value>,
}

// ============================================================================
// HttpClient
// ============================================================================

/// Pluggable HTTP transport.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issues one request and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the request cannot be delivered.
    /// Protocol-level failures are returned as a normal [`HttpResponse`]
    /// and mapped by the envelope decoder.
    async fn call(&self, verb: Verb, url: Url, body: Option<&Value>) -> Result<HttpResponse>;
}

// ============================================================================
// ReqwestClient
// ============================================================================

/// Production transport backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Creates the transport with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Http`] if the underlying client cannot be
    /// constructed.
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn call(&self, verb: Verb, url: Url, body: Option<&Value>) -> Result<HttpResponse> {
        trace!(verb = verb.as_str(), %url, "wire request");

        let mut request = match verb {
            Verb::Get => self.client.get(url),
            Verb::Post => self.client.post(url),
            Verb::Delete => self.client.delete(url),
        };
        if let Some(body) = body {
            request = request.json(body);
        } else if verb == Verb::Post {
            // Some drivers reject POST without a body.
            request = request.json(&Value::Object(serde_json::Map::new()));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.is_empty() {
            None
        } else {
            serde_json::from_str(&text).ok()
        };

        trace!(status, "wire response");
        Ok(HttpResponse { status, body })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_constructs() {
        assert!(ReqwestClient::new().is_ok());
    }
}
