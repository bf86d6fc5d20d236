//! HTTP backend abstraction.
//!
//! The backend only moves bytes: it sends one request and hands back the raw
//! status and body. Envelope decoding and error mapping live in
//! [`crate::envelope`] so they can be tested without a server.

use std::fmt;

use async_trait::async_trait;
use qce_core::{QceError, QceResult};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;

/// HTTP verbs used by the service API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        })
    }
}

/// Undecoded HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Trait for HTTP backends that can execute a single request.
///
/// Transport failures (refused connection, timeout) must be reported as
/// [`QceError::Network`]; any received response, whatever its status, is
/// returned as `Ok`.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn send(
        &self,
        method: Method,
        url: &Url,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> QceResult<RawResponse>;
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production HTTP backend using reqwest.
#[derive(Debug)]
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(config: &ClientConfig) -> QceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| QceError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn build_request(
        &self,
        method: Method,
        url: &Url,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> reqwest::RequestBuilder {
        let mut request = match method {
            Method::Get => self.client.get(url.as_str()),
            Method::Post => self.client.post(url.as_str()),
            Method::Put => self.client.put(url.as_str()),
            Method::Delete => self.client.delete(url.as_str()),
        };
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
    }
}

fn map_transport_error(e: &reqwest::Error, url: &Url) -> QceError {
    if e.is_connect() {
        let origin = url.origin().ascii_serialization();
        QceError::Network(format!("cannot connect to server at {origin}"))
    } else if e.is_timeout() {
        QceError::Network(format!("request timed out: {url}"))
    } else {
        QceError::Network(format!("request failed: {e}"))
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn send(
        &self,
        method: Method,
        url: &Url,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> QceResult<RawResponse> {
        debug!(%method, %url, "sending request");
        let response = self
            .build_request(method, url, token, body)
            .send()
            .await
            .map_err(|e| map_transport_error(&e, url))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_transport_error(&e, url))?;
        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Canned response for the fake backend.
    #[derive(Clone)]
    pub struct CannedResponse {
        pub status: u16,
        pub body: Vec<u8>,
    }

    impl CannedResponse {
        pub fn json(status: u16, json: &Value) -> Self {
            Self {
                status,
                body: serde_json::to_vec(json).unwrap(),
            }
        }

        pub fn raw(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.as_bytes().to_vec(),
            }
        }
    }

    /// A request observed by the fake backend.
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: Method,
        pub url: Url,
        pub token: Option<String>,
        pub body: Option<Value>,
    }

    /// A fake HTTP backend that returns canned responses.
    ///
    /// Patterns are matched against `"{METHOD} {path}"` in insertion order.
    #[derive(Default)]
    pub struct FakeBackend {
        responses: Vec<(String, CannedResponse)>,
        unreachable: bool,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a canned response for requests whose `"{METHOD} {path}"` contains `pattern`.
        pub fn with_response(mut self, pattern: &str, response: CannedResponse) -> Self {
            self.responses.push((pattern.to_string(), response));
            self
        }

        /// Fail every request as if the server were down.
        pub fn unreachable() -> Self {
            Self {
                unreachable: true,
                ..Self::default()
            }
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpBackend for FakeBackend {
        async fn send(
            &self,
            method: Method,
            url: &Url,
            token: Option<&str>,
            body: Option<&Value>,
        ) -> QceResult<RawResponse> {
            self.requests.lock().unwrap().push(RecordedRequest {
                method,
                url: url.clone(),
                token: token.map(str::to_string),
                body: body.cloned(),
            });

            if self.unreachable {
                return Err(QceError::Network(
                    "cannot connect to server at http://localhost:40653".to_string(),
                ));
            }

            let key = format!("{method} {}", url.path());
            let canned = self
                .responses
                .iter()
                .find(|(pattern, _)| key.contains(pattern.as_str()))
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| CannedResponse::raw(404, "Not Found"));

            Ok(RawResponse {
                status: canned.status,
                body: canned.body,
            })
        }
    }
}
