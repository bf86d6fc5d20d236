//! Service client.
//!
//! [`QceClient`] is generic over the HTTP backend so tests can inject canned
//! responses. Production code uses [`DefaultQceClient`].

mod contacts;
mod messages;
mod system;
mod tasks;

pub use messages::MessagePage;

use std::sync::{PoisonError, RwLock};

use qce_core::{QceError, QceResult, TokenResolver};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::config::{ClientConfig, DEFAULT_HOST};
use crate::envelope::decode_response;
use crate::http::{HttpBackend, Method, ReqwestBackend};

/// Client using the reqwest HTTP backend.
pub type DefaultQceClient = QceClient<ReqwestBackend>;

/// Authenticated client for the export service's REST API.
#[derive(Debug)]
pub struct QceClient<B: HttpBackend> {
    backend: B,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl DefaultQceClient {
    /// Create a client from explicit configuration.
    pub fn new(config: &ClientConfig) -> QceResult<Self> {
        let backend = ReqwestBackend::new(config)?;
        Self::with_backend(config, backend)
    }

    /// Create a client whose host and token are resolved from local state.
    ///
    /// Host: `host`, then the config file's `serverHost`, then `localhost`.
    /// Token: see [`TokenResolver::resolve`].
    pub fn connect_auto(
        resolver: &TokenResolver,
        host: Option<&str>,
        port: u16,
        token: Option<&str>,
    ) -> QceResult<Self> {
        let config = auto_config(resolver, host, port, token)?;
        Self::new(&config)
    }
}

fn auto_config(
    resolver: &TokenResolver,
    host: Option<&str>,
    port: u16,
    token: Option<&str>,
) -> QceResult<ClientConfig> {
    let token = resolver.resolve(token)?;
    let host = host
        .map(str::to_string)
        .or_else(|| resolver.server_host())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    Ok(ClientConfig::new()
        .with_host(host)
        .with_port(port)
        .with_token(token))
}

impl<B: HttpBackend> QceClient<B> {
    /// Create a client over a custom backend.
    pub fn with_backend(config: &ClientConfig, backend: B) -> QceResult<Self> {
        let base_url = Url::parse(&config.base_url()).map_err(|e| QceError::Validation {
            message: format!("invalid server address '{}': {e}", config.base_url()),
            code: "INVALID_URL".to_string(),
        })?;
        Ok(Self {
            backend,
            base_url,
            token: RwLock::new(config.token.clone()),
        })
    }

    /// `http://host:port` without a trailing slash.
    pub fn base_url(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }

    /// The credential currently attached to requests.
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Issue a request and unwrap the response envelope.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> QceResult<Value> {
        let mut url = self.base_url.join(path).map_err(|e| QceError::Validation {
            message: format!("invalid request path '{path}': {e}"),
            code: "INVALID_URL".to_string(),
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        self.send(method, &url, body).await
    }

    /// URL built from individually percent-encoded path segments.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // http URLs always have a base, so this cannot fail
        if let Ok(mut path) = url.path_segments_mut() {
            path.clear().extend(segments);
        }
        url
    }

    pub(crate) async fn send(
        &self,
        method: Method,
        url: &Url,
        body: Option<&Value>,
    ) -> QceResult<Value> {
        let token = self.token();
        let raw = self.backend.send(method, url, token.as_deref(), body).await?;
        debug!(%method, path = url.path(), status = raw.status, "response received");
        decode_response(raw.status, &raw.body)
    }

    pub(crate) async fn get_as<T: DeserializeOwned>(&self, url: &Url) -> QceResult<T> {
        let data = self.send(Method::Get, url, None).await?;
        decode_as(data)
    }

    /// Validate `token` with the server and adopt it on success.
    ///
    /// Any failure, including an unreachable server, returns `false` and
    /// leaves the current credential in place.
    pub async fn authenticate(&self, token: &str) -> bool {
        let url = self.endpoint(&["auth"]);
        let body = json!({ "token": token });
        let current = self.token();
        let raw = match self
            .backend
            .send(Method::Post, &url, current.as_deref(), Some(&body))
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                debug!(error = %e, "authentication request failed");
                return false;
            }
        };

        let Ok(parsed) = serde_json::from_slice::<Value>(&raw.body) else {
            return false;
        };
        let success = parsed.get("success").and_then(Value::as_bool) == Some(true);
        let authenticated = parsed
            .pointer("/data/authenticated")
            .and_then(Value::as_bool)
            == Some(true);
        if success && authenticated {
            *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
            return true;
        }
        false
    }

    /// Whether the health endpoint answers successfully.
    pub async fn is_connected(&self) -> bool {
        self.health_check().await.is_ok()
    }
}

/// Deserialize an unwrapped payload into a typed value.
pub(crate) fn decode_as<T: DeserializeOwned>(data: Value) -> QceResult<T> {
    serde_json::from_value(data).map_err(|e| QceError::Api {
        message: format!("unexpected response shape: {e}"),
        code: "INVALID_RESPONSE".to_string(),
        status: None,
        details: Value::Null,
    })
}

/// Deserialize `data[key]` as a list, treating a missing key as empty.
pub(crate) fn decode_list<T: DeserializeOwned>(mut data: Value, key: &str) -> QceResult<Vec<T>> {
    match data.get_mut(key).map(Value::take) {
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(list) => decode_as(list),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::http::testing::{CannedResponse, FakeBackend};
    use qce_core::test_utils::{ENV_LOCK, EnvVarGuard};

    pub fn client_with(backend: FakeBackend) -> QceClient<FakeBackend> {
        let config = ClientConfig::new().with_token("initial-token");
        QceClient::with_backend(&config, backend).unwrap()
    }

    #[tokio::test]
    async fn test_request_sends_bearer_and_query() {
        let backend = FakeBackend::new().with_response(
            "GET /api/groups",
            CannedResponse::json(200, &json!({"success": true, "data": {"groups": []}})),
        );
        let client = client_with(backend);

        let data = client
            .request(
                Method::Get,
                "/api/groups",
                &[("page", "1".to_string()), ("forceRefresh", "false".to_string())],
                None,
            )
            .await
            .unwrap();
        assert_eq!(data, json!({"groups": []}));

        let requests = client.backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].token.as_deref(), Some("initial-token"));
        assert_eq!(requests[0].url.query(), Some("page=1&forceRefresh=false"));
    }

    #[tokio::test]
    async fn test_network_failure_is_network_error() {
        let client = client_with(FakeBackend::unreachable());
        let err = client
            .request(Method::Get, "/health", &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, QceError::Network(_)));
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_authenticate_replaces_token_on_success() {
        let backend = FakeBackend::new().with_response(
            "POST /auth",
            CannedResponse::json(
                200,
                &json!({"success": true, "data": {"authenticated": true}}),
            ),
        );
        let client = client_with(backend);

        assert!(client.authenticate("fresh-token").await);
        assert_eq!(client.token().as_deref(), Some("fresh-token"));
        let body = client.backend.requests()[0].body.clone().unwrap();
        assert_eq!(body, json!({"token": "fresh-token"}));
    }

    #[tokio::test]
    async fn test_authenticate_rejection_keeps_token() {
        let backend = FakeBackend::new().with_response(
            "POST /auth",
            CannedResponse::json(
                200,
                &json!({"success": true, "data": {"authenticated": false}}),
            ),
        );
        let client = client_with(backend);

        assert!(!client.authenticate("wrong").await);
        assert_eq!(client.token().as_deref(), Some("initial-token"));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = client_with(FakeBackend::new());
        let url = client.endpoint(&["api", "exports", "files", "group chat#1.html"]);
        assert_eq!(url.path(), "/api/exports/files/group%20chat%231.html");
    }

    #[test]
    fn test_auto_config_prefers_explicit_host_then_config() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = EnvVarGuard::remove("QCE_TEST_AUTO_TOKEN");
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("security.json");
        std::fs::write(
            &path,
            r#"{"accessToken": "file-token", "serverHost": "10.0.0.5"}"#,
        )
        .unwrap();
        let resolver = TokenResolver::new()
            .with_env_var("QCE_TEST_AUTO_TOKEN")
            .with_config_path(&path);

        let config = auto_config(&resolver, None, 40653, None).unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.token.as_deref(), Some("file-token"));

        let config = auto_config(&resolver, Some("127.0.0.1"), 9000, Some("cli")).unwrap();
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
        assert_eq!(config.token.as_deref(), Some("cli"));
    }
}
