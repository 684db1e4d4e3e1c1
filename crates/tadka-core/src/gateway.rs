//! Request gateway: the only component allowed to talk to the API.
//!
//! Every call goes through [`Gateway::send`]: the path is checked to be a
//! relative API path on the configured origin, the stored credential (if any)
//! is attached as a bearer token, and failures are classified into
//! [`GatewayError`] kinds. There is no retry and the token store is never
//! modified here.

use crate::config::ClientConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::token_store::TokenStore;
use reqwest::{redirect, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_PLAIN_MESSAGE_LEN: usize = 200;

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Replaces the configured default timeout for this call.
    pub timeout: Option<Duration>,
    /// Query string pairs appended to the path.
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Default::default()
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Outbound API client with credential attachment and failure classification.
#[derive(Clone)]
pub struct Gateway {
    client: reqwest::Client,
    base_url: Url,
    store: Arc<dyn TokenStore>,
    default_timeout: Duration,
}

impl Gateway {
    /// Build from client config; `store` is read (never written) on every send.
    pub fn new(config: &ClientConfig, store: Arc<dyn TokenStore>) -> GatewayResult<Self> {
        Self::with_base_url(&config.api_base_url, store, config.request_timeout())
    }

    pub fn with_base_url(
        base_url: &str,
        store: Arc<dyn TokenStore>,
        default_timeout: Duration,
    ) -> GatewayResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::InvalidPath(format!("{}: {}", base_url, e)))?;
        // Redirects are surfaced, not followed, so the bearer never leaves the origin.
        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            store,
            default_timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Join a relative API path onto the base origin, rejecting anything that
    /// could point elsewhere (absolute URLs, scheme-relative `//host`, backslashes).
    pub fn resolve_path(&self, path: &str) -> GatewayResult<Url> {
        let invalid = || GatewayError::InvalidPath(path.to_string());
        if !is_local_path(path) {
            return Err(invalid());
        }
        let url = self.base_url.join(path).map_err(|_| invalid())?;
        if url.origin() != self.base_url.origin() {
            return Err(invalid());
        }
        Ok(url)
    }

    /// Send one request and decode a 2xx body into `T`.
    ///
    /// An empty 2xx body decodes as JSON `null`, so `()` and `Option<_>` work
    /// for 204 responses.
    pub async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> GatewayResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut url = self.resolve_path(path)?;
        if !options.query.is_empty() {
            url.query_pairs_mut().extend_pairs(options.query.iter());
        }
        let timeout = options.timeout.unwrap_or(self.default_timeout);

        let mut request = self
            .client
            .request(method.clone(), url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(timeout);
        // One read per request; later store changes do not affect this call.
        let authenticated = match self.store.get() {
            Some(credential) => {
                request = request.bearer_auth(credential.as_str());
                true
            }
            None => false,
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%method, path, authenticated, "Dispatching API request");

        let res = request.send().await.map_err(|e| network_error(e, timeout))?;
        let status = res.status();
        let bytes = res.bytes().await.map_err(|e| network_error(e, timeout))?;

        if status.is_success() {
            return decode_body(&bytes);
        }

        let err = classify_failure(status, &bytes);
        match &err {
            GatewayError::ServerError { .. } => warn!(%method, path, %status, "API server error"),
            _ => debug!(%method, path, %status, "API request rejected"),
        }
        Err(err)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        self.send::<(), T>(Method::GET, path, None, RequestOptions::default())
            .await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> GatewayResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, Some(body), RequestOptions::default())
            .await
    }
}

/// A same-origin absolute path: one leading `/`, no authority, no
/// backslashes (browsers read `/\host` as `//host`), no whitespace or
/// control characters.
pub(crate) fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(|c| c.is_control() || c.is_whitespace())
}

fn network_error(err: reqwest::Error, timeout: Duration) -> GatewayError {
    if err.is_timeout() {
        GatewayError::NetworkError(format!("timed out after {:?}", timeout))
    } else {
        GatewayError::NetworkError(err.to_string())
    }
}

fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> GatewayResult<T> {
    let raw: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        bytes
    };
    serde_json::from_slice(raw).map_err(|e| GatewayError::MalformedResponse(e.to_string()))
}

/// Map a non-2xx status plus body to an error kind.
pub(crate) fn classify_failure(status: StatusCode, body: &[u8]) -> GatewayError {
    let message = extract_message(body);
    let code = status.as_u16();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized {
            status: code,
            message,
        },
        s if s.is_server_error() => GatewayError::ServerError {
            status: code,
            message,
        },
        // Remaining 4xx plus unfollowed 3xx.
        _ => GatewayError::ClientError {
            status: code,
            message,
        },
    }
}

/// Pull a human-readable message out of an error body.
pub(crate) fn extract_message(body: &[u8]) -> Option<String> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => message_from_value(&value),
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            let text = text.trim();
            let looks_like_markup = text.starts_with('<');
            (!text.is_empty() && !looks_like_markup && text.len() <= MAX_PLAIN_MESSAGE_LEN)
                .then(|| text.to_string())
        }
    }
}

fn message_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(message_from_value),
        Value::Object(map) => {
            if let Some(m) = map.get("detail").and_then(message_from_value) {
                return Some(m);
            }
            // Wrapped form: {"status_code": .., "error": {"message": .., "details": ..}}
            if let Some(error) = map.get("error").and_then(Value::as_object) {
                if let Some(m) = error.get("details").and_then(message_from_value) {
                    return Some(m);
                }
                if let Some(m) = error.get("message").and_then(message_from_value) {
                    return Some(m);
                }
            }
            if let Some(m) = map.get("message").and_then(message_from_value) {
                return Some(m);
            }
            if let Some(m) = map.get("non_field_errors").and_then(message_from_value) {
                return Some(m);
            }
            // Field errors, e.g. {"email": ["Enter a valid email address."]}
            map.values()
                .filter(|v| v.is_array())
                .find_map(message_from_value)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_store::MemoryTokenStore;

    fn gateway() -> Gateway {
        Gateway::with_base_url(
            "http://127.0.0.1:8000",
            Arc::new(MemoryTokenStore::new()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn relative_paths_resolve_on_base_origin() {
        let url = gateway().resolve_path("/api/recipes/").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/recipes/");
    }

    #[test]
    fn external_urls_are_rejected() {
        let gw = gateway();
        for path in [
            "https://evil.example/api/",
            "//evil.example/api/",
            "api/recipes/",
            "/\\evil.example",
            "/api/ recipes",
            "",
        ] {
            assert!(
                matches!(gw.resolve_path(path), Err(GatewayError::InvalidPath(_))),
                "{path:?} should be rejected"
            );
        }
    }

    #[test]
    fn status_classification() {
        assert!(classify_failure(StatusCode::UNAUTHORIZED, b"").is_unauthorized());
        assert!(classify_failure(StatusCode::FORBIDDEN, b"").is_unauthorized());
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, b""),
            GatewayError::ClientError { status: 404, .. }
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_GATEWAY, b""),
            GatewayError::ServerError { status: 502, .. }
        ));
    }

    #[test]
    fn extracts_detail_and_field_errors() {
        assert_eq!(
            extract_message(br#"{"detail": "Not found."}"#).as_deref(),
            Some("Not found.")
        );
        assert_eq!(
            extract_message(br#"{"email": ["Enter a valid email address."]}"#).as_deref(),
            Some("Enter a valid email address.")
        );
        assert_eq!(
            extract_message(br#"{"non_field_errors": ["The two password fields didn't match."]}"#)
                .as_deref(),
            Some("The two password fields didn't match.")
        );
        assert_eq!(
            extract_message(br#""Registration closed""#).as_deref(),
            Some("Registration closed")
        );
    }

    #[test]
    fn extracts_wrapped_error_body() {
        let body = br#"{"status_code": 400, "error": {"message": "Invalid input provided.", "details": {"password1": ["This password is too short."]}}}"#;
        assert_eq!(
            extract_message(body).as_deref(),
            Some("This password is too short.")
        );
        let body = br#"{"status_code": 500, "error": {"message": "A server error occurred.", "details": {}}}"#;
        assert_eq!(extract_message(body).as_deref(), Some("A server error occurred."));
    }

    #[test]
    fn html_error_pages_are_not_messages() {
        assert_eq!(extract_message(b"<html><body>Server Error</body></html>"), None);
        assert_eq!(extract_message(b""), None);
        assert_eq!(extract_message(b"Bad gateway").as_deref(), Some("Bad gateway"));
    }

    #[test]
    fn empty_body_decodes_as_null() {
        decode_body::<()>(b"").unwrap();
        let none: Option<Value> = decode_body(b"  ").unwrap();
        assert!(none.is_none());
        assert!(matches!(
            decode_body::<Vec<u32>>(b"{\"oops\": true}"),
            Err(GatewayError::MalformedResponse(_))
        ));
    }
}
