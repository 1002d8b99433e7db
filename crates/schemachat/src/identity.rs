//! Caller identity.
//!
//! Every data route resolves the caller through an [`IdentityProvider`]
//! before touching the store. No identity means 401, never an anonymous
//! read.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap, StatusCode};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::ApiError;
use crate::shared_state::AppState;

/// The signed-in user. `email` is the owner key for projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub email: String,
    #[serde(default, alias = "first_name", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, alias = "last_name", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, alias = "preferred_email", skip_serializing_if = "Option::is_none")]
    pub preferred_email: Option<String>,
}

impl Identity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            first_name: None,
            last_name: None,
            picture: None,
            preferred_email: None,
        }
    }

    pub fn owner_key(&self) -> &str {
        &self.email
    }
}

/// Credential headers forwarded to the identity service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub authorization: Option<String>,
    pub cookie: Option<String>,
}

impl Credentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
                .filter(|value| !value.trim().is_empty())
        };
        Self {
            authorization: read(header::AUTHORIZATION),
            cookie: read(header::COOKIE),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.authorization.is_none() && self.cookie.is_none()
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.authorization
            .as_deref()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// `Ok(None)` means "not signed in"; `Err` means the provider could not
/// be asked at all.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, credentials: &Credentials) -> anyhow::Result<Option<Identity>>;
}

/// Asks `GET {base}/session` of an external session service.
pub struct HttpIdentityProvider {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build identity HTTP client: {}", e))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        info!("Identity provider: {}", config.auth_base_url);
        Self::new(
            &config.auth_base_url,
            Duration::from_secs(config.auth_timeout_seconds),
        )
    }

    fn session_url(&self) -> String {
        format!("{}/session", self.base_url)
    }
}

/// Accepts either a bare user object or `{"user": {...}}`.
fn identity_from_session(body: Value) -> Option<Identity> {
    let user = match body {
        Value::Object(mut map) if matches!(map.get("user"), Some(Value::Object(_))) => {
            map.remove("user")?
        }
        other @ Value::Object(_) => other,
        _ => return None,
    };
    serde_json::from_value::<Identity>(user)
        .ok()
        .filter(|identity| !identity.email.trim().is_empty())
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve(&self, credentials: &Credentials) -> anyhow::Result<Option<Identity>> {
        if credentials.is_empty() {
            return Ok(None);
        }

        let mut request = self.http_client.get(self.session_url());
        if let Some(authorization) = &credentials.authorization {
            request = request.header(header::AUTHORIZATION, authorization);
        }
        if let Some(cookie) = &credentials.cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Identity service request failed: {}", e))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NO_CONTENT => {
                debug!("Identity service reported no session ({})", response.status());
                return Ok(None);
            }
            status if !status.is_success() => {
                return Err(anyhow::anyhow!("Identity service returned {}", status));
            }
            _ => {}
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse identity response: {}", e))?;
        let identity = identity_from_session(body);
        if identity.is_none() {
            debug!("Identity service returned a session without an email");
        }
        Ok(identity)
    }
}

/// Bearer-token lookup table for local development and tests.
#[derive(Default)]
pub struct StaticIdentityProvider {
    tokens: DashMap<String, Identity>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn resolve(&self, credentials: &Credentials) -> anyhow::Result<Option<Identity>> {
        Ok(credentials
            .bearer_token()
            .and_then(|token| self.tokens.get(token).map(|entry| entry.value().clone())))
    }
}

/// Extractor for the signed-in caller; rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let credentials = Credentials::from_headers(&parts.headers);
        match state.identity.resolve(&credentials).await {
            Ok(Some(identity)) => Ok(CurrentUser(identity)),
            Ok(None) => Err(ApiError::Unauthorized),
            Err(e) => Err(ApiError::Upstream(format!("identity lookup failed: {:#}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use mockito::Matcher;
    use serde_json::json;

    fn provider_for(url: &str) -> HttpIdentityProvider {
        HttpIdentityProvider::new(url, Duration::from_secs(5)).unwrap()
    }

    fn cookie_credentials() -> Credentials {
        Credentials {
            authorization: None,
            cookie: Some("session=abc".into()),
        }
    }

    #[test]
    fn test_credentials_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-1"));
        headers.insert(header::COOKIE, HeaderValue::from_static("   "));
        let credentials = Credentials::from_headers(&headers);
        assert_eq!(credentials.bearer_token(), Some("tok-1"));
        assert_eq!(credentials.cookie, None);
        assert!(Credentials::default().is_empty());
    }

    #[test]
    fn test_identity_wire_shape() {
        let identity: Identity = serde_json::from_value(json!({
            "email": "ada@example.com",
            "first_name": "Ada",
            "preferred_email": "ada@work.example.com"
        }))
        .unwrap();
        assert_eq!(identity.first_name.as_deref(), Some("Ada"));
        assert_eq!(
            serde_json::to_value(&identity).unwrap(),
            json!({
                "email": "ada@example.com",
                "firstName": "Ada",
                "preferredEmail": "ada@work.example.com"
            })
        );
    }

    #[test]
    fn test_identity_from_session_shapes() {
        let wrapped = identity_from_session(json!({"user": {"email": "a@x.io"}, "expires": "soon"}));
        assert_eq!(wrapped.map(|i| i.email), Some("a@x.io".to_string()));

        let bare = identity_from_session(json!({"email": "b@x.io", "picture": "p.png"}));
        assert_eq!(bare.and_then(|i| i.picture), Some("p.png".to_string()));

        assert_eq!(identity_from_session(json!(null)), None);
        assert_eq!(identity_from_session(json!({"email": "  "})), None);
        assert_eq!(identity_from_session(json!({"user": {"name": "no email"}})), None);
    }

    #[tokio::test]
    async fn test_http_provider_forwards_credentials() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/session")
            .match_header("cookie", "session=abc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"user": {"email": "ada@example.com", "first_name": "Ada"}}).to_string())
            .create_async()
            .await;

        let identity = provider_for(&server.url())
            .resolve(&cookie_credentials())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(identity.email, "ada@example.com");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_provider_no_session_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/session")
            .with_status(401)
            .create_async()
            .await;
        let resolved = provider_for(&server.url()).resolve(&cookie_credentials()).await.unwrap();
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn test_http_provider_null_body_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/session")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("null")
            .create_async()
            .await;
        let resolved = provider_for(&server.url()).resolve(&cookie_credentials()).await.unwrap();
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn test_http_provider_server_error_is_err() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/session")
            .with_status(502)
            .create_async()
            .await;
        assert!(provider_for(&server.url()).resolve(&cookie_credentials()).await.is_err());
    }

    #[tokio::test]
    async fn test_http_provider_skips_call_without_credentials() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let resolved = provider_for(&server.url()).resolve(&Credentials::default()).await.unwrap();
        assert_eq!(resolved, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticIdentityProvider::new().with_token("tok-1", Identity::new("ada@example.com"));
        let known = Credentials {
            authorization: Some("Bearer tok-1".into()),
            cookie: None,
        };
        let unknown = Credentials {
            authorization: Some("Bearer tok-2".into()),
            cookie: None,
        };
        assert_eq!(
            provider.resolve(&known).await.unwrap().map(|i| i.email),
            Some("ada@example.com".to_string())
        );
        assert_eq!(provider.resolve(&unknown).await.unwrap(), None);
        assert_eq!(provider.resolve(&Credentials::default()).await.unwrap(), None);
    }
}
