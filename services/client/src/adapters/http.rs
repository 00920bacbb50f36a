//! services/client/src/adapters/http.rs
//!
//! This module contains the HTTP adapter for the spam-classifier backend.
//! It implements the `SessionBackend` and `HistorySource` ports from the `core` crate
//! on top of `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use spamwall_core::domain::{Credential, HistoryItem, UserIdentity};
use spamwall_core::ports::{
    AuthGrant, HistorySource, PortError, PortResult, SessionBackend, Verification,
};
use tracing::{debug, warn};

use crate::config::Config;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that talks to the backend's REST surface.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Creates a new `HttpBackend` for a base URL such as `http://localhost:5000`.
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            config.api_base_url.clone(),
            config.request_timeout,
            config.connect_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Probe whether the server is reachable by hitting its health endpoint.
    pub async fn probe_server(&self) -> bool {
        let resp = self.client.get(self.url("/health")).send().await;
        matches!(resp, Ok(r) if r.status().is_success())
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, fallback: &str) -> PortResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!(path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(rejection(response, fallback).await);
        }
        decode(response).await
    }

    async fn get_authorized(&self, path: &str, credential: &Credential) -> PortResult<Response> {
        debug!(path, "GET");
        self.client
            .get(self.url(path))
            .header(header::AUTHORIZATION, credential.bearer())
            .send()
            .await
            .map_err(transport_error)
    }
}

//=========================================================================================
// Wire Records
//=========================================================================================

#[derive(Serialize)]
struct CredentialsPayload<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct EmailPayload<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct ResetPayload<'a> {
    token: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct UserRecord {
    id: i64,
    email: String,
}
impl UserRecord {
    fn to_domain(self) -> UserIdentity {
        UserIdentity {
            id: self.id,
            email: self.email,
        }
    }
}

#[derive(Deserialize)]
struct AuthRecord {
    #[serde(default)]
    message: Option<String>,
    access_token: String,
    user: UserRecord,
}
impl AuthRecord {
    fn to_domain(self) -> AuthGrant {
        AuthGrant {
            credential: Credential::new(self.access_token),
            user: self.user.to_domain(),
            message: self.message,
        }
    }
}

#[derive(Deserialize)]
struct VerifyRecord {
    user: UserRecord,
}

#[derive(Deserialize)]
struct MessageRecord {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorRecord {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct HistoryRecord {
    text: String,
    is_spam: bool,
    #[serde(default)]
    timestamp: Option<String>,
}
impl HistoryRecord {
    fn to_domain(self) -> HistoryItem {
        HistoryItem {
            text: self.text,
            is_spam: self.is_spam,
            timestamp: self.timestamp.unwrap_or_default(),
        }
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn transport_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::TimedOut
    } else if e.is_connect() || e.is_request() {
        warn!("Backend unreachable: {}", e);
        PortError::Unreachable
    } else {
        PortError::Unexpected(e.to_string())
    }
}

/// Builds a `Rejected` error from the `error` field of the body, or `fallback`.
async fn rejection(response: Response, fallback: &str) -> PortError {
    let status = response.status().as_u16();
    let message = response
        .json::<ErrorRecord>()
        .await
        .ok()
        .and_then(|record| record.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    debug!(status, "Backend rejected the request");
    PortError::Rejected { status, message }
}

async fn decode<T: DeserializeOwned>(response: Response) -> PortResult<T> {
    response.json::<T>().await.map_err(|e| {
        if e.is_timeout() {
            PortError::TimedOut
        } else {
            PortError::Unexpected(format!("malformed response: {}", e))
        }
    })
}

//=========================================================================================
// `SessionBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionBackend for HttpBackend {
    async fn verify(&self, credential: &Credential) -> PortResult<Verification> {
        let response = self.get_authorized("/verify-token", credential).await?;
        if !response.status().is_success() {
            debug!(status = response.status().as_u16(), "Credential rejected");
            return Ok(Verification::rejected());
        }
        let record: VerifyRecord = decode(response).await?;
        Ok(Verification::accepted(record.user.to_domain()))
    }

    async fn login(&self, email: &str, password: &str) -> PortResult<AuthGrant> {
        let payload = CredentialsPayload { email, password };
        let record: AuthRecord = self.post_json("/login", &payload, "Login failed").await?;
        Ok(record.to_domain())
    }

    async fn register(&self, email: &str, password: &str) -> PortResult<AuthGrant> {
        let payload = CredentialsPayload { email, password };
        let record: AuthRecord = self
            .post_json("/register", &payload, "Registration failed")
            .await?;
        Ok(record.to_domain())
    }

    async fn forgot_password(&self, email: &str) -> PortResult<String> {
        let record: MessageRecord = self
            .post_json(
                "/forgot-password",
                &EmailPayload { email },
                "Failed to send reset email",
            )
            .await?;
        Ok(record
            .message
            .unwrap_or_else(|| "Password reset email sent".to_string()))
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> PortResult<String> {
        let payload = ResetPayload {
            token,
            password: new_password,
        };
        let record: MessageRecord = self
            .post_json("/reset-password", &payload, "Failed to reset password")
            .await?;
        Ok(record
            .message
            .unwrap_or_else(|| "Password has been reset".to_string()))
    }
}

//=========================================================================================
// `HistorySource` Trait Implementation
//=========================================================================================

#[async_trait]
impl HistorySource for HttpBackend {
    async fn fetch_all(&self, credential: &Credential) -> PortResult<Vec<HistoryItem>> {
        let response = self.get_authorized("/history", credential).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(PortError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(rejection(response, "Failed to fetch history").await);
        }

        // Anything other than a JSON array is treated as an empty history.
        let body: JsonValue = decode(response).await?;
        if !body.is_array() {
            warn!("History response was not a list; treating it as empty");
            return Ok(Vec::new());
        }
        let records: Vec<HistoryRecord> = serde_json::from_value(body)
            .map_err(|e| PortError::Unexpected(format!("malformed history entry: {}", e)))?;
        Ok(records.into_iter().map(HistoryRecord::to_domain).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::new(server.uri(), Duration::from_secs(5), Duration::from_secs(5)).unwrap()
    }

    fn auth_body() -> JsonValue {
        serde_json::json!({
            "message": "Login successful",
            "access_token": "jwt-abc",
            "user": { "id": 42, "email": "ada@example.com" }
        })
    }

    #[tokio::test]
    async fn login_returns_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(serde_json::json!({
                "email": "ada@example.com",
                "password": "pw"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body()))
            .mount(&server)
            .await;

        let grant = backend(&server).login("ada@example.com", "pw").await.unwrap();
        assert_eq!(grant.credential.expose(), "jwt-abc");
        assert_eq!(grant.user.id, 42);
        assert_eq!(grant.message.as_deref(), Some("Login successful"));
    }

    #[tokio::test]
    async fn login_rejection_surfaces_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({ "error": "Invalid credentials" })),
            )
            .mount(&server)
            .await;

        let err = backend(&server).login("ada@example.com", "nope").await.unwrap_err();
        assert_eq!(
            err,
            PortError::Rejected {
                status: 401,
                message: "Invalid credentials".to_string()
            }
        );
    }

    #[tokio::test]
    async fn rejection_without_payload_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = backend(&server)
            .register("ada@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Registration failed");
    }

    #[tokio::test]
    async fn verify_sends_bearer_and_maps_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/verify-token"))
            .and(header_is("Authorization", "Bearer good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "user": { "id": 7, "email": "x@y.z" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/verify-token"))
            .and(header_is("Authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = backend(&server);
        let ok = client.verify(&Credential::new("good")).await.unwrap();
        assert_eq!(
            ok,
            Verification::accepted(UserIdentity {
                id: 7,
                email: "x@y.z".to_string()
            })
        );
        let stale = client.verify(&Credential::new("stale")).await.unwrap();
        assert_eq!(stale, Verification::rejected());
    }

    #[tokio::test]
    async fn history_maps_unauthorized_and_parses_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/history"))
            .and(header_is("Authorization", "Bearer good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "text": "buy now", "is_spam": true, "timestamp": "2024-01-01T00:00:00" },
                { "text": "hello", "is_spam": false }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/history"))
            .and(header_is("Authorization", "Bearer expired"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = backend(&server);
        let items = client.fetch_all(&Credential::new("good")).await.unwrap();
        assert_eq!(
            items,
            vec![
                HistoryItem::new("buy now", true, "2024-01-01T00:00:00"),
                HistoryItem::new("hello", false, ""),
            ]
        );

        let err = client.fetch_all(&Credential::new("expired")).await.unwrap_err();
        assert_eq!(err, PortError::Unauthorized);
    }

    #[tokio::test]
    async fn non_list_history_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/history"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": [] })),
            )
            .mount(&server)
            .await;

        let items = backend(&server)
            .fetch_all(&Credential::new("any"))
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(auth_body())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client =
            HttpBackend::new(server.uri(), Duration::from_millis(200), Duration::from_secs(5))
                .unwrap();
        let err = client.login("ada@example.com", "pw").await.unwrap_err();
        assert_eq!(err, PortError::TimedOut);
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = HttpBackend::new(
            format!("http://127.0.0.1:{}", port),
            Duration::from_secs(2),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = client.login("ada@example.com", "pw").await.unwrap_err();
        assert_eq!(err, PortError::Unreachable);
        assert!(!client.probe_server().await);
    }

    #[tokio::test]
    async fn probe_and_password_reset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "healthy" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/reset-password"))
            .and(body_json(serde_json::json!({ "token": "t", "password": "secret1" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "message": "Password updated" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/forgot-password"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = backend(&server);
        assert!(client.probe_server().await);
        assert_eq!(
            client.reset_password("t", "secret1").await.unwrap(),
            "Password updated"
        );
        let err = client.forgot_password("ada@example.com").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to send reset email");
    }
}
