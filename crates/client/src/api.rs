//! REST client for the checklist backend.
//!
//! Wraps the achievement, progress, auth and admin endpoints using
//! [`reqwest`]. All paths are relative to the configured base URL.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tidemark_core::achievement::{Achievement, AchievementDraft, AchievementPatch, ProgressRecord};
use tidemark_core::pending::ProgressUpdate;
use tidemark_core::types::{AchievementId, DbId};

use crate::config::ClientConfig;
use crate::error::{ClientError, RejectCode};
use crate::sync::{Identity, ProgressTransport};

/// HTTP client for one checklist backend.
#[derive(Debug, Clone)]
pub struct ChecklistApi {
    client: reqwest::Client,
    api_url: String,
}

/// Account returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: DbId,
    pub nickname: String,
}

/// Successful login/register/set-password payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthGrant {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
struct MeResult {
    user: User,
}

/// `{ success, result?, error?, message? }` wrapper used by `/api/auth/*`.
#[derive(Debug, Deserialize)]
struct AuthEnvelope<T> {
    success: bool,
    result: Option<T>,
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    nickname: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    nickname: &'a str,
    updates: &'a [ProgressUpdate],
}

/// Error body of the admin endpoints.
#[derive(Debug, Deserialize)]
struct AdminErrorBody {
    error: String,
}

impl ChecklistApi {
    /// Create a client for `api_url` with the given per-request timeout.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://localhost:3000`.
    pub fn new(api_url: impl Into<String>, timeout: std::time::Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url))
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(config.api_url.clone(), config.request_timeout)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    // ---- achievements and progress ----

    /// Fetch every achievement, ordered by id.
    ///
    /// Sends `GET /api/achievements`.
    pub async fn list_achievements(&self) -> Result<Vec<Achievement>, ClientError> {
        let response = self.client.get(self.url("/api/achievements")).send().await?;
        Self::parse_response(response).await
    }

    /// Fetch the stored progress of `nickname`.
    ///
    /// Sends `GET /api/user-progress?nickname=<nickname>`. An empty nickname
    /// short-circuits to an empty list.
    pub async fn get_progress(&self, nickname: &str) -> Result<Vec<ProgressRecord>, ClientError> {
        if nickname.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .client
            .get(self.url("/api/user-progress"))
            .query(&[("nickname", nickname)])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Apply a batch of completion states for `identity`.
    ///
    /// Sends `POST /api/user-progress/batch`, with a bearer token when the
    /// identity is signed in. Only the status matters; the `result` body is
    /// not inspected.
    pub async fn batch_update(
        &self,
        identity: &Identity,
        updates: &[ProgressUpdate],
    ) -> Result<(), ClientError> {
        let body = BatchRequest {
            nickname: &identity.nickname,
            updates,
        };
        let mut request = self.client.post(self.url("/api/user-progress/batch")).json(&body);
        if let Some(token) = &identity.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::check_status(response).await
    }

    // ---- auth ----

    /// Sends `POST /api/auth/login`.
    pub async fn login(&self, nickname: &str, password: &str) -> Result<AuthGrant, ClientError> {
        self.post_credentials("/api/auth/login", nickname, password).await
    }

    /// Sends `POST /api/auth/register`.
    pub async fn register(&self, nickname: &str, password: &str) -> Result<AuthGrant, ClientError> {
        self.post_credentials("/api/auth/register", nickname, password).await
    }

    /// Attach a password to a legacy nickname-only account.
    ///
    /// Sends `POST /api/auth/set-password`.
    pub async fn set_password(
        &self,
        nickname: &str,
        password: &str,
    ) -> Result<AuthGrant, ClientError> {
        self.post_credentials("/api/auth/set-password", nickname, password)
            .await
    }

    /// Resolve a bearer token to its account.
    ///
    /// Sends `GET /api/auth/me`.
    pub async fn me(&self, token: &str) -> Result<User, ClientError> {
        let response = self
            .client
            .get(self.url("/api/auth/me"))
            .bearer_auth(token)
            .send()
            .await?;
        let me: MeResult = Self::parse_envelope(response).await?;
        Ok(me.user)
    }

    async fn post_credentials(
        &self,
        path: &str,
        nickname: &str,
        password: &str,
    ) -> Result<AuthGrant, ClientError> {
        let response = self
            .client
            .post(self.url(path))
            .json(&Credentials { nickname, password })
            .send()
            .await?;
        Self::parse_envelope(response).await
    }

    // ---- admin ----

    /// Check an admin key. `Ok(())` means the key is accepted.
    ///
    /// Sends `POST /api/admin/verify`.
    pub async fn verify_admin(&self, admin_key: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("/api/admin/verify"))
            .bearer_auth(admin_key)
            .send()
            .await?;
        Self::check_admin_status(response).await.map(|_| ())
    }

    /// Sends `POST /api/admin/achievements`.
    pub async fn create_achievement(
        &self,
        admin_key: &str,
        draft: &AchievementDraft,
    ) -> Result<Achievement, ClientError> {
        let response = self
            .client
            .post(self.url("/api/admin/achievements"))
            .bearer_auth(admin_key)
            .json(draft)
            .send()
            .await?;
        let response = Self::check_admin_status(response).await?;
        Ok(response.json().await?)
    }

    /// Sends `PATCH /api/admin/achievements/{id}` with only the set fields.
    pub async fn update_achievement(
        &self,
        admin_key: &str,
        id: AchievementId,
        patch: &AchievementPatch,
    ) -> Result<Achievement, ClientError> {
        let response = self
            .client
            .patch(self.url(&format!("/api/admin/achievements/{id}")))
            .bearer_auth(admin_key)
            .json(patch)
            .send()
            .await?;
        let response = Self::check_admin_status(response).await?;
        Ok(response.json().await?)
    }

    /// Sends `DELETE /api/admin/achievements/{id}`.
    pub async fn delete_achievement(
        &self,
        admin_key: &str,
        id: AchievementId,
    ) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/admin/achievements/{id}")))
            .bearer_auth(admin_key)
            .send()
            .await?;
        Self::check_admin_status(response).await.map(|_| ())
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. 401/403 become
    /// [`ClientError::Unauthorized`], anything else non-2xx becomes
    /// [`ClientError::Api`] with the body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(status_error(status, body))
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ClientError> {
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Like [`ensure_success`](Self::ensure_success) but unwraps the
    /// admin `{error}` body into the error message.
    async fn check_admin_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<AdminErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        Err(status_error(status, message))
    }

    /// Decode an auth envelope regardless of status. A `success: false`
    /// envelope carrying a code becomes [`ClientError::Rejected`].
    async fn parse_envelope<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;
        decode_envelope(status, &body)
    }
}

fn status_error(status: StatusCode, body: String) -> ClientError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(body),
        _ => ClientError::Api {
            status: status.as_u16(),
            body,
        },
    }
}

fn decode_envelope<T: serde::de::DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<T, ClientError> {
    let envelope: AuthEnvelope<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => return Err(status_error(status, body.to_string())),
        Err(e) => return Err(ClientError::Decode(e)),
    };

    if envelope.success && status.is_success() {
        if let Some(result) = envelope.result {
            return Ok(result);
        }
    }

    let message = envelope.message.unwrap_or_default();
    match envelope.error {
        Some(code) => Err(ClientError::Rejected {
            code: RejectCode::from_code(&code),
            message,
        }),
        None if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
            Err(ClientError::Unauthorized(message))
        }
        None => Err(ClientError::Api {
            status: status.as_u16(),
            body: if message.is_empty() { body.to_string() } else { message },
        }),
    }
}

#[async_trait]
impl ProgressTransport for ChecklistApi {
    async fn send_batch(
        &self,
        identity: &Identity,
        updates: &[ProgressUpdate],
    ) -> Result<(), ClientError> {
        self.batch_update(identity, updates).await
    }
}
