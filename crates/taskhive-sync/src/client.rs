//! Bearer-authenticated client for the remote API.
//!
//! The token lives in the key-value store under `authToken`, shared with
//! every other process using the same data directory.

use crate::error::{Result, SyncError};
use crate::types::{
    AuthResponse, CreateBoardRequest, CreateWorkspaceRequest, GoogleLoginRequest, InviteRequest,
    LoginRequest, RegisterRequest, RemoteBoard, RemoteWorkspace, UserProfile,
};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use taskhive_store::{keys, ApiSettings, KvStore};
use tracing::{debug, info};

/// HTTP client for the remote API.
#[derive(Clone)]
pub struct RemoteClient {
    base_url: String,
    http: reqwest::Client,
    kv: Arc<dyn KvStore>,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RemoteClient {
    /// Create a client for `settings.base_url`, keeping its token in `kv`.
    ///
    /// # Errors
    /// Returns `SyncError::Validation` for a base URL that is not http(s),
    /// or `SyncError::Http` if the HTTP client cannot be built.
    pub fn new(settings: &ApiSettings, kv: Arc<dyn KvStore>) -> Result<Self> {
        let base_url = settings.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SyncError::Validation(format!(
                "API base URL must start with http:// or https://, got '{base_url}'"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self { base_url, http, kv })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- Auth ---

    /// Log in with email and password, storing the returned token.
    ///
    /// # Errors
    /// Returns `SyncError::Status` when the credentials are rejected.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let body = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let resp: AuthResponse = self
            .json(self.http.post(self.url("/auth/login")).json(&body))
            .await?;
        self.store_token(resp).await?;
        info!(email = %body.email, "Logged in");
        Ok(())
    }

    /// Exchange a Google identity token for an API token.
    ///
    /// # Errors
    /// Returns error if the exchange fails or yields no token.
    pub async fn google_login(&self, id_token: &str) -> Result<()> {
        let body = GoogleLoginRequest {
            token: id_token.to_string(),
        };
        let resp: AuthResponse = self
            .json(self.http.post(self.url("/auth/google")).json(&body))
            .await?;
        self.store_token(resp).await?;
        info!("Logged in with Google");
        Ok(())
    }

    /// Create an account. The server answers with a message; the account
    /// stays unverified until [`RemoteClient::verify_otp`] succeeds.
    ///
    /// # Errors
    /// Returns error if any field is blank or the server rejects the request.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<String> {
        let username = require(username, "username")?;
        let email = validate_email(email)?;
        if password.is_empty() {
            return Err(SyncError::Validation("password must not be empty".into()));
        }
        let body = RegisterRequest {
            username,
            email,
            password: password.to_string(),
        };
        self.text(self.http.post(self.url("/auth/register")).json(&body))
            .await
    }

    /// Ask the server to email a one-time password.
    ///
    /// # Errors
    /// Returns error for an invalid email or a failed request.
    pub async fn send_otp(&self, email: &str) -> Result<String> {
        let email = validate_email(email)?;
        self.text(
            self.http
                .post(self.url("/auth/send-otp"))
                .query(&[("email", email.as_str())]),
        )
        .await
    }

    /// Confirm an account with the emailed one-time password.
    ///
    /// # Errors
    /// Returns `SyncError::Status` when the code is wrong or expired.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<String> {
        let email = validate_email(email)?;
        let otp = require(otp, "OTP")?;
        self.text(
            self.http
                .post(self.url("/auth/verify-otp"))
                .query(&[("email", email.as_str()), ("otp", otp.as_str())]),
        )
        .await
    }

    /// Forget the stored token.
    ///
    /// # Errors
    /// Returns `SyncError::Kv` if the token cannot be removed.
    pub async fn logout(&self) -> Result<()> {
        self.kv.remove(keys::AUTH_TOKEN).await?;
        info!("Logged out");
        Ok(())
    }

    /// Whether a token is stored.
    ///
    /// # Errors
    /// Returns `SyncError::Kv` if the token cannot be read.
    pub async fn is_authenticated(&self) -> Result<bool> {
        match self.token().await {
            Ok(_) => Ok(true),
            Err(SyncError::NotAuthenticated) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Profile of the logged-in user.
    ///
    /// # Errors
    /// Returns `SyncError::NotAuthenticated` without a token.
    pub async fn me(&self) -> Result<UserProfile> {
        let req = self.authed(self.http.get(self.url("/users/me"))).await?;
        self.json(req).await
    }

    // --- Workspaces ---

    /// # Errors
    /// Returns error if the request fails.
    pub async fn create_workspace(&self, name: &str) -> Result<RemoteWorkspace> {
        let body = CreateWorkspaceRequest {
            name: require(name, "workspace name")?,
        };
        let req = self
            .authed(self.http.post(self.url("/workspaces")).json(&body))
            .await?;
        let ws: RemoteWorkspace = self.json(req).await?;
        info!(remote_id = ws.id, name = %ws.name, "Created remote workspace");
        Ok(ws)
    }

    /// # Errors
    /// Returns error if the request fails.
    pub async fn list_workspaces(&self) -> Result<Vec<RemoteWorkspace>> {
        let req = self.authed(self.http.get(self.url("/workspaces"))).await?;
        self.json(req).await
    }

    /// # Errors
    /// Returns error if the request fails.
    pub async fn delete_workspace(&self, remote_id: i64) -> Result<()> {
        let req = self
            .authed(self.http.delete(self.url(&format!("/workspaces/{remote_id}"))))
            .await?;
        self.send(req).await?;
        info!(remote_id, "Deleted remote workspace");
        Ok(())
    }

    /// Invite someone to a remote workspace by email.
    ///
    /// # Errors
    /// Returns `SyncError::Validation` for a malformed email, otherwise the
    /// server's plain-text error as `SyncError::Status`.
    pub async fn invite(&self, remote_workspace_id: i64, email: &str) -> Result<String> {
        let body = InviteRequest {
            workspace_id: remote_workspace_id,
            email: validate_email(email)?,
        };
        let req = self
            .authed(self.http.post(self.url("/workspaces/invite")).json(&body))
            .await?;
        let message = self.text(req).await?;
        info!(workspace_id = remote_workspace_id, email = %body.email, "Sent invite");
        Ok(message)
    }

    // --- Boards ---

    /// # Errors
    /// Returns error if the request fails.
    pub async fn create_board(&self, title: &str, remote_workspace_id: i64) -> Result<RemoteBoard> {
        let body = CreateBoardRequest {
            title: require(title, "board title")?,
            workspace_id: remote_workspace_id,
        };
        let req = self
            .authed(self.http.post(self.url("/boards")).json(&body))
            .await?;
        self.json(req).await
    }

    /// # Errors
    /// Returns error if the request fails.
    pub async fn list_boards(&self, remote_workspace_id: i64) -> Result<Vec<RemoteBoard>> {
        let req = self
            .authed(self.http.get(self.url(&format!("/boards/{remote_workspace_id}"))))
            .await?;
        self.json(req).await
    }

    // --- Plumbing ---

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn token(&self) -> Result<String> {
        self.kv
            .get(keys::AUTH_TOKEN)
            .await?
            .filter(|t| !t.is_empty())
            .ok_or(SyncError::NotAuthenticated)
    }

    async fn store_token(&self, resp: AuthResponse) -> Result<()> {
        let token = resp
            .token
            .filter(|t| !t.is_empty())
            .ok_or(SyncError::MissingToken)?;
        self.kv.set(keys::AUTH_TOKEN, &token).await?;
        Ok(())
    }

    async fn authed(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        Ok(req.bearer_auth(self.token().await?))
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let resp = req.send().await?;
        let status = resp.status();
        debug!(url = %resp.url().path(), status = status.as_u16(), "Remote response");

        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            let message = if message.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                message.trim().to_string()
            };
            return Err(SyncError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        Ok(self.send(req).await?.json().await?)
    }

    async fn text(&self, req: RequestBuilder) -> Result<String> {
        Ok(self.send(req).await?.text().await?)
    }
}

fn require(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SyncError::Validation(format!("{what} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Trim and sanity-check an email address.
///
/// # Errors
/// Returns `SyncError::Validation` unless the address has a non-empty local
/// part and a dotted domain.
pub fn validate_email(email: &str) -> Result<String> {
    let email = email.trim();
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && !email.contains(char::is_whitespace)
            && domain
                .split_once('.')
                .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
    });
    if !valid {
        return Err(SyncError::Validation(format!(
            "'{email}' is not a valid email address"
        )));
    }
    Ok(email.to_string())
}
