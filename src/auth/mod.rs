//! Client for the external auth service.
//!
//! The service owns credentials and sessions; this module only asks it who
//! is signed in and forwards sign-in, sign-up, sign-out and the admin calls
//! used by the moderation panel.

mod session;

pub use session::*;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::UserRole;

/// User record as the auth service returns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub banned: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Session record as the auth service returns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthSessionInfo {
    pub id: String,
    pub token: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub expires_at: String,
}

/// A verified session: the opaque token-bearing `authUser` of the app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub session: AuthSessionInfo,
    pub user: AuthUser,
}

/// Page of users from the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserList {
    pub users: Vec<AuthUser>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
struct SessionList {
    #[serde(default)]
    sessions: Vec<AuthSessionInfo>,
}

/// Session introspection and credential flows.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Current session, or `None` when signed out.
    async fn get_session(&self) -> Result<Option<AuthSession>, AppError>;

    async fn sign_in_email(&self, email: &str, password: &str) -> Result<(), AppError>;

    async fn sign_up_email(&self, name: &str, email: &str, password: &str)
        -> Result<(), AppError>;

    async fn sign_out(&self) -> Result<(), AppError>;
}

/// Administrative user management, used by the admin panel only.
#[async_trait]
pub trait AdminClient: Send + Sync {
    async fn list_users(&self, limit: u32, offset: u32) -> Result<UserList, AppError>;

    async fn ban_user(&self, user_id: &str, reason: Option<&str>) -> Result<(), AppError>;

    async fn unban_user(&self, user_id: &str) -> Result<(), AppError>;

    async fn remove_user(&self, user_id: &str) -> Result<(), AppError>;

    async fn set_role(&self, user_id: &str, role: UserRole) -> Result<(), AppError>;

    async fn list_user_sessions(&self, user_id: &str) -> Result<Vec<AuthSessionInfo>, AppError>;

    async fn revoke_user_session(&self, session_token: &str) -> Result<(), AppError>;
}

/// HTTP implementation talking to the auth service.
///
/// Share the `reqwest::Client` with the REST client so the session cookie
/// set here is sent on credentialed API calls.
#[derive(Clone)]
pub struct HttpAuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let resp = self.http.get(self.url(path)).send().await?;
        Self::decode(path, resp).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, AppError> {
        let resp = self.http.post(self.url(path)).json(&body).send().await?;
        Self::decode(path, resp).await
    }

    async fn post_ignore(&self, path: &str, body: serde_json::Value) -> Result<(), AppError> {
        self.post::<serde_json::Value>(path, body).await.map(|_| ())
    }

    async fn decode<T: DeserializeOwned>(
        path: &str,
        resp: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized(format!("{} refused the session", path)));
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::Forbidden(format!("{} refused the role", path)));
        }
        if !status.is_success() {
            return Err(AppError::upstream_status(path, status));
        }
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl AuthClient for HttpAuthClient {
    async fn get_session(&self) -> Result<Option<AuthSession>, AppError> {
        // The service answers `null` when nobody is signed in.
        self.get::<Option<AuthSession>>("/get-session").await
    }

    async fn sign_in_email(&self, email: &str, password: &str) -> Result<(), AppError> {
        self.post_ignore(
            "/sign-in/email",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn sign_up_email(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AppError> {
        self.post_ignore(
            "/sign-up/email",
            serde_json::json!({ "name": name, "email": email, "password": password }),
        )
        .await
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        self.post_ignore("/sign-out", serde_json::json!({})).await
    }
}

#[async_trait]
impl AdminClient for HttpAuthClient {
    async fn list_users(&self, limit: u32, offset: u32) -> Result<UserList, AppError> {
        self.get(&format!("/admin/list-users?limit={}&offset={}", limit, offset))
            .await
    }

    async fn ban_user(&self, user_id: &str, reason: Option<&str>) -> Result<(), AppError> {
        self.post_ignore(
            "/admin/ban-user",
            serde_json::json!({ "userId": user_id, "banReason": reason }),
        )
        .await
    }

    async fn unban_user(&self, user_id: &str) -> Result<(), AppError> {
        self.post_ignore("/admin/unban-user", serde_json::json!({ "userId": user_id }))
            .await
    }

    async fn remove_user(&self, user_id: &str) -> Result<(), AppError> {
        self.post_ignore("/admin/remove-user", serde_json::json!({ "userId": user_id }))
            .await
    }

    async fn set_role(&self, user_id: &str, role: UserRole) -> Result<(), AppError> {
        self.post_ignore(
            "/admin/set-role",
            serde_json::json!({ "userId": user_id, "role": role.as_str() }),
        )
        .await
    }

    async fn list_user_sessions(&self, user_id: &str) -> Result<Vec<AuthSessionInfo>, AppError> {
        let list: SessionList = self
            .post(
                "/admin/list-user-sessions",
                serde_json::json!({ "userId": user_id }),
            )
            .await?;
        Ok(list.sessions)
    }

    async fn revoke_user_session(&self, session_token: &str) -> Result<(), AppError> {
        self.post_ignore(
            "/admin/revoke-user-session",
            serde_json::json!({ "sessionToken": session_token }),
        )
        .await
    }
}
