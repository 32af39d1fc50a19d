//! Admin pass-through to the auth service, for moderators and admins only.

use std::future::Future;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::auth::{AuthSessionInfo, UserList};
use crate::errors::AppError;
use crate::models::{Profile, UserRole};
use crate::AppState;

const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BanRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeRequest {
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct Done {
    pub ok: bool,
}

fn require_moderator(state: &AppState) -> Result<Profile, AppError> {
    let user = state
        .app
        .current_user()
        .ok_or_else(|| AppError::Unauthorized("Sign in first".to_string()))?;
    if !user.role.can_moderate() {
        return Err(AppError::Forbidden(
            "Moderators and admins only".to_string(),
        ));
    }
    Ok(user)
}

/// Run an admin call behind the moderator gate. `call` is not polled unless
/// the gate passes.
async fn gated<T: Serialize>(
    state: &AppState,
    call: impl Future<Output = Result<T, AppError>>,
) -> ApiResult<T> {
    let revision_id = state.app.mirror().revision();
    if let Err(e) = require_moderator(state) {
        return error(e, revision_id);
    }
    match call.await {
        Ok(data) => success(data, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /auth/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<UserList> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    let offset = query.offset.unwrap_or(0);
    gated(&state, state.admin.list_users(limit, offset)).await
}

/// POST /auth/admin/users/{id}/ban
pub async fn ban_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<BanRequest>,
) -> ApiResult<Done> {
    let reason = request.reason.as_deref().filter(|r| !r.trim().is_empty());
    gated(&state, async {
        state.admin.ban_user(&user_id, reason).await?;
        tracing::info!(user_id = %user_id, "User banned");
        Ok::<_, AppError>(Done { ok: true })
    })
    .await
}

/// POST /auth/admin/users/{id}/unban
pub async fn unban_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Done> {
    gated(&state, async {
        state.admin.unban_user(&user_id).await?;
        Ok::<_, AppError>(Done { ok: true })
    })
    .await
}

/// DELETE /auth/admin/users/{id}
pub async fn remove_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Done> {
    gated(&state, async {
        state.admin.remove_user(&user_id).await?;
        tracing::info!(user_id = %user_id, "User removed");
        Ok::<_, AppError>(Done { ok: true })
    })
    .await
}

/// PUT /auth/admin/users/{id}/role
pub async fn set_role(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<RoleRequest>,
) -> ApiResult<Done> {
    gated(&state, async {
        state.admin.set_role(&user_id, request.role).await?;
        Ok::<_, AppError>(Done { ok: true })
    })
    .await
}

/// GET /auth/admin/users/{id}/sessions
pub async fn list_user_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<AuthSessionInfo>> {
    gated(&state, state.admin.list_user_sessions(&user_id)).await
}

/// POST /auth/admin/sessions/revoke
pub async fn revoke_user_session(
    State(state): State<AppState>,
    Json(request): Json<RevokeRequest>,
) -> ApiResult<Done> {
    gated(&state, async {
        state.admin.revoke_user_session(&request.session_token).await?;
        Ok::<_, AppError>(Done { ok: true })
    })
    .await
}
