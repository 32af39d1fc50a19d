//! Session endpoints under `/auth`.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::auth::AuthSession;
use crate::errors::AppError;
use crate::handlers::ModalState;
use crate::models::Profile;
use crate::AppState;

/// The session as the view layer sees it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user: Option<Profile>,
    pub auth_user: Option<AuthSession>,
    pub modals: ModalState,
}

impl SessionView {
    fn of(state: &AppState) -> Self {
        Self {
            user: state.app.current_user(),
            auth_user: state.app.auth_user(),
            modals: state.app.modals(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub location: String,
}

/// GET /auth/session
pub async fn get_session(State(state): State<AppState>) -> ApiResult<SessionView> {
    success(SessionView::of(&state), state.app.mirror().revision())
}

/// POST /auth/sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> ApiResult<SessionView> {
    let user = state
        .app
        .sign_in(
            state.auth.as_ref(),
            &state.api,
            &request.email,
            &request.password,
        )
        .await;

    let revision_id = state.app.mirror().revision();
    match user {
        Some(_) => success(SessionView::of(&state), revision_id),
        None => error(
            AppError::Unauthorized("Sign-in refused".to_string()),
            revision_id,
        ),
    }
}

/// POST /auth/sign-up
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> ApiResult<SessionView> {
    let revision_id = state.app.mirror().revision();
    if request.name.trim().is_empty() || request.email.trim().is_empty() {
        return error(
            AppError::Validation("Name and email are required".to_string()),
            revision_id,
        );
    }

    let user = state
        .app
        .sign_up(
            state.auth.as_ref(),
            &state.api,
            &request.name,
            &request.email,
            &request.password,
        )
        .await;

    match user {
        Some(_) => success(SessionView::of(&state), state.app.mirror().revision()),
        None => error(
            AppError::Unauthorized("Sign-up refused".to_string()),
            revision_id,
        ),
    }
}

/// POST /auth/sign-out
pub async fn sign_out(State(state): State<AppState>) -> ApiResult<SignOutResponse> {
    let location = state.app.sign_out(state.auth.as_ref()).await;
    success(SignOutResponse { location }, state.app.mirror().revision())
}
