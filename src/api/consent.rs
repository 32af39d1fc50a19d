//! Cookie-consent banner state.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::AppState;

/// `accepted` is `null` until the visitor answered the banner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentView {
    pub accepted: Option<bool>,
    pub show_banner: bool,
}

impl ConsentView {
    fn new(accepted: Option<bool>) -> Self {
        Self {
            accepted,
            show_banner: accepted.is_none(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConsentRequest {
    pub accepted: bool,
}

/// GET /consent
pub async fn get_consent(State(state): State<AppState>) -> ApiResult<ConsentView> {
    let revision_id = state.app.mirror().revision();
    match state.storage.cookie_consent().await {
        Ok(accepted) => success(ConsentView::new(accepted), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /consent
pub async fn set_consent(
    State(state): State<AppState>,
    Json(request): Json<ConsentRequest>,
) -> ApiResult<ConsentView> {
    let revision_id = state.app.mirror().revision();
    match state.storage.set_cookie_consent(request.accepted).await {
        Ok(()) => {
            tracing::info!(accepted = request.accepted, "Cookie consent recorded");
            success(ConsentView::new(Some(request.accepted)), revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}
