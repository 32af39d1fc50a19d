//! History endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::{success, ApiResult};
use crate::navigation::Destination;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct NavigateResponse {
    pub location: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationView {
    pub location: String,
    pub entries: Vec<String>,
    pub scroll_resets: u64,
}

/// POST /navigate - Push a destination on the history.
///
/// Malformed destinations resolve to the home page.
pub async fn navigate(
    State(state): State<AppState>,
    Json(value): Json<serde_json::Value>,
) -> ApiResult<NavigateResponse> {
    let destination = Destination::from_json(value);
    let location = state.app.navigate_to(destination);
    success(NavigateResponse { location }, state.app.mirror().revision())
}

/// GET /location
pub async fn get_location(State(state): State<AppState>) -> ApiResult<LocationView> {
    let navigator = state.app.navigator();
    success(
        LocationView {
            location: navigator.location(),
            entries: navigator.entries(),
            scroll_resets: navigator.scroll_resets(),
        },
        state.app.mirror().revision(),
    )
}
