//! Manual refetch of one mirrored collection.

use axum::extract::{Path, State};
use serde::Serialize;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::fetch::Collection;
use crate::store::SyncOutcome;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub collection: &'static str,
    /// `null` when the fetch brought nothing new; on failure the store keeps its
    /// previous content.
    pub outcome: Option<SyncOutcome>,
}

/// POST /sync/{collection}
pub async fn sync_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<SyncResponse> {
    let Some(collection) = Collection::parse(&name) else {
        return error(
            AppError::NotFound(format!("Unknown collection: {}", name)),
            state.app.mirror().revision(),
        );
    };

    let outcome = state.sync.refresh(collection).await;
    success(
        SyncResponse {
            collection: collection.name(),
            outcome,
        },
        state.app.mirror().revision(),
    )
}
