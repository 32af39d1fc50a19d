//! Action endpoints: one per mutation handler.
//!
//! A handler whose preconditions fail is not an error: the response says
//! `applied: false` and the mirror is untouched.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::handlers::ModalState;
use crate::models::{
    Booking, BookingDraft, BookingStatus, CatalogueDraft, CatalogueUpdate, Comment, Conversation,
    Event, EventDraft, ForumPost, ForumThread, Group, GroupDraft, Listing, ListingDraft,
    ListingUpdate, LiveEvent, LiveEventDraft, Message, Order, OrderDraft, OrderStatus,
    Organization, OrganizationUpdate, Place, PlaceClaim, PlaceDraft, Product, Profile,
    ProfileUpdate, PublicationStatus, Report, ReportDraft, ReportTarget, Review, ReviewDraft,
    Service, ThreadDraft, Trail, TrailDraft, Vote,
};
use crate::AppState;

/// Result of one action.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome<T: Serialize> {
    pub applied: bool,
    pub record: Option<T>,
    /// History location after the action.
    pub location: String,
}

fn outcome<T: Serialize>(state: &AppState, record: Option<T>) -> ApiResult<ActionOutcome<T>> {
    success(
        ActionOutcome {
            applied: record.is_some(),
            record,
            location: state.app.location(),
        },
        state.app.mirror().revision(),
    )
}

fn applied(state: &AppState, applied: bool) -> ApiResult<ActionOutcome<()>> {
    success(
        ActionOutcome {
            applied,
            record: None,
            location: state.app.location(),
        },
        state.app.mirror().revision(),
    )
}

#[derive(Debug, Deserialize)]
pub struct ContentBody {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ClaimBody {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteBody {
    pub vote: Vote,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipBody {
    /// Defaults to the current user.
    #[serde(default)]
    pub profile_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationBody {
    pub participant_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody<S> {
    pub status: S,
}

// ==================== DIRECTORY ====================

/// POST /actions/places
pub async fn submit_place(
    State(state): State<AppState>,
    Json(draft): Json<PlaceDraft>,
) -> ApiResult<ActionOutcome<Arc<Place>>> {
    let record = state.app.submit_place(&draft);
    outcome(&state, record)
}

/// POST /actions/places/{id}/reviews
pub async fn add_review(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
    Json(draft): Json<ReviewDraft>,
) -> ApiResult<ActionOutcome<Review>> {
    let record = state.app.add_review(&place_id, &draft);
    outcome(&state, record)
}

/// POST /actions/places/{id}/favorite
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
) -> ApiResult<ActionOutcome<Profile>> {
    let record = state.app.toggle_favorite(&place_id);
    outcome(&state, record)
}

/// POST /actions/places/{id}/claim
pub async fn claim_place(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
    Json(body): Json<ClaimBody>,
) -> ApiResult<ActionOutcome<Arc<PlaceClaim>>> {
    let record = state.app.claim_place(&place_id, &body.message);
    outcome(&state, record)
}

/// POST /actions/events
pub async fn submit_event(
    State(state): State<AppState>,
    Json(draft): Json<EventDraft>,
) -> ApiResult<ActionOutcome<Arc<Event>>> {
    let record = state.app.submit_event(&draft);
    outcome(&state, record)
}

/// POST /actions/trails
pub async fn submit_trail(
    State(state): State<AppState>,
    Json(draft): Json<TrailDraft>,
) -> ApiResult<ActionOutcome<Arc<Trail>>> {
    let record = state.app.submit_trail(&draft);
    outcome(&state, record)
}

/// POST /actions/live-events
pub async fn post_live_event(
    State(state): State<AppState>,
    Json(draft): Json<LiveEventDraft>,
) -> ApiResult<ActionOutcome<Arc<LiveEvent>>> {
    let record = state.app.post_live_event(&draft);
    outcome(&state, record)
}

/// POST /actions/live-events/{id}/vote
pub async fn vote_live_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<VoteBody>,
) -> ApiResult<ActionOutcome<Arc<LiveEvent>>> {
    let record = state.app.vote_live_event(&id, body.vote);
    outcome(&state, record)
}

// ==================== COMMUNITY ====================

/// POST /actions/articles/{id}/comments
pub async fn add_comment(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
    Json(body): Json<ContentBody>,
) -> ApiResult<ActionOutcome<Comment>> {
    let record = state.app.add_comment(&article_id, &body.content);
    outcome(&state, record)
}

/// POST /actions/listings
pub async fn create_listing(
    State(state): State<AppState>,
    Json(draft): Json<ListingDraft>,
) -> ApiResult<ActionOutcome<Arc<Listing>>> {
    let record = state.app.create_listing(&draft);
    outcome(&state, record)
}

/// PUT /actions/listings/{id}
pub async fn update_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ListingUpdate>,
) -> ApiResult<ActionOutcome<Arc<Listing>>> {
    let record = state.app.update_listing(&id, &update);
    outcome(&state, record)
}

/// DELETE /actions/listings/{id}
pub async fn delete_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ActionOutcome<()>> {
    let removed = state.app.delete_listing(&id);
    applied(&state, removed)
}

/// POST /actions/threads
pub async fn create_thread(
    State(state): State<AppState>,
    Json(draft): Json<ThreadDraft>,
) -> ApiResult<ActionOutcome<Arc<ForumThread>>> {
    let record = state.app.create_thread(&draft);
    outcome(&state, record)
}

/// POST /actions/threads/{id}/posts
pub async fn add_forum_post(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    Json(body): Json<ContentBody>,
) -> ApiResult<ActionOutcome<ForumPost>> {
    let record = state.app.add_forum_post(&thread_id, &body.content);
    outcome(&state, record)
}

/// POST /actions/groups
pub async fn create_group(
    State(state): State<AppState>,
    Json(draft): Json<GroupDraft>,
) -> ApiResult<ActionOutcome<Arc<Group>>> {
    let record = state.app.create_group(&draft);
    outcome(&state, record)
}

/// POST /actions/groups/{id}/membership
pub async fn toggle_group_membership(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(body): Json<MembershipBody>,
) -> ApiResult<ActionOutcome<Arc<Group>>> {
    let profile_id = body
        .profile_id
        .or_else(|| state.app.current_user().map(|u| u.id));
    let record = profile_id.and_then(|id| state.app.toggle_group_membership(&group_id, &id));
    outcome(&state, record)
}

/// POST /actions/conversations
pub async fn start_conversation(
    State(state): State<AppState>,
    Json(body): Json<ConversationBody>,
) -> ApiResult<ActionOutcome<Arc<Conversation>>> {
    let record = state.app.start_conversation(&body.participant_id);
    outcome(&state, record)
}

/// POST /actions/conversations/{id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(body): Json<ContentBody>,
) -> ApiResult<ActionOutcome<Message>> {
    let record = state.app.send_message(&conversation_id, &body.content);
    outcome(&state, record)
}

/// PUT /actions/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<ActionOutcome<Profile>> {
    let record = state.app.update_profile(&update);
    outcome(&state, record)
}

// ==================== COMMERCE ====================

/// PUT /actions/organization
pub async fn update_organization(
    State(state): State<AppState>,
    Json(update): Json<OrganizationUpdate>,
) -> ApiResult<ActionOutcome<Arc<Organization>>> {
    let record = state.app.update_organization(&update);
    outcome(&state, record)
}

/// POST /actions/products
pub async fn add_product(
    State(state): State<AppState>,
    Json(draft): Json<CatalogueDraft>,
) -> ApiResult<ActionOutcome<Arc<Product>>> {
    let record = state.app.add_product(&draft);
    outcome(&state, record)
}

/// PUT /actions/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<CatalogueUpdate>,
) -> ApiResult<ActionOutcome<Arc<Product>>> {
    let record = state.app.update_product(&id, &update);
    outcome(&state, record)
}

/// DELETE /actions/products/{id}
pub async fn remove_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ActionOutcome<()>> {
    let removed = state.app.remove_product(&id);
    applied(&state, removed)
}

/// POST /actions/services
pub async fn add_service(
    State(state): State<AppState>,
    Json(draft): Json<CatalogueDraft>,
) -> ApiResult<ActionOutcome<Arc<Service>>> {
    let record = state.app.add_service(&draft);
    outcome(&state, record)
}

/// PUT /actions/services/{id}
pub async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<CatalogueUpdate>,
) -> ApiResult<ActionOutcome<Arc<Service>>> {
    let record = state.app.update_service(&id, &update);
    outcome(&state, record)
}

/// DELETE /actions/services/{id}
pub async fn remove_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ActionOutcome<()>> {
    let removed = state.app.remove_service(&id);
    applied(&state, removed)
}

/// POST /actions/orders
pub async fn place_order(
    State(state): State<AppState>,
    Json(draft): Json<OrderDraft>,
) -> ApiResult<ActionOutcome<Arc<Order>>> {
    let record = state.app.place_order(&draft);
    outcome(&state, record)
}

/// PUT /actions/orders/{id}/status
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody<OrderStatus>>,
) -> ApiResult<ActionOutcome<Arc<Order>>> {
    let record = state.app.update_order_status(&id, body.status);
    outcome(&state, record)
}

/// POST /actions/bookings
pub async fn create_booking(
    State(state): State<AppState>,
    Json(draft): Json<BookingDraft>,
) -> ApiResult<ActionOutcome<Arc<Booking>>> {
    let record = state.app.create_booking(&draft);
    outcome(&state, record)
}

/// PUT /actions/bookings/{id}/status
pub async fn update_booking_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody<BookingStatus>>,
) -> ApiResult<ActionOutcome<Arc<Booking>>> {
    let record = state.app.update_booking_status(&id, body.status);
    outcome(&state, record)
}

// ==================== REPORTS & MODERATION ====================

/// POST /actions/reports/open
pub async fn open_report(
    State(state): State<AppState>,
    Json(target): Json<ReportTarget>,
) -> ApiResult<ModalState> {
    state.app.open_report(target);
    success(state.app.modals(), state.app.mirror().revision())
}

/// POST /actions/reports/close
pub async fn close_report(State(state): State<AppState>) -> ApiResult<ModalState> {
    state.app.close_report();
    success(state.app.modals(), state.app.mirror().revision())
}

/// POST /actions/reports
pub async fn submit_report(
    State(state): State<AppState>,
    Json(draft): Json<ReportDraft>,
) -> ApiResult<ActionOutcome<Arc<Report>>> {
    let record = state.app.submit_report(&draft);
    outcome(&state, record)
}

/// PUT /actions/reports/{id}/{decision}
pub async fn decide_report(
    State(state): State<AppState>,
    Path((id, decision)): Path<(String, String)>,
) -> ApiResult<ActionOutcome<Arc<Report>>> {
    let record = match decision.as_str() {
        "resolve" => state.app.resolve_report(&id),
        "dismiss" => state.app.dismiss_report(&id),
        other => {
            return error(
                AppError::BadRequest(format!("Unknown report decision: {}", other)),
                state.app.mirror().revision(),
            )
        }
    };
    outcome(&state, record)
}

/// PUT /actions/claims/{id}/{decision}
pub async fn decide_claim(
    State(state): State<AppState>,
    Path((id, decision)): Path<(String, String)>,
) -> ApiResult<ActionOutcome<Arc<PlaceClaim>>> {
    let record = match decision.as_str() {
        "approve" => state.app.approve_claim(&id),
        "reject" => state.app.reject_claim(&id),
        other => {
            return error(
                AppError::BadRequest(format!("Unknown claim decision: {}", other)),
                state.app.mirror().revision(),
            )
        }
    };
    outcome(&state, record)
}

/// PUT /actions/moderation/{collection}/{id}/status
pub async fn set_publication_status(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<StatusBody<PublicationStatus>>,
) -> ApiResult<ActionOutcome<serde_json::Value>> {
    let app = &state.app;
    let status = body.status;
    let record = match collection.as_str() {
        "places" => app.set_place_status(&id, status).map(serde_json::to_value),
        "events" => app.set_event_status(&id, status).map(serde_json::to_value),
        "trails" => app.set_trail_status(&id, status).map(serde_json::to_value),
        "listings" => app.set_listing_status(&id, status).map(serde_json::to_value),
        other => {
            return error(
                AppError::BadRequest(format!("{} has no publication status", other)),
                app.mirror().revision(),
            )
        }
    };

    match record.transpose() {
        Ok(record) => outcome(&state, record),
        Err(e) => error(e.into(), app.mirror().revision()),
    }
}

// ==================== MODALS ====================

/// POST /actions/modals/{modal}
pub async fn toggle_modal(
    State(state): State<AppState>,
    Path(modal): Path<String>,
) -> ApiResult<ModalState> {
    match modal.as_str() {
        "login" => state.app.open_login(),
        "register" => state.app.open_register(),
        "close" => state.app.close_auth_modals(),
        other => {
            return error(
                AppError::NotFound(format!("No modal named {}", other)),
                state.app.mirror().revision(),
            )
        }
    }
    success(state.app.modals(), state.app.mirror().revision())
}
