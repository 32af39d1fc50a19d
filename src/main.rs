//! Salut Annecy shell
//!
//! Local application shell for the Salut Annecy guide: mirrors the REST API
//! collections in memory, serves every client route as a page model, and runs
//! the user actions as optimistic updates of the mirror.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod fetch;
mod handlers;
mod models;
mod navigation;
mod search;
mod store;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::{fixed, keyed};
use auth::{AdminClient, AuthClient, HttpAuthClient};
use config::Config;
use db::LocalStorage;
use errors::AppError;
use fetch::ApiClient;
use handlers::App;
use navigation::{Destination, ProposeKind};
use search::SearchIndex;
use store::{Mirror, MirrorSync};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<App>,
    pub auth: Arc<dyn AuthClient>,
    pub admin: Arc<dyn AdminClient>,
    pub api: ApiClient,
    pub sync: Arc<MirrorSync>,
    pub storage: LocalStorage,
    pub search: Arc<SearchIndex>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Salut Annecy shell");
    tracing::info!("REST API: {}", config.api_base_url);
    tracing::info!("Auth service: {}", config.auth_base_url);
    tracing::info!("Local storage: {:?}", config.storage_path);

    let state = build_state(config.clone()).await?;

    // Restore the session before the first page is served
    if state.app.bootstrap(state.auth.as_ref(), &state.api).await.is_none() {
        tracing::info!("No session, browsing signed out");
    }

    // One background fetch per collection; pages render from whatever has arrived
    state.sync.spawn_all();
    let sync = state.sync.clone();

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Shell listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sync.shutdown();
    tracing::info!("Shell stopped");

    Ok(())
}

/// Wire the clients, the mirror and local storage together.
pub async fn build_state(config: Config) -> Result<AppState, AppError> {
    let api = ApiClient::new(&config.api_base_url)?;
    // Same client, so the auth cookie rides along on credentialed fetches
    let auth_client = Arc::new(HttpAuthClient::new(
        api.http().clone(),
        &config.auth_base_url,
    ));

    let mirror = Arc::new(Mirror::new());
    let sync = Arc::new(MirrorSync::new(&api, mirror.clone()));
    let storage = LocalStorage::open(&config.storage_path).await?;
    let search = Arc::new(SearchIndex::new()?);

    Ok(AppState {
        app: Arc::new(App::new(mirror)),
        auth: auth_client.clone(),
        admin: auth_client,
        api,
        sync,
        storage,
        search,
        config: Arc::new(config),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown requested");
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Client routes, each answering with its page model
    let page_routes = Router::new()
        .route("/", fixed(Destination::Home))
        .merge(api::category_routes())
        .route(
            "/place/{id}",
            keyed(|id| Destination::PlaceDetail {
                id: Some(id),
                main_category: None,
                slug: None,
            }),
        )
        .route("/events", fixed(Destination::Events))
        .route(
            "/evenement/{slug}",
            keyed(|slug| Destination::EventDetail {
                id: None,
                slug: Some(slug),
            }),
        )
        .route(
            "/event/{id}",
            keyed(|id| Destination::EventDetail {
                id: Some(id),
                slug: None,
            }),
        )
        .route("/sentiers", fixed(Destination::Trails))
        .route(
            "/sentier/{slug}",
            keyed(|slug| Destination::TrailDetail {
                id: None,
                slug: Some(slug),
            }),
        )
        .route(
            "/trail/{id}",
            keyed(|id| Destination::TrailDetail {
                id: Some(id),
                slug: None,
            }),
        )
        .route("/magazine", fixed(Destination::Magazine))
        .route(
            "/article/{key}",
            keyed(|key| Destination::ArticleDetail {
                id: Some(key.clone()),
                slug: Some(key),
            }),
        )
        .route("/annonces", fixed(Destination::Listings))
        .route("/mes-annonces", fixed(Destination::MyListings))
        .route(
            "/annonce/{key}",
            keyed(|key| Destination::ListingDetail {
                id: Some(key.clone()),
                slug: Some(key),
            }),
        )
        .route("/forums", fixed(Destination::Forums))
        .route(
            "/forum/category/{id}",
            keyed(|id| Destination::ForumCategory { id }),
        )
        .route("/forum/new-thread", get(api::new_thread_page))
        .route(
            "/forum/thread/{id}",
            keyed(|id| Destination::ForumThread {
                id: Some(id),
                slug: None,
            }),
        )
        .route(
            "/forum/{slug}",
            keyed(|slug| Destination::ForumThread {
                id: None,
                slug: Some(slug),
            }),
        )
        .route("/groupes", fixed(Destination::Groups))
        .route("/mes-groupes", fixed(Destination::MyGroups))
        .route("/nouveau-groupe", fixed(Destination::NewGroup))
        .route(
            "/groupe/{key}",
            keyed(|key| Destination::GroupDetail {
                id: Some(key.clone()),
                slug: Some(key),
            }),
        )
        .route("/membres", fixed(Destination::Members))
        .route("/conversations", fixed(Destination::Conversations))
        .route(
            "/conversation/{id}",
            keyed(|id| Destination::Conversation { id }),
        )
        .route(
            "/profil/{key}",
            keyed(|key| Destination::Profile {
                id: Some(key.clone()),
                slug: Some(key),
            }),
        )
        .route("/favoris", fixed(Destination::Favorites))
        .route("/dashboard", fixed(Destination::Dashboard))
        .route("/parametres", fixed(Destination::Settings))
        .route("/proposer", fixed(Destination::Propose { kind: None }))
        .route(
            "/proposer-lieu",
            fixed(Destination::Propose {
                kind: Some(ProposeKind::Lieu),
            }),
        )
        .route(
            "/proposer-evenement",
            fixed(Destination::Propose {
                kind: Some(ProposeKind::Evenement),
            }),
        )
        .route(
            "/proposer-sentier",
            fixed(Destination::Propose {
                kind: Some(ProposeKind::Sentier),
            }),
        )
        .route(
            "/proposer-annonce",
            fixed(Destination::Propose {
                kind: Some(ProposeKind::Annonce),
            }),
        )
        .route("/espace-pro", fixed(Destination::ProSpace { section: None }))
        .route("/espace-pro/{section}", get(api::pro_section_page))
        .route("/revendiquer-lieu", get(api::claim_place_page))
        .route("/campagnes-pub", fixed(Destination::AdCampaigns))
        .route("/admin", get(api::admin_page))
        .route("/recherche", get(api::search_page))
        .route("/page/{slug}", keyed(|slug| Destination::Static { slug }));

    // One endpoint per mutation handler
    let action_routes = Router::new()
        // Directory
        .route("/places", post(api::submit_place))
        .route("/places/{id}/reviews", post(api::add_review))
        .route("/places/{id}/favorite", post(api::toggle_favorite))
        .route("/places/{id}/claim", post(api::claim_place))
        .route("/events", post(api::submit_event))
        .route("/trails", post(api::submit_trail))
        .route("/live-events", post(api::post_live_event))
        .route("/live-events/{id}/vote", post(api::vote_live_event))
        // Community
        .route("/articles/{id}/comments", post(api::add_comment))
        .route("/listings", post(api::create_listing))
        .route("/listings/{id}", put(api::update_listing))
        .route("/listings/{id}", delete(api::delete_listing))
        .route("/threads", post(api::create_thread))
        .route("/threads/{id}/posts", post(api::add_forum_post))
        .route("/groups", post(api::create_group))
        .route("/groups/{id}/membership", post(api::toggle_group_membership))
        .route("/conversations", post(api::start_conversation))
        .route("/conversations/{id}/messages", post(api::send_message))
        .route("/profile", put(api::update_profile))
        // Business space
        .route("/organization", put(api::update_organization))
        .route("/products", post(api::add_product))
        .route("/products/{id}", put(api::update_product))
        .route("/products/{id}", delete(api::remove_product))
        .route("/services", post(api::add_service))
        .route("/services/{id}", put(api::update_service))
        .route("/services/{id}", delete(api::remove_service))
        .route("/orders", post(api::place_order))
        .route("/orders/{id}/status", put(api::update_order_status))
        .route("/bookings", post(api::create_booking))
        .route("/bookings/{id}/status", put(api::update_booking_status))
        // Reports and moderation
        .route("/reports/open", post(api::open_report))
        .route("/reports/close", post(api::close_report))
        .route("/reports", post(api::submit_report))
        .route("/reports/{id}/{decision}", put(api::decide_report))
        .route("/claims/{id}/{decision}", put(api::decide_claim))
        .route(
            "/moderation/{collection}/{id}/status",
            put(api::set_publication_status),
        )
        // Dialogs
        .route("/modals/{modal}", post(api::toggle_modal));

    // Session and admin pass-through
    let auth_routes = Router::new()
        .route("/session", get(api::get_session))
        .route("/sign-in", post(api::sign_in))
        .route("/sign-up", post(api::sign_up))
        .route("/sign-out", post(api::sign_out))
        .route("/admin/users", get(api::list_users))
        .route("/admin/users/{id}", delete(api::remove_user))
        .route("/admin/users/{id}/ban", post(api::ban_user))
        .route("/admin/users/{id}/unban", post(api::unban_user))
        .route("/admin/users/{id}/role", put(api::set_role))
        .route("/admin/users/{id}/sessions", get(api::list_user_sessions))
        .route("/admin/sessions/revoke", post(api::revoke_user_session));

    // Browser-side state
    let shell_routes = Router::new()
        .route("/health", get(health_check))
        .route("/navigate", post(api::navigate))
        .route("/location", get(api::get_location))
        .route("/consent", get(api::get_consent).post(api::set_consent))
        .route("/sync/{collection}", post(api::sync_collection));

    Router::new()
        .merge(page_routes)
        .nest("/actions", action_routes)
        .nest("/auth", auth_routes)
        .merge(shell_routes)
        .fallback(api::unknown_page)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
