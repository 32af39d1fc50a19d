//! Page models: what each client route renders, read from the mirror.
//!
//! Routes never mutate anything. A missing entity yields a `not-found`
//! page and a gated page yields `sign-in-required` or `forbidden`; neither
//! is an HTTP error.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, MethodRouter};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::handlers::App;
use crate::models::{
    Article, Booking, ClaimStatus, Conversation, Entity, Event, ForumThread, Group, Listing,
    LiveEvent, MainCategory, Order, Organization, Place, PlaceClaim, Product, Profile,
    PublicationStatus, Report, ReportStatus, Service, Trail,
};
use crate::navigation::{resolve, Destination, ProSection, ProposeKind};
use crate::search::{SearchHit, SearchKind};
use crate::store::CollectionStore;
use crate::AppState;

/// Entries per block on the home page.
const HOME_LIMIT: usize = 6;
const SEARCH_LIMIT: usize = 50;

/// A place the home map can pin.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub place_id: String,
    pub name: String,
    pub main_category: MainCategory,
    pub lat: f64,
    pub lng: f64,
    pub path: String,
}

/// A live event as displayed, with its computed standing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveEventView {
    #[serde(flatten)]
    pub event: Arc<LiveEvent>,
    pub score: i64,
    pub remaining_minutes: i64,
    pub freshness: f64,
}

/// The model of one rendered page.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "page", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Page {
    Home {
        featured_places: Vec<Arc<Place>>,
        upcoming_events: Vec<Arc<Event>>,
        markers: Vec<MapMarker>,
        live_events: Vec<LiveEventView>,
        latest_articles: Vec<Arc<Article>>,
    },
    CategoryList {
        main_category: MainCategory,
        sub_category: Option<String>,
        places: Vec<Arc<Place>>,
    },
    PlaceDetail {
        place: Arc<Place>,
        events: Vec<Arc<Event>>,
        live_events: Vec<LiveEventView>,
        is_favorite: bool,
        is_owner: bool,
    },
    Events {
        events: Vec<Arc<Event>>,
    },
    EventDetail {
        event: Arc<Event>,
        place: Option<Arc<Place>>,
    },
    Trails {
        trails: Vec<Arc<Trail>>,
    },
    TrailDetail {
        trail: Arc<Trail>,
    },
    Magazine {
        articles: Vec<Arc<Article>>,
    },
    ArticleDetail {
        article: Arc<Article>,
        author: Option<Arc<Profile>>,
    },
    Listings {
        listings: Vec<Arc<Listing>>,
    },
    MyListings {
        listings: Vec<Arc<Listing>>,
    },
    ListingDetail {
        listing: Arc<Listing>,
        seller: Option<Arc<Profile>>,
        is_owner: bool,
    },
    Forums {
        threads: Vec<Arc<ForumThread>>,
    },
    ForumCategory {
        category_id: String,
        threads: Vec<Arc<ForumThread>>,
    },
    ForumThread {
        thread: Arc<ForumThread>,
        can_reply: bool,
    },
    NewThread {
        category_id: Option<String>,
    },
    Groups {
        groups: Vec<Arc<Group>>,
    },
    MyGroups {
        groups: Vec<Arc<Group>>,
    },
    NewGroup,
    GroupDetail {
        group: Arc<Group>,
        is_member: bool,
    },
    Members {
        profiles: Vec<Arc<Profile>>,
    },
    Conversations {
        conversations: Vec<Arc<Conversation>>,
    },
    Conversation {
        conversation: Arc<Conversation>,
        participants: Vec<Arc<Profile>>,
    },
    Profile {
        profile: Arc<Profile>,
        listings: Vec<Arc<Listing>>,
        groups: Vec<Arc<Group>>,
        is_self: bool,
    },
    Favorites {
        places: Vec<Arc<Place>>,
    },
    Dashboard {
        profile: Profile,
        places: Vec<Arc<Place>>,
        listings: Vec<Arc<Listing>>,
        claims: Vec<Arc<PlaceClaim>>,
        orders: Vec<Arc<Order>>,
        bookings: Vec<Arc<Booking>>,
    },
    Settings {
        profile: Profile,
    },
    Propose {
        kind: Option<ProposeKind>,
    },
    ProSpace {
        section: Option<ProSection>,
        organization: Option<Arc<Organization>>,
        products: Vec<Arc<Product>>,
        services: Vec<Arc<Service>>,
        orders: Vec<Arc<Order>>,
        bookings: Vec<Arc<Booking>>,
    },
    ClaimPlace {
        place: Option<Arc<Place>>,
        open_claim: Option<Arc<PlaceClaim>>,
    },
    AdCampaigns {
        organization: Option<Arc<Organization>>,
    },
    Admin {
        tab: Option<String>,
        claims: Vec<Arc<PlaceClaim>>,
        reports: Vec<Arc<Report>>,
        pending_places: Vec<Arc<Place>>,
        pending_events: Vec<Arc<Event>>,
        pending_trails: Vec<Arc<Trail>>,
        pending_listings: Vec<Arc<Listing>>,
    },
    Search {
        query: String,
        filter: Option<SearchKind>,
        hits: Vec<SearchHit>,
    },
    Static {
        slug: String,
    },
    NotFound {
        path: String,
        home: String,
    },
    SignInRequired {
        return_to: String,
    },
    Forbidden {
        path: String,
    },
}

/// Render `destination` as the page model served at its path.
pub async fn show(state: &AppState, destination: Destination) -> ApiResult<Page> {
    let page = match destination {
        Destination::Search { query, filter } => {
            let query = query.unwrap_or_default();
            let filter = filter.as_deref().and_then(SearchKind::parse);
            let hits = if query.trim().is_empty() {
                Vec::new()
            } else {
                let mirror = state.app.mirror();
                if let Err(e) = state.search.refresh(mirror).await {
                    return error(e, mirror.revision());
                }
                match state.search.search(mirror, &query, filter, SEARCH_LIMIT) {
                    Ok(hits) => hits,
                    Err(e) => return error(e, mirror.revision()),
                }
            };
            Page::Search {
                query,
                filter,
                hits,
            }
        }
        other => build_page(&state.app, &other, Utc::now()),
    };

    success(page, state.app.mirror().revision())
}

/// Build a page model from the mirror and session. Search hits are filled
/// in by [`show`].
pub fn build_page(app: &App, destination: &Destination, now: DateTime<Utc>) -> Page {
    let mirror = app.mirror();
    let path = resolve(destination, mirror);
    let viewer = app.current_user();
    let not_found = || Page::NotFound {
        path: path.clone(),
        home: resolve(&Destination::Home, mirror),
    };
    let sign_in = || Page::SignInRequired {
        return_to: path.clone(),
    };

    match destination {
        Destination::Home => {
            let mut featured = mirror.places.filter(|p| is_published(p.status));
            featured.sort_by(|a, b| b.rating.total_cmp(&a.rating));
            featured.truncate(HOME_LIMIT);

            let mut upcoming = upcoming_events(mirror.events.filter(|e| is_published(e.status)), now);
            upcoming.truncate(HOME_LIMIT);

            let mut articles = mirror.articles.filter(|_| true);
            articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
            articles.truncate(HOME_LIMIT);

            Page::Home {
                featured_places: featured,
                upcoming_events: upcoming,
                markers: map_markers(app),
                live_events: live_events(&mirror.live_events, now, |_| true),
                latest_articles: articles,
            }
        }

        Destination::CategoryList {
            main_category,
            sub_category,
        } => {
            let sub = sub_category.as_deref().filter(|s| !s.is_empty());
            let places = mirror.places.filter(|p| {
                is_published(p.status)
                    && p.main_category == *main_category
                    && sub.map_or(true, |sub| p.category == sub)
            });
            Page::CategoryList {
                main_category: *main_category,
                sub_category: sub.map(str::to_string),
                places,
            }
        }

        Destination::PlaceDetail { id, slug, .. } => {
            let Some(place) = lookup(&mirror.places, id.as_deref(), slug.as_deref()) else {
                return not_found();
            };
            if !is_visible(place.status, viewer.as_ref(), place.owner_id.as_deref()) {
                return not_found();
            }
            let place_id = place.id.clone();
            let events = upcoming_events(
                mirror.events.filter(|e| {
                    is_published(e.status) && e.place_id.as_deref() == Some(place_id.as_str())
                }),
                now,
            );
            Page::PlaceDetail {
                events,
                live_events: live_events(&mirror.live_events, now, |e| {
                    e.place_id.as_deref() == Some(place_id.as_str())
                }),
                is_favorite: viewer.as_ref().is_some_and(|v| v.has_favorite(&place.id)),
                is_owner: viewer
                    .as_ref()
                    .is_some_and(|v| place.owner_id.as_deref() == Some(v.id.as_str())),
                place,
            }
        }

        Destination::Events => Page::Events {
            events: upcoming_events(mirror.events.filter(|e| is_published(e.status)), now),
        },

        Destination::EventDetail { id, slug } => {
            match lookup(&mirror.events, id.as_deref(), slug.as_deref())
                .filter(|e| is_visible(e.status, viewer.as_ref(), None))
            {
                Some(event) => Page::EventDetail {
                    place: event
                        .place_id
                        .as_deref()
                        .and_then(|id| mirror.places.get_by_id(id)),
                    event,
                },
                None => not_found(),
            }
        }

        Destination::Trails => Page::Trails {
            trails: mirror.trails.filter(|t| is_published(t.status)),
        },

        Destination::TrailDetail { id, slug } => {
            match lookup(&mirror.trails, id.as_deref(), slug.as_deref())
                .filter(|t| is_visible(t.status, viewer.as_ref(), None))
            {
                Some(trail) => Page::TrailDetail { trail },
                None => not_found(),
            }
        }

        Destination::Magazine => {
            let mut articles = mirror.articles.filter(|_| true);
            articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
            Page::Magazine { articles }
        }

        Destination::ArticleDetail { id, slug } => {
            match lookup(&mirror.articles, id.as_deref(), slug.as_deref()) {
                Some(article) => Page::ArticleDetail {
                    author: mirror.profiles.get_by_id(&article.author_id),
                    article,
                },
                None => not_found(),
            }
        }

        Destination::Listings => {
            let mut listings = mirror.listings.filter(|l| is_published(l.status));
            listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Page::Listings { listings }
        }

        Destination::MyListings => match &viewer {
            Some(user) => Page::MyListings {
                listings: mirror.listings.filter(|l| l.user_id == user.id),
            },
            None => sign_in(),
        },

        Destination::ListingDetail { id, slug } => {
            match lookup(&mirror.listings, id.as_deref(), slug.as_deref())
                .filter(|l| is_visible(l.status, viewer.as_ref(), Some(l.user_id.as_str())))
            {
                Some(listing) => Page::ListingDetail {
                    seller: mirror.profiles.get_by_id(&listing.user_id),
                    is_owner: viewer.as_ref().is_some_and(|v| v.id == listing.user_id),
                    listing,
                },
                None => not_found(),
            }
        }

        Destination::Forums => Page::Forums {
            threads: forum_order(mirror.threads.filter(|_| true)),
        },

        Destination::ForumCategory { id } => Page::ForumCategory {
            category_id: id.clone(),
            threads: forum_order(mirror.threads.filter(|t| t.category_id == *id)),
        },

        Destination::ForumThread { id, slug } => {
            match lookup(&mirror.threads, id.as_deref(), slug.as_deref()) {
                Some(thread) => Page::ForumThread {
                    can_reply: viewer.is_some() && !thread.is_locked,
                    thread,
                },
                None => not_found(),
            }
        }

        Destination::NewThread { category_id } => match viewer {
            Some(_) => Page::NewThread {
                category_id: category_id.clone(),
            },
            None => sign_in(),
        },

        Destination::Groups => Page::Groups {
            groups: mirror.groups.filter(|_| true),
        },

        Destination::MyGroups => match &viewer {
            Some(user) => Page::MyGroups {
                groups: mirror.groups.filter(|g| g.is_member(&user.id)),
            },
            None => sign_in(),
        },

        Destination::NewGroup => match viewer {
            Some(_) => Page::NewGroup,
            None => sign_in(),
        },

        Destination::GroupDetail { id, slug } => {
            match lookup(&mirror.groups, id.as_deref(), slug.as_deref()) {
                Some(group) => Page::GroupDetail {
                    is_member: viewer.as_ref().is_some_and(|v| group.is_member(&v.id)),
                    group,
                },
                None => not_found(),
            }
        }

        Destination::Members => {
            let mut profiles = mirror.profiles.filter(|_| true);
            profiles.sort_by(|a, b| a.full_name.cmp(&b.full_name));
            Page::Members { profiles }
        }

        Destination::Conversations => match &viewer {
            Some(user) => {
                let mut conversations = mirror.conversations.filter(|c| c.has_participant(&user.id));
                conversations.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
                Page::Conversations { conversations }
            }
            None => sign_in(),
        },

        Destination::Conversation { id } => {
            let Some(user) = &viewer else {
                return sign_in();
            };
            match mirror
                .conversations
                .get_by_id(id)
                .filter(|c| c.has_participant(&user.id))
            {
                Some(conversation) => Page::Conversation {
                    participants: conversation
                        .participant_ids
                        .iter()
                        .filter_map(|id| mirror.profiles.get_by_id(id))
                        .collect(),
                    conversation,
                },
                None => not_found(),
            }
        }

        Destination::Profile { id, slug } => {
            match lookup(&mirror.profiles, id.as_deref(), slug.as_deref()) {
                Some(profile) => Page::Profile {
                    listings: mirror
                        .listings
                        .filter(|l| l.user_id == profile.id && is_published(l.status)),
                    groups: mirror.groups.filter(|g| g.is_member(&profile.id)),
                    is_self: viewer.as_ref().is_some_and(|v| v.id == profile.id),
                    profile,
                },
                None => not_found(),
            }
        }

        Destination::Favorites => match &viewer {
            // Favorites keep the order they were added in.
            Some(user) => Page::Favorites {
                places: user
                    .favorite_place_ids
                    .iter()
                    .filter_map(|id| mirror.places.get_by_id(id))
                    .collect(),
            },
            None => sign_in(),
        },

        Destination::Dashboard => match viewer {
            Some(user) => Page::Dashboard {
                places: mirror
                    .places
                    .filter(|p| p.owner_id.as_deref() == Some(user.id.as_str())),
                listings: mirror.listings.filter(|l| l.user_id == user.id),
                claims: mirror.claims.filter(|c| c.user_id == user.id),
                orders: mirror.orders.filter(|o| o.user_id == user.id),
                bookings: mirror.bookings.filter(|b| b.user_id == user.id),
                profile: user,
            },
            None => sign_in(),
        },

        Destination::Settings => match viewer {
            Some(profile) => Page::Settings { profile },
            None => sign_in(),
        },

        Destination::Propose { kind } => match viewer {
            Some(_) => Page::Propose { kind: *kind },
            None => sign_in(),
        },

        Destination::ProSpace { section } => {
            if viewer.is_none() {
                return sign_in();
            }
            let organization = app.owned_organization();
            let org_id = organization.as_ref().map(|o| o.id.clone()).unwrap_or_default();
            let owns = |id: &str| !org_id.is_empty() && id == org_id;
            Page::ProSpace {
                section: *section,
                products: mirror.products.filter(|p| owns(&p.organization_id)),
                services: mirror.services.filter(|s| owns(&s.organization_id)),
                orders: mirror.orders.filter(|o| owns(&o.organization_id)),
                bookings: mirror.bookings.filter(|b| owns(&b.organization_id)),
                organization,
            }
        }

        Destination::ClaimPlace { place_id } => {
            let Some(user) = &viewer else {
                return sign_in();
            };
            let place = place_id
                .as_deref()
                .and_then(|id| mirror.places.get_by_id(id));
            let open_claim = place.as_ref().and_then(|place| {
                mirror.claims.find(|c| {
                    c.place_id == place.id
                        && c.user_id == user.id
                        && c.status == ClaimStatus::Pending
                })
            });
            Page::ClaimPlace { place, open_claim }
        }

        Destination::AdCampaigns => match viewer {
            Some(_) => Page::AdCampaigns {
                organization: app.owned_organization(),
            },
            None => sign_in(),
        },

        Destination::Admin { tab } => match &viewer {
            None => sign_in(),
            Some(user) if !user.role.can_moderate() => Page::Forbidden { path: path.clone() },
            Some(_) => Page::Admin {
                tab: tab.clone(),
                claims: mirror.claims.filter(|c| c.status == ClaimStatus::Pending),
                reports: mirror.reports.filter(|r| r.status == ReportStatus::Pending),
                pending_places: mirror.places.filter(|p| is_pending(p.status)),
                pending_events: mirror.events.filter(|e| is_pending(e.status)),
                pending_trails: mirror.trails.filter(|t| is_pending(t.status)),
                pending_listings: mirror.listings.filter(|l| is_pending(l.status)),
            },
        },

        Destination::Search { query, filter } => Page::Search {
            query: query.clone().unwrap_or_default(),
            filter: filter.as_deref().and_then(SearchKind::parse),
            hits: Vec::new(),
        },

        Destination::Static { slug } => Page::Static { slug: slug.clone() },
    }
}

fn is_published(status: PublicationStatus) -> bool {
    status == PublicationStatus::Published
}

fn is_pending(status: PublicationStatus) -> bool {
    status == PublicationStatus::Pending
}

/// Unpublished content is shown to its owner and to moderators only.
fn is_visible(status: PublicationStatus, viewer: Option<&Profile>, owner: Option<&str>) -> bool {
    is_published(status)
        || viewer.is_some_and(|v| v.role.can_moderate() || owner == Some(v.id.as_str()))
}

/// Detail lookup: slug first, then id.
fn lookup<T: Entity>(
    store: &CollectionStore<T>,
    id: Option<&str>,
    slug: Option<&str>,
) -> Option<Arc<T>> {
    slug.filter(|s| !s.is_empty())
        .and_then(|slug| store.get_by_key(slug))
        .or_else(|| id.filter(|i| !i.is_empty()).and_then(|id| store.get_by_id(id)))
}

/// Events not yet over, soonest first.
fn upcoming_events(mut events: Vec<Arc<Event>>, now: DateTime<Utc>) -> Vec<Arc<Event>> {
    let today = now.format("%Y-%m-%d").to_string();
    events.retain(|e| {
        let last_day = if e.end_date.is_empty() { &e.start_date } else { &e.end_date };
        !last_day.is_empty() && last_day.as_str() >= today.as_str()
    });
    events.sort_by(|a, b| a.start_date.cmp(&b.start_date));
    events
}

/// Pinned threads first, then newest first.
fn forum_order(mut threads: Vec<Arc<ForumThread>>) -> Vec<Arc<ForumThread>> {
    threads.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    threads
}

fn map_markers(app: &App) -> Vec<MapMarker> {
    let mirror = app.mirror();
    mirror
        .places
        .filter(|p| is_published(p.status))
        .into_iter()
        .filter_map(|place| {
            let coordinates = place.coordinates.filter(|c| c.is_valid_marker())?;
            Some(MapMarker {
                path: resolve(&Destination::place(&place.id), mirror),
                place_id: place.id.clone(),
                name: place.name.clone(),
                main_category: place.main_category,
                lat: coordinates.lat,
                lng: coordinates.lng,
            })
        })
        .collect()
}

/// Unexpired live events, best score first, then most recent.
fn live_events<F>(store: &CollectionStore<LiveEvent>, now: DateTime<Utc>, keep: F) -> Vec<LiveEventView>
where
    F: Fn(&LiveEvent) -> bool,
{
    let mut views: Vec<LiveEventView> = store
        .filter(|e| !e.is_expired(now) && keep(e))
        .into_iter()
        .map(|event| LiveEventView {
            score: event.score(),
            remaining_minutes: event.remaining_minutes(now),
            freshness: event.freshness(now),
            event,
        })
        .collect();
    views.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.event.created_at.cmp(&a.event.created_at))
    });
    views
}

// ==================== ROUTES ====================

/// Route serving a page that takes no parameters.
pub fn fixed(destination: Destination) -> MethodRouter<AppState> {
    get(move |State(state): State<AppState>| async move { show(&state, destination).await })
}

/// Route serving a page keyed by one path parameter.
pub fn keyed<F>(make: F) -> MethodRouter<AppState>
where
    F: Fn(String) -> Destination + Clone + Send + Sync + 'static,
{
    get(
        move |State(state): State<AppState>, Path(key): Path<String>| async move {
            show(&state, make(key)).await
        },
    )
}

/// Listing and detail routes of the four place categories.
pub fn category_routes() -> Router<AppState> {
    MainCategory::ALL
        .into_iter()
        .fold(Router::new(), |router, category| {
            router
                .route(
                    &format!("/{}", category.list_segment()),
                    fixed(Destination::CategoryList {
                        main_category: category,
                        sub_category: None,
                    }),
                )
                .route(
                    &format!("/{}/{{sub}}", category.list_segment()),
                    keyed(move |sub| Destination::CategoryList {
                        main_category: category,
                        sub_category: Some(sub),
                    }),
                )
                .route(
                    &format!("/{}/{{slug}}", category.detail_segment()),
                    keyed(move |slug| Destination::PlaceDetail {
                        id: None,
                        main_category: Some(category),
                        slug: Some(slug),
                    }),
                )
        })
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
}

/// GET /recherche
pub async fn search_page(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Page> {
    show(
        &state,
        Destination::Search {
            query: params.q,
            filter: params.filter,
        },
    )
    .await
}

#[derive(Debug, Deserialize)]
pub struct AdminParams {
    #[serde(default)]
    pub tab: Option<String>,
}

/// GET /admin
pub async fn admin_page(
    State(state): State<AppState>,
    Query(params): Query<AdminParams>,
) -> ApiResult<Page> {
    show(&state, Destination::Admin { tab: params.tab }).await
}

#[derive(Debug, Deserialize)]
pub struct NewThreadParams {
    #[serde(default)]
    pub category: Option<String>,
}

/// GET /forum/new-thread
pub async fn new_thread_page(
    State(state): State<AppState>,
    Query(params): Query<NewThreadParams>,
) -> ApiResult<Page> {
    show(
        &state,
        Destination::NewThread {
            category_id: params.category,
        },
    )
    .await
}

#[derive(Debug, Deserialize)]
pub struct ClaimParams {
    #[serde(default)]
    pub place: Option<String>,
}

/// GET /revendiquer-lieu
pub async fn claim_place_page(
    State(state): State<AppState>,
    Query(params): Query<ClaimParams>,
) -> ApiResult<Page> {
    show(
        &state,
        Destination::ClaimPlace {
            place_id: params.place,
        },
    )
    .await
}

/// GET /espace-pro/{section}
pub async fn pro_section_page(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> ApiResult<Page> {
    match ProSection::parse(&section) {
        Some(section) => show(
            &state,
            Destination::ProSpace {
                section: Some(section),
            },
        )
        .await,
        None => success(
            Page::NotFound {
                path: format!("/espace-pro/{}", section),
                home: "/".to_string(),
            },
            state.app.mirror().revision(),
        ),
    }
}

/// Any path outside the route table.
pub async fn unknown_page(
    State(state): State<AppState>,
    uri: axum::http::Uri,
) -> ApiResult<Page> {
    success(
        Page::NotFound {
            path: uri.path().to_string(),
            home: "/".to_string(),
        },
        state.app.mirror().revision(),
    )
}
