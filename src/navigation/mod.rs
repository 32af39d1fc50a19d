//! Typed navigation: every navigable page as one enum, resolved to a URL path.
//!
//! Entity pages prefer a human-readable slug path. When only an id is known,
//! the slug is looked up in the mirror; when that fails too, the legacy id
//! path is used and the destination page renders "not found" if need be.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::models::{Entity, MainCategory};
use crate::store::{CollectionStore, Mirror};

/// Submission form reachable under `/proposer*`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProposeKind {
    Lieu,
    Evenement,
    Sentier,
    Annonce,
}

/// Section of the business space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProSection {
    Produits,
    Services,
    Commandes,
    Reservations,
    Organisation,
}

impl ProSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProSection::Produits => "produits",
            ProSection::Services => "services",
            ProSection::Commandes => "commandes",
            ProSection::Reservations => "reservations",
            ProSection::Organisation => "organisation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "produits" => Some(ProSection::Produits),
            "services" => Some(ProSection::Services),
            "commandes" => Some(ProSection::Commandes),
            "reservations" => Some(ProSection::Reservations),
            "organisation" => Some(ProSection::Organisation),
            _ => None,
        }
    }
}

/// Every page the application can navigate to, with the parameters it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "page", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Destination {
    Home,
    CategoryList {
        main_category: MainCategory,
        sub_category: Option<String>,
    },
    PlaceDetail {
        id: Option<String>,
        main_category: Option<MainCategory>,
        slug: Option<String>,
    },
    Events,
    EventDetail {
        id: Option<String>,
        slug: Option<String>,
    },
    Trails,
    TrailDetail {
        id: Option<String>,
        slug: Option<String>,
    },
    Magazine,
    ArticleDetail {
        id: Option<String>,
        slug: Option<String>,
    },
    Listings,
    MyListings,
    ListingDetail {
        id: Option<String>,
        slug: Option<String>,
    },
    Forums,
    ForumCategory {
        id: String,
    },
    ForumThread {
        id: Option<String>,
        slug: Option<String>,
    },
    NewThread {
        category_id: Option<String>,
    },
    Groups,
    MyGroups,
    NewGroup,
    GroupDetail {
        id: Option<String>,
        slug: Option<String>,
    },
    Members,
    Conversations,
    Conversation {
        id: String,
    },
    Profile {
        id: Option<String>,
        slug: Option<String>,
    },
    Favorites,
    Dashboard,
    Settings,
    Propose {
        kind: Option<ProposeKind>,
    },
    ProSpace {
        section: Option<ProSection>,
    },
    ClaimPlace {
        place_id: Option<String>,
    },
    AdCampaigns,
    Admin {
        tab: Option<String>,
    },
    Search {
        query: Option<String>,
        filter: Option<String>,
    },
    Static {
        slug: String,
    },
}

impl Destination {
    /// Decode a destination sent as JSON. Unknown or malformed tokens go home.
    pub fn from_json(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::debug!("Unrecognized destination, falling back to home: {}", e);
            Destination::Home
        })
    }

    pub fn place(id: &str) -> Self {
        Destination::PlaceDetail {
            id: Some(id.to_string()),
            main_category: None,
            slug: None,
        }
    }

    pub fn listing(id: &str) -> Self {
        Destination::ListingDetail {
            id: Some(id.to_string()),
            slug: None,
        }
    }

    pub fn thread(id: &str) -> Self {
        Destination::ForumThread {
            id: Some(id.to_string()),
            slug: None,
        }
    }

    pub fn group(id: &str) -> Self {
        Destination::GroupDetail {
            id: Some(id.to_string()),
            slug: None,
        }
    }

    pub fn conversation(id: &str) -> Self {
        Destination::Conversation { id: id.to_string() }
    }
}

/// Resolve a destination to the path it is served at.
pub fn resolve(destination: &Destination, mirror: &Mirror) -> String {
    match destination {
        Destination::Home => "/".to_string(),
        Destination::CategoryList {
            main_category,
            sub_category,
        } => match sub_category.as_deref().filter(|s| !s.is_empty()) {
            Some(sub) => format!("/{}/{}", main_category.list_segment(), segment(sub)),
            None => format!("/{}", main_category.list_segment()),
        },
        Destination::PlaceDetail {
            id,
            main_category,
            slug,
        } => resolve_place(mirror, id.as_deref(), *main_category, slug.as_deref()),
        Destination::Events => "/events".to_string(),
        Destination::EventDetail { id, slug } => slugged(
            &mirror.events,
            id.as_deref(),
            slug.as_deref(),
            "/evenement",
            "/event",
        ),
        Destination::Trails => "/sentiers".to_string(),
        Destination::TrailDetail { id, slug } => slugged(
            &mirror.trails,
            id.as_deref(),
            slug.as_deref(),
            "/sentier",
            "/trail",
        ),
        Destination::Magazine => "/magazine".to_string(),
        Destination::ArticleDetail { id, slug } => slugged(
            &mirror.articles,
            id.as_deref(),
            slug.as_deref(),
            "/article",
            "/article",
        ),
        Destination::Listings => "/annonces".to_string(),
        Destination::MyListings => "/mes-annonces".to_string(),
        Destination::ListingDetail { id, slug } => slugged(
            &mirror.listings,
            id.as_deref(),
            slug.as_deref(),
            "/annonce",
            "/annonce",
        ),
        Destination::Forums => "/forums".to_string(),
        Destination::ForumCategory { id } => format!("/forum/category/{}", segment(id)),
        Destination::ForumThread { id, slug } => slugged(
            &mirror.threads,
            id.as_deref(),
            slug.as_deref(),
            "/forum",
            "/forum/thread",
        ),
        Destination::NewThread { category_id } => {
            with_query("/forum/new-thread", &[("category", category_id.as_deref())])
        }
        Destination::Groups => "/groupes".to_string(),
        Destination::MyGroups => "/mes-groupes".to_string(),
        Destination::NewGroup => "/nouveau-groupe".to_string(),
        Destination::GroupDetail { id, slug } => slugged(
            &mirror.groups,
            id.as_deref(),
            slug.as_deref(),
            "/groupe",
            "/groupe",
        ),
        Destination::Members => "/membres".to_string(),
        Destination::Conversations => "/conversations".to_string(),
        Destination::Conversation { id } => format!("/conversation/{}", segment(id)),
        Destination::Profile { id, slug } => slugged(
            &mirror.profiles,
            id.as_deref(),
            slug.as_deref(),
            "/profil",
            "/profil",
        ),
        Destination::Favorites => "/favoris".to_string(),
        Destination::Dashboard => "/dashboard".to_string(),
        Destination::Settings => "/parametres".to_string(),
        Destination::Propose { kind } => match kind {
            None => "/proposer",
            Some(ProposeKind::Lieu) => "/proposer-lieu",
            Some(ProposeKind::Evenement) => "/proposer-evenement",
            Some(ProposeKind::Sentier) => "/proposer-sentier",
            Some(ProposeKind::Annonce) => "/proposer-annonce",
        }
        .to_string(),
        Destination::ProSpace { section } => match section {
            Some(section) => format!("/espace-pro/{}", section.as_str()),
            None => "/espace-pro".to_string(),
        },
        Destination::ClaimPlace { place_id } => {
            with_query("/revendiquer-lieu", &[("place", place_id.as_deref())])
        }
        Destination::AdCampaigns => "/campagnes-pub".to_string(),
        Destination::Admin { tab } => with_query("/admin", &[("tab", tab.as_deref())]),
        Destination::Search { query, filter } => with_query(
            "/recherche",
            &[("q", query.as_deref()), ("filter", filter.as_deref())],
        ),
        Destination::Static { slug } => format!("/page/{}", segment(slug)),
    }
}

/// Place pages: category segment + slug, with the mirror filling the gaps,
/// and `/place/{id}` as the last resort.
fn resolve_place(
    mirror: &Mirror,
    id: Option<&str>,
    main_category: Option<MainCategory>,
    slug: Option<&str>,
) -> String {
    let slug = slug.filter(|s| !s.is_empty());

    if let (Some(slug), Some(category)) = (slug, main_category) {
        return format!("/{}/{}", category.detail_segment(), segment(slug));
    }

    let entry = id
        .filter(|id| !id.is_empty())
        .and_then(|id| mirror.places.get_by_id(id))
        .or_else(|| slug.and_then(|slug| mirror.places.get_by_slug(slug)));

    if let Some(place) = entry {
        let category = main_category.unwrap_or(place.main_category);
        if let Some(slug) = slug.or_else(|| place.slug()) {
            return format!("/{}/{}", category.detail_segment(), segment(slug));
        }
    }

    format!("/place/{}", segment(id.unwrap_or_default()))
}

/// Other entity pages: slug path, else the mirror's slug for the id, else the id path.
fn slugged<T: Entity>(
    store: &CollectionStore<T>,
    id: Option<&str>,
    slug: Option<&str>,
    slug_prefix: &str,
    id_prefix: &str,
) -> String {
    if let Some(slug) = slug.filter(|s| !s.is_empty()) {
        return format!("{}/{}", slug_prefix, segment(slug));
    }

    let id = id.unwrap_or_default();
    let known_slug = if id.is_empty() {
        None
    } else {
        store
            .get_by_id(id)
            .and_then(|item| item.slug().map(str::to_string))
    };

    match known_slug {
        Some(slug) => format!("{}/{}", slug_prefix, segment(&slug)),
        None => format!("{}/{}", id_prefix, segment(id)),
    }
}

/// Percent-encode one path segment.
fn segment(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn with_query(path: &str, params: &[(&str, Option<&str>)]) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in params {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            query.append_pair(key, value);
            any = true;
        }
    }

    if any {
        format!("{}?{}", path, query.finish())
    } else {
        path.to_string()
    }
}

/// Entries kept in the history; older ones are dropped first.
pub const MAX_HISTORY: usize = 100;

/// The session's history stack.
#[derive(Debug)]
struct HistoryState {
    entries: Vec<String>,
    scroll_resets: u64,
}

/// Client-side history: pushes never reload, each one resets the scroll.
#[derive(Debug)]
pub struct Navigator {
    state: Mutex<HistoryState>,
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HistoryState {
                entries: vec!["/".to_string()],
                scroll_resets: 0,
            }),
        }
    }

    pub fn push(&self, path: String) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(from = ?state.entries.last(), to = %path, "Navigate");
        state.entries.push(path);
        if state.entries.len() > MAX_HISTORY {
            let excess = state.entries.len() - MAX_HISTORY;
            state.entries.drain(..excess);
        }
        state.scroll_resets += 1;
    }

    pub fn location(&self) -> String {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.last().cloned().unwrap_or_else(|| "/".to_string())
    }

    pub fn entries(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone()
    }

    /// How many times the viewport was sent back to the top.
    pub fn scroll_resets(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .scroll_resets
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}
