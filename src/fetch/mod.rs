//! REST API client and per-collection fetch resources.
//!
//! A [`Resource`] is the equivalent of a data-fetch hook: it tracks
//! `loading`/`error`/`data` for one collection and can be refetched. It never
//! retries on its own.

use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;

use crate::errors::AppError;

/// A backend collection exposed as `GET /api/{name}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Places,
    Events,
    Trails,
    Articles,
    Listings,
    Profiles,
    ForumThreads,
    Groups,
    Conversations,
    Organizations,
    Products,
    Services,
    Orders,
    Bookings,
    Claims,
    Reports,
    LiveEvents,
}

impl Collection {
    pub const ALL: [Collection; 17] = [
        Collection::Places,
        Collection::Events,
        Collection::Trails,
        Collection::Articles,
        Collection::Listings,
        Collection::Profiles,
        Collection::ForumThreads,
        Collection::Groups,
        Collection::Conversations,
        Collection::Organizations,
        Collection::Products,
        Collection::Services,
        Collection::Orders,
        Collection::Bookings,
        Collection::Claims,
        Collection::Reports,
        Collection::LiveEvents,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Places => "places",
            Collection::Events => "events",
            Collection::Trails => "trails",
            Collection::Articles => "articles",
            Collection::Listings => "listings",
            Collection::Profiles => "profiles",
            Collection::ForumThreads => "forum-threads",
            Collection::Groups => "groups",
            Collection::Conversations => "conversations",
            Collection::Organizations => "organizations",
            Collection::Products => "products",
            Collection::Services => "services",
            Collection::Orders => "orders",
            Collection::Bookings => "bookings",
            Collection::Claims => "claims",
            Collection::Reports => "reports",
            Collection::LiveEvents => "live-events",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn endpoint(&self) -> String {
        format!("/api/{}", self.name())
    }

    /// Whether the endpoint only answers for a signed-in session.
    pub fn requires_session(&self) -> bool {
        matches!(
            self,
            Collection::Conversations
                | Collection::Orders
                | Collection::Bookings
                | Collection::Claims
                | Collection::Reports
        )
    }
}

/// HTTP client for the REST API.
///
/// The underlying `reqwest::Client` keeps a cookie store, so once the auth
/// service sets its session cookie every credentialed endpoint receives it.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(http, base_url))
    }

    /// Reuse an existing client (and its cookie store).
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {base}{path}` decoded as JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::upstream_status(path, resp.status()));
        }

        Ok(resp.json::<T>().await?)
    }

    pub async fn fetch_collection<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<T>, AppError> {
        self.get_json(&collection.endpoint()).await
    }
}

/// Observable state of one fetch resource.
#[derive(Debug)]
pub struct FetchState<T> {
    pub data: Option<Arc<Vec<T>>>,
    pub loading: bool,
    pub error: Option<String>,
    /// Count of successful fetches; 0 until the first one lands.
    pub generation: u64,
}

impl<T> Clone for FetchState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            loading: self.loading,
            error: self.error.clone(),
            generation: self.generation,
        }
    }
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            generation: 0,
        }
    }
}

/// Fetch-and-track for one collection.
pub struct Resource<T> {
    collection: Collection,
    client: ApiClient,
    state: RwLock<FetchState<T>>,
}

impl<T: DeserializeOwned> Resource<T> {
    pub fn new(client: ApiClient, collection: Collection) -> Self {
        Self {
            collection,
            client,
            state: RwLock::new(FetchState::default()),
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn state(&self) -> FetchState<T> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fetch the collection once. Previous data stays visible while loading
    /// and after a failure.
    pub async fn refetch(&self) -> FetchState<T> {
        self.modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let result = self.client.fetch_collection::<T>(self.collection).await;

        self.modify(|state| {
            state.loading = false;
            match result {
                Ok(items) => {
                    state.data = Some(Arc::new(items));
                    state.generation += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        collection = self.collection.name(),
                        "Fetch failed: {}",
                        e
                    );
                    state.error = Some(e.message());
                }
            }
            state.clone()
        })
    }

    fn modify<R>(&self, f: impl FnOnce(&mut FetchState<T>) -> R) -> R {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
