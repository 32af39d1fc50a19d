//! Binding of fetch resources to mirror stores.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::task::JoinSet;

use super::{CollectionStore, Mirror, SyncOutcome};
use crate::fetch::{ApiClient, Collection, FetchState, Resource};
use crate::models::Entity;

/// Tracks which fetch result a store has already absorbed.
#[derive(Debug, Default)]
pub struct CollectionBinding {
    last_generation: u64,
}

impl CollectionBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `state` to `store` if it carries a result not applied yet.
    pub fn observe<T: Entity>(
        &mut self,
        state: &FetchState<T>,
        store: &CollectionStore<T>,
    ) -> Option<SyncOutcome> {
        if state.generation <= self.last_generation {
            return None;
        }
        let data = state.data.as_ref()?;
        self.last_generation = state.generation;
        Some(store.apply_fetched(data.as_ref().clone()))
    }
}

/// One collection's resource bound to its mirror store.
#[async_trait]
pub trait BoundCollection: Send + Sync {
    fn collection(&self) -> Collection;

    /// Fetch once and fold a new result into the mirror.
    async fn refresh(&self, mirror: &Mirror) -> Option<SyncOutcome>;
}

struct Binding<T> {
    resource: Resource<T>,
    binding: Mutex<CollectionBinding>,
    select: fn(&Mirror) -> &CollectionStore<T>,
}

#[async_trait]
impl<T> BoundCollection for Binding<T>
where
    T: Entity + DeserializeOwned,
{
    fn collection(&self) -> Collection {
        self.resource.collection()
    }

    async fn refresh(&self, mirror: &Mirror) -> Option<SyncOutcome> {
        let state = self.resource.refetch().await;
        let store = (self.select)(mirror);
        let outcome = self
            .binding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observe(&state, store);

        if let Some(outcome) = outcome {
            tracing::debug!(
                collection = store.name(),
                received = outcome.received,
                kept_local = outcome.kept_local,
                "Mirror synced"
            );
        }
        outcome
    }
}

fn bind<T>(
    client: &ApiClient,
    collection: Collection,
    select: fn(&Mirror) -> &CollectionStore<T>,
) -> Arc<dyn BoundCollection>
where
    T: Entity + DeserializeOwned,
{
    Arc::new(Binding {
        resource: Resource::new(client.clone(), collection),
        binding: Mutex::new(CollectionBinding::new()),
        select,
    })
}

const IDLE_POLL: Duration = Duration::from_millis(10);

/// All seventeen bindings plus the tasks currently fetching.
pub struct MirrorSync {
    mirror: Arc<Mirror>,
    bindings: HashMap<Collection, Arc<dyn BoundCollection>>,
    tasks: Mutex<JoinSet<()>>,
    closed: AtomicBool,
}

impl MirrorSync {
    pub fn new(client: &ApiClient, mirror: Arc<Mirror>) -> Self {
        let list = [
            bind(client, Collection::Places, |m| &m.places),
            bind(client, Collection::Events, |m| &m.events),
            bind(client, Collection::Trails, |m| &m.trails),
            bind(client, Collection::Articles, |m| &m.articles),
            bind(client, Collection::Listings, |m| &m.listings),
            bind(client, Collection::Profiles, |m| &m.profiles),
            bind(client, Collection::ForumThreads, |m| &m.threads),
            bind(client, Collection::Groups, |m| &m.groups),
            bind(client, Collection::Conversations, |m| &m.conversations),
            bind(client, Collection::Organizations, |m| &m.organizations),
            bind(client, Collection::Products, |m| &m.products),
            bind(client, Collection::Services, |m| &m.services),
            bind(client, Collection::Orders, |m| &m.orders),
            bind(client, Collection::Bookings, |m| &m.bookings),
            bind(client, Collection::Claims, |m| &m.claims),
            bind(client, Collection::Reports, |m| &m.reports),
            bind(client, Collection::LiveEvents, |m| &m.live_events),
        ];

        Self {
            mirror,
            bindings: list.into_iter().map(|b| (b.collection(), b)).collect(),
            tasks: Mutex::new(JoinSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Start one fetch per collection. They complete in any order.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_all(&self) {
        for collection in Collection::ALL {
            self.spawn(collection);
        }
    }

    /// Start a background refetch of one collection. No-op after `shutdown`.
    pub fn spawn(&self, collection: Collection) {
        if self.closed.load(Ordering::Acquire) {
            tracing::debug!(collection = collection.name(), "Ignored fetch after shutdown");
            return;
        }
        let Some(binding) = self.bindings.get(&collection).cloned() else {
            return;
        };
        let mirror = self.mirror.clone();
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .spawn(async move {
                binding.refresh(&mirror).await;
            });
    }

    /// Refetch one collection and wait for the result.
    pub async fn refresh(&self, collection: Collection) -> Option<SyncOutcome> {
        let binding = self.bindings.get(&collection)?.clone();
        binding.refresh(&self.mirror).await
    }

    /// Wait for every spawned fetch to finish or be aborted.
    ///
    /// The tasks stay in the set while waiting, so `shutdown` still reaches them.
    pub async fn wait_idle(&self) {
        loop {
            let next = {
                let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
                if tasks.is_empty() {
                    return;
                }
                tasks.try_join_next()
            };
            match next {
                Some(Err(e)) if e.is_cancelled() => {}
                Some(Err(e)) => tracing::warn!("Collection fetch task failed: {}", e),
                Some(Ok(())) => {}
                None => tokio::time::sleep(IDLE_POLL).await,
            }
        }
    }

    /// Abort in-flight fetches so late responses never reach the mirror.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
    }
}
