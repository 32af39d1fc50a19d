//! In-memory mirror of the backend collections.
//!
//! Each collection lives in a [`CollectionStore`] that hands out immutable
//! snapshots. A mutation never edits a record in place: it builds a new
//! snapshot in which untouched records are the same `Arc`s as before.

mod sync;

pub use sync::*;

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::models::{
    Article, Booking, Conversation, Entity, Event, ForumThread, Group, Listing, LiveEvent, Order,
    Organization, Place, PlaceClaim, Product, Profile, Report, Service, Trail,
};

/// Immutable view of a collection at one point in time.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

struct StoreState<T> {
    items: Snapshot<T>,
    /// Ids changed locally and not yet seen in a fetch since.
    pending: HashSet<String>,
    synced: bool,
    revision: u64,
}

/// Single source of truth for one collection.
pub struct CollectionStore<T> {
    name: &'static str,
    state: RwLock<StoreState<T>>,
}

impl<T: Entity> CollectionStore<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RwLock::new(StoreState {
                items: Arc::new(Vec::new()),
                pending: HashSet::new(),
                synced: false,
                revision: 0,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current snapshot. Cheap: clones one `Arc`.
    pub fn snapshot(&self) -> Snapshot<T> {
        self.read(|state| state.items.clone())
    }

    pub fn len(&self) -> usize {
        self.read(|state| state.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a fetch result has been applied at least once.
    pub fn is_synced(&self) -> bool {
        self.read(|state| state.synced)
    }

    /// Number of snapshots produced so far.
    pub fn revision(&self) -> u64 {
        self.read(|state| state.revision)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.read(|state| state.pending.contains(id))
    }

    pub fn get_by_id(&self, id: &str) -> Option<Arc<T>> {
        self.find(|item| item.id() == id)
    }

    pub fn get_by_slug(&self, slug: &str) -> Option<Arc<T>> {
        self.find(|item| item.slug() == Some(slug))
    }

    /// Look up by slug first, then by id. Detail routes accept either.
    pub fn get_by_key(&self, key: &str) -> Option<Arc<T>> {
        let items = self.snapshot();
        items
            .iter()
            .find(|item| item.slug() == Some(key))
            .or_else(|| items.iter().find(|item| item.id() == key))
            .cloned()
    }

    pub fn find<F>(&self, predicate: F) -> Option<Arc<T>>
    where
        F: Fn(&T) -> bool,
    {
        self.snapshot()
            .iter()
            .find(|item| predicate(item))
            .cloned()
    }

    pub fn filter<F>(&self, predicate: F) -> Vec<Arc<T>>
    where
        F: Fn(&T) -> bool,
    {
        self.snapshot()
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }

    /// Append a locally created record.
    pub fn append(&self, item: T) -> Arc<T> {
        let item = Arc::new(item);
        let id = item.id().to_string();
        let added = item.clone();
        self.write(|state| {
            let next: Vec<Arc<T>> = state.items.iter().cloned().chain([added]).collect();
            state.items = Arc::new(next);
            state.pending.insert(id);
            state.revision += 1;
        });
        item
    }

    /// Return the first record matching `predicate`, or append `make()`.
    ///
    /// Lookup and append happen under one write lock, so two callers racing
    /// on the same predicate append once. The flag is true when appended.
    pub fn find_or_append<P, F>(&self, predicate: P, make: F) -> (Arc<T>, bool)
    where
        P: Fn(&T) -> bool,
        F: FnOnce() -> T,
    {
        self.write(|state| {
            if let Some(existing) = state.items.iter().find(|item| predicate(item)) {
                return (existing.clone(), false);
            }
            let item = Arc::new(make());
            let next: Vec<Arc<T>> = state.items.iter().cloned().chain([item.clone()]).collect();
            state.items = Arc::new(next);
            state.pending.insert(item.id().to_string());
            state.revision += 1;
            (item, true)
        })
    }

    /// Replace the record `id` with `f(record)`.
    ///
    /// Returns the new record, or `None` when `id` is absent (nothing changes).
    pub fn update<F>(&self, id: &str, f: F) -> Option<Arc<T>>
    where
        F: FnOnce(&T) -> T,
    {
        self.write(|state| {
            let index = state.items.iter().position(|item| item.id() == id)?;
            let replacement = Arc::new(f(&state.items[index]));
            let next: Vec<Arc<T>> = state
                .items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    if i == index {
                        replacement.clone()
                    } else {
                        item.clone()
                    }
                })
                .collect();
            state.items = Arc::new(next);
            state.pending.insert(id.to_string());
            state.revision += 1;
            Some(replacement)
        })
    }

    /// Drop the record `id`. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.write(|state| {
            if !state.items.iter().any(|item| item.id() == id) {
                return false;
            }
            let next: Vec<Arc<T>> = state
                .items
                .iter()
                .filter(|item| item.id() != id)
                .cloned()
                .collect();
            state.items = Arc::new(next);
            state.pending.remove(id);
            state.revision += 1;
            true
        })
    }

    /// Apply a fetched server collection.
    ///
    /// The first sync of a store without local changes replaces it wholesale.
    /// Later results are merged by id: server records win unless the id has a
    /// local change pending, and pending records the server does not know yet
    /// are kept after the server records.
    ///
    /// A pending id present in the result keeps its local version for this
    /// merge only and stops being pending, so the next result for it wins.
    pub fn apply_fetched(&self, fetched: Vec<T>) -> SyncOutcome {
        self.write(|state| {
            let received = fetched.len();
            let mut kept_local = 0;

            let next: Vec<Arc<T>> = if state.pending.is_empty() {
                fetched.into_iter().map(Arc::new).collect()
            } else {
                let server_ids: HashSet<String> =
                    fetched.iter().map(|item| item.id().to_string()).collect();
                let local = state.items.clone();

                let mut merged: Vec<Arc<T>> = fetched
                    .into_iter()
                    .map(|item| {
                        if state.pending.contains(item.id()) {
                            if let Some(mine) = local.iter().find(|l| l.id() == item.id()) {
                                kept_local += 1;
                                return mine.clone();
                            }
                        }
                        Arc::new(item)
                    })
                    .collect();

                for item in local.iter() {
                    if state.pending.contains(item.id()) && !server_ids.contains(item.id()) {
                        kept_local += 1;
                        merged.push(item.clone());
                    }
                }
                state.pending.retain(|id| !server_ids.contains(id));
                merged
            };

            state.items = Arc::new(next);
            state.synced = true;
            state.revision += 1;

            SyncOutcome {
                received,
                kept_local,
                total: state.items.len(),
            }
        })
    }

    fn read<R>(&self, f: impl FnOnce(&StoreState<T>) -> R) -> R {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<R>(&self, f: impl FnOnce(&mut StoreState<T>) -> R) -> R {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

/// Result of applying a fetched collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// Records in the server response
    pub received: usize,
    /// Local pending records that survived the merge
    pub kept_local: usize,
    /// Store size after the merge
    pub total: usize,
}

/// Every mirrored collection, owned by the application root.
pub struct Mirror {
    pub places: CollectionStore<Place>,
    pub events: CollectionStore<Event>,
    pub trails: CollectionStore<Trail>,
    pub articles: CollectionStore<Article>,
    pub listings: CollectionStore<Listing>,
    pub profiles: CollectionStore<Profile>,
    pub threads: CollectionStore<ForumThread>,
    pub groups: CollectionStore<Group>,
    pub conversations: CollectionStore<Conversation>,
    pub organizations: CollectionStore<Organization>,
    pub products: CollectionStore<Product>,
    pub services: CollectionStore<Service>,
    pub orders: CollectionStore<Order>,
    pub bookings: CollectionStore<Booking>,
    pub claims: CollectionStore<PlaceClaim>,
    pub reports: CollectionStore<Report>,
    pub live_events: CollectionStore<LiveEvent>,
}

impl Mirror {
    /// Empty mirror, as at application start.
    pub fn new() -> Self {
        Self {
            places: CollectionStore::new("places"),
            events: CollectionStore::new("events"),
            trails: CollectionStore::new("trails"),
            articles: CollectionStore::new("articles"),
            listings: CollectionStore::new("listings"),
            profiles: CollectionStore::new("profiles"),
            threads: CollectionStore::new("forum-threads"),
            groups: CollectionStore::new("groups"),
            conversations: CollectionStore::new("conversations"),
            organizations: CollectionStore::new("organizations"),
            products: CollectionStore::new("products"),
            services: CollectionStore::new("services"),
            orders: CollectionStore::new("orders"),
            bookings: CollectionStore::new("bookings"),
            claims: CollectionStore::new("claims"),
            reports: CollectionStore::new("reports"),
            live_events: CollectionStore::new("live-events"),
        }
    }

    /// Sum of all store revisions; changes whenever any collection changes.
    pub fn revision(&self) -> u64 {
        self.places.revision()
            + self.events.revision()
            + self.trails.revision()
            + self.articles.revision()
            + self.listings.revision()
            + self.profiles.revision()
            + self.threads.revision()
            + self.groups.revision()
            + self.conversations.revision()
            + self.organizations.revision()
            + self.products.revision()
            + self.services.revision()
            + self.orders.revision()
            + self.bookings.revision()
            + self.claims.revision()
            + self.reports.revision()
            + self.live_events.revision()
    }
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        slug: String,
        label: String,
    }

    impl Entity for Item {
        fn id(&self) -> &str {
            &self.id
        }

        fn slug(&self) -> Option<&str> {
            crate::models::non_empty(&self.slug)
        }
    }

    fn item(id: &str, label: &str) -> Item {
        Item {
            id: id.to_string(),
            slug: format!("{}-slug", id),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_append_keeps_prior_elements_identical() {
        let store = CollectionStore::new("items");
        store.apply_fetched(vec![item("a", "A"), item("b", "B")]);
        let before = store.snapshot();

        store.append(item("c", "C"));
        let after = store.snapshot();

        assert_eq!(after.len(), before.len() + 1);
        for (old, new) in before.iter().zip(after.iter()) {
            assert!(Arc::ptr_eq(old, new));
        }
        // The previous snapshot is untouched.
        assert_eq!(before.len(), 2);
    }

    #[test]
    fn test_update_replaces_only_target() {
        let store = CollectionStore::new("items");
        store.apply_fetched(vec![item("a", "A"), item("b", "B")]);
        let before = store.snapshot();

        let updated = store
            .update("b", |old| Item {
                label: "B2".to_string(),
                ..old.clone()
            })
            .unwrap();

        let after = store.snapshot();
        assert_eq!(updated.label, "B2");
        assert!(Arc::ptr_eq(&before[0], &after[0]));
        assert!(!Arc::ptr_eq(&before[1], &after[1]));
        assert_eq!(before[1].label, "B");
        assert!(store.is_pending("b"));
    }

    #[test]
    fn test_update_missing_is_noop() {
        let store: CollectionStore<Item> = CollectionStore::new("items");
        let revision = store.revision();
        assert!(store.update("zzz", |old| old.clone()).is_none());
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_lookup_by_slug_then_id() {
        let store = CollectionStore::new("items");
        store.apply_fetched(vec![item("a", "A")]);

        assert_eq!(store.get_by_key("a-slug").unwrap().id, "a");
        assert_eq!(store.get_by_key("a").unwrap().id, "a");
        assert!(store.get_by_key("missing").is_none());
    }

    #[test]
    fn test_first_sync_replaces_wholesale() {
        let store = CollectionStore::new("items");
        assert!(!store.is_synced());

        let outcome = store.apply_fetched(vec![item("a", "A"), item("b", "B")]);
        assert!(store.is_synced());
        assert_eq!(
            outcome,
            SyncOutcome {
                received: 2,
                kept_local: 0,
                total: 2
            }
        );
    }

    #[test]
    fn test_refetch_keeps_pending_local_edits() {
        let store = CollectionStore::new("items");
        store.apply_fetched(vec![item("a", "A"), item("b", "B")]);
        store.append(item("local", "mine"));
        store.update("a", |old| Item {
            label: "edited".to_string(),
            ..old.clone()
        });

        // Server no longer has b, adds d, and still has the old a.
        let outcome = store.apply_fetched(vec![item("a", "A"), item("d", "D")]);

        let ids: Vec<String> = store.snapshot().iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec!["a", "d", "local"]);
        assert_eq!(store.get_by_id("a").unwrap().label, "edited");
        assert_eq!(outcome.kept_local, 2);
    }

    #[test]
    fn test_pending_record_confirmed_by_fetch_then_server_wins() {
        let store = CollectionStore::new("items");
        store.apply_fetched(vec![item("a", "A")]);
        store.append(item("l1", "draft"));

        // The server now knows the listing.
        store.apply_fetched(vec![item("a", "A"), item("l1", "draft")]);
        assert!(!store.is_pending("l1"));

        // A moderator edit on the server reaches the mirror.
        let outcome = store.apply_fetched(vec![item("a", "A"), item("l1", "rejected")]);
        assert_eq!(store.get_by_id("l1").unwrap().label, "rejected");
        assert_eq!(outcome.kept_local, 0);
    }

    #[test]
    fn test_unconfirmed_record_stays_pending() {
        let store = CollectionStore::new("items");
        store.apply_fetched(vec![item("a", "A")]);
        store.append(item("l1", "draft"));

        store.apply_fetched(vec![item("a", "A")]);
        store.apply_fetched(vec![item("a", "A2")]);

        assert!(store.is_pending("l1"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_by_id("a").unwrap().label, "A2");
    }

    #[test]
    fn test_find_or_append_appends_once() {
        let store: CollectionStore<Item> = CollectionStore::new("items");
        let (first, appended) = store.find_or_append(|i| i.label == "x", || item("x1", "x"));
        assert!(appended);
        let (again, appended) = store.find_or_append(|i| i.label == "x", || item("x2", "x"));
        assert!(!appended);
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(store.len(), 1);
        assert!(store.is_pending("x1"));
    }

    #[test]
    fn test_find_or_append_is_atomic_across_threads() {
        let store: CollectionStore<Item> = CollectionStore::new("items");
        std::thread::scope(|scope| {
            for n in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    store.find_or_append(
                        |i| i.label == "shared",
                        || item(&format!("t{}", n), "shared"),
                    );
                });
            }
        });
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove() {
        let store = CollectionStore::new("items");
        store.apply_fetched(vec![item("a", "A")]);
        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_mirror_revision_moves() {
        let mirror = Mirror::new();
        let start = mirror.revision();
        mirror.places.apply_fetched(Vec::new());
        assert_eq!(mirror.revision(), start + 1);
    }
}
