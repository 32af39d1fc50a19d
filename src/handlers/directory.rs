//! Directory actions: reviews, favorites, submissions, claims and live events.

use std::sync::Arc;

use chrono::{Duration, Utc};

use super::{local_slug, new_id, now_rfc3339, App};
use crate::models::{
    ClaimStatus, Event, EventDraft, LiveEvent, LiveEventDraft, Place, PlaceClaim, PlaceDraft,
    Profile, PublicationStatus, Review, ReviewDraft, Trail, TrailDraft, Vote,
};
use crate::navigation::Destination;

/// Lifetime of a live event when the author gives none.
pub const DEFAULT_LIVE_EVENT_MINUTES: i64 = 180;

/// Longest lifetime a live event may ask for: one week.
pub const MAX_LIVE_EVENT_MINUTES: i64 = 7 * 24 * 60;

impl App {
    /// Append a review to a place.
    pub fn add_review(&self, place_id: &str, draft: &ReviewDraft) -> Option<Review> {
        let user = self.require_user("add_review")?;
        if !(1..=5).contains(&draft.rating) {
            tracing::debug!(rating = draft.rating, "Ignored review with rating out of range");
            return None;
        }

        let review = Review {
            id: new_id(),
            user_id: user.id.clone(),
            author_name: user.full_name.clone(),
            rating: draft.rating,
            comment: draft.comment.trim().to_string(),
            created_at: now_rfc3339(),
        };

        let added = review.clone();
        self.mirror.places.update(place_id, move |place| Place {
            reviews: place.reviews.iter().cloned().chain([added]).collect(),
            ..place.clone()
        })?;

        tracing::info!(place_id, review_id = %review.id, "Review added");
        Some(review)
    }

    /// Add or remove a place from the current user's favorites.
    pub fn toggle_favorite(&self, place_id: &str) -> Option<Profile> {
        let updated = self.modify_current_user("toggle_favorite", |user| {
            let updated = user.with_favorite_toggled(place_id);
            let favorites = updated.favorite_place_ids.clone();
            self.mirror.profiles.update(&user.id, move |profile| Profile {
                favorite_place_ids: favorites,
                ..profile.clone()
            });
            updated
        })?;

        tracing::debug!(
            place_id,
            favorite = updated.has_favorite(place_id),
            "Favorite toggled"
        );
        Some(updated)
    }

    /// Propose a place; it waits for moderation.
    pub fn submit_place(&self, draft: &PlaceDraft) -> Option<Arc<Place>> {
        let user = self.require_user("submit_place")?;
        if draft.name.trim().is_empty() {
            return None;
        }

        let id = new_id();
        let place = self.mirror.places.append(Place {
            slug: local_slug(&draft.name, &id),
            id,
            name: draft.name.trim().to_string(),
            main_category: draft.main_category,
            category: draft.category.clone(),
            description: draft.description.clone(),
            address: draft.address.clone(),
            coordinates: draft.coordinates,
            images: Vec::new(),
            rating: 0.0,
            reviews: Vec::new(),
            owner_id: Some(user.id),
            organization_id: None,
            status: PublicationStatus::Pending,
            created_at: now_rfc3339(),
        });

        self.navigate_to(Destination::Dashboard);
        Some(place)
    }

    /// Propose an agenda event; it waits for moderation.
    pub fn submit_event(&self, draft: &EventDraft) -> Option<Arc<Event>> {
        self.require_user("submit_event")?;
        if draft.title.trim().is_empty() {
            return None;
        }

        let id = new_id();
        let event = self.mirror.events.append(Event {
            slug: local_slug(&draft.title, &id),
            id,
            title: draft.title.trim().to_string(),
            description: draft.description.clone(),
            place_id: draft.place_id.clone(),
            start_date: draft.start_date.clone(),
            end_date: draft.end_date.clone(),
            category: draft.category.clone(),
            price: draft.price,
            status: PublicationStatus::Pending,
            created_at: now_rfc3339(),
        });

        self.navigate_to(Destination::Dashboard);
        Some(event)
    }

    /// Propose a trail; it waits for moderation.
    pub fn submit_trail(&self, draft: &TrailDraft) -> Option<Arc<Trail>> {
        self.require_user("submit_trail")?;
        if draft.name.trim().is_empty() {
            return None;
        }

        let id = new_id();
        let trail = self.mirror.trails.append(Trail {
            slug: local_slug(&draft.name, &id),
            id,
            name: draft.name.trim().to_string(),
            description: draft.description.clone(),
            difficulty: draft.difficulty,
            distance_km: draft.distance_km,
            duration_minutes: draft.duration_minutes,
            elevation_gain: draft.elevation_gain,
            status: PublicationStatus::Pending,
            created_at: now_rfc3339(),
        });

        self.navigate_to(Destination::Dashboard);
        Some(trail)
    }

    /// Ask to manage a place. One open claim per user and place.
    pub fn claim_place(&self, place_id: &str, message: &str) -> Option<Arc<PlaceClaim>> {
        let user = self.require_user("claim_place")?;
        self.mirror.places.get_by_id(place_id)?;

        let (claim, created) = self.mirror.claims.find_or_append(
            |c| c.place_id == place_id && c.user_id == user.id && c.status == ClaimStatus::Pending,
            || PlaceClaim {
                id: new_id(),
                place_id: place_id.to_string(),
                user_id: user.id.clone(),
                message: message.trim().to_string(),
                status: ClaimStatus::Pending,
                created_at: now_rfc3339(),
                reviewed_at: None,
            },
        );
        if !created {
            tracing::debug!(place_id, "Ignored duplicate claim");
            return None;
        }

        tracing::info!(place_id, claim_id = %claim.id, "Place claimed");
        self.navigate_to(Destination::Dashboard);
        Some(claim)
    }

    /// Post a live event that disappears after its lifetime.
    pub fn post_live_event(&self, draft: &LiveEventDraft) -> Option<Arc<LiveEvent>> {
        let user = self.require_user("post_live_event")?;
        if draft.title.trim().is_empty() {
            return None;
        }

        let minutes = draft
            .duration_minutes
            .filter(|m| *m > 0)
            .map_or(DEFAULT_LIVE_EVENT_MINUTES, |m| m.min(MAX_LIVE_EVENT_MINUTES));
        let now = Utc::now();

        Some(self.mirror.live_events.append(LiveEvent {
            id: new_id(),
            title: draft.title.trim().to_string(),
            description: draft.description.clone(),
            place_id: draft.place_id.clone(),
            author_id: user.id,
            created_at: now,
            expires_at: now + Duration::minutes(minutes),
            upvotes: Vec::new(),
            downvotes: Vec::new(),
        }))
    }

    /// Vote on a live event. See [`LiveEvent::with_vote`] for the rules.
    pub fn vote_live_event(&self, live_event_id: &str, vote: Vote) -> Option<Arc<LiveEvent>> {
        let user = self.require_user("vote_live_event")?;
        let event = self.mirror.live_events.get_by_id(live_event_id)?;
        if event.is_expired(Utc::now()) {
            tracing::debug!(live_event_id, "Ignored vote on expired live event");
            return None;
        }

        self.mirror
            .live_events
            .update(live_event_id, |event| event.with_vote(&user.id, vote))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::models::{MainCategory, ReviewDraft};

    fn seed_place(app: &App) {
        let place: Place = serde_json::from_value(serde_json::json!({
            "id": "place1",
            "slug": "le-belvedere",
            "name": "Le Belvédère",
            "mainCategory": "restaurant",
            "reviews": [{
                "id": "r0",
                "userId": "u0",
                "rating": 4,
                "createdAt": "2026-01-01T00:00:00Z"
            }]
        }))
        .unwrap();
        let other: Place = serde_json::from_value(serde_json::json!({
            "id": "place2",
            "name": "Hôtel du Lac",
            "mainCategory": "hebergement"
        }))
        .unwrap();
        app.mirror().places.apply_fetched(vec![place, other]);
    }

    fn review(rating: u8) -> ReviewDraft {
        ReviewDraft {
            rating,
            comment: " Superbe vue ".to_string(),
        }
    }

    #[test]
    fn test_add_review_appends() {
        let app = signed_in_app();
        seed_place(&app);
        let before = app.mirror().places.snapshot();

        let added = app.add_review("place1", &review(5)).unwrap();

        let after = app.mirror().places.get_by_id("place1").unwrap();
        assert_eq!(after.reviews.len(), 2);
        assert_eq!(after.reviews[0], before[0].reviews[0]);
        assert_eq!(after.reviews[1], added);
        assert_eq!(added.comment, "Superbe vue");
        assert!(Arc::ptr_eq(
            &before[1],
            &app.mirror().places.snapshot()[1]
        ));
    }

    #[test]
    fn test_add_review_without_user_is_noop() {
        let app = signed_out_app();
        seed_place(&app);
        let revision = app.mirror().revision();
        assert!(app.add_review("place1", &review(5)).is_none());
        assert_eq!(app.mirror().revision(), revision);
    }

    #[test]
    fn test_add_review_rejects_bad_rating_and_unknown_place() {
        let app = signed_in_app();
        seed_place(&app);
        assert!(app.add_review("place1", &review(0)).is_none());
        assert!(app.add_review("place1", &review(6)).is_none());
        assert!(app.add_review("nowhere", &review(3)).is_none());
    }

    #[test]
    fn test_toggle_favorite_updates_mirror_and_current_user() {
        let app = signed_in_app();

        let once = app.toggle_favorite("place1").unwrap();
        assert_eq!(once.favorite_place_ids, vec!["place1".to_string()]);
        assert_eq!(
            app.current_user().unwrap().favorite_place_ids,
            vec!["place1".to_string()]
        );
        assert_eq!(
            app.mirror().profiles.get_by_id("u1").unwrap().favorite_place_ids,
            vec!["place1".to_string()]
        );

        let twice = app.toggle_favorite("place1").unwrap();
        assert!(twice.favorite_place_ids.is_empty());
        assert!(app.current_user().unwrap().favorite_place_ids.is_empty());
        assert!(app
            .mirror()
            .profiles
            .get_by_id("u1")
            .unwrap()
            .favorite_place_ids
            .is_empty());
    }

    #[test]
    fn test_concurrent_favorite_toggles_all_land() {
        let app = signed_in_app();
        let places: Vec<String> = (0..8).map(|n| format!("place{}", n)).collect();
        std::thread::scope(|scope| {
            for place in &places {
                let app = &app;
                scope.spawn(move || app.toggle_favorite(place));
            }
        });

        let mut favorites = app.current_user().unwrap().favorite_place_ids;
        favorites.sort();
        assert_eq!(favorites, places);
        let mut mirrored = app.mirror().profiles.get_by_id("u1").unwrap().favorite_place_ids.clone();
        mirrored.sort();
        assert_eq!(mirrored, places);
    }

    #[test]
    fn test_toggle_favorite_signed_out_is_noop() {
        let app = signed_out_app();
        assert!(app.toggle_favorite("place1").is_none());
    }

    #[test]
    fn test_submit_place_is_pending_and_navigates() {
        let app = signed_in_app();
        let place = app
            .submit_place(&PlaceDraft {
                name: "Fromagerie Pierre Gay".to_string(),
                main_category: MainCategory::Commerce,
                category: "fromagerie".to_string(),
                description: String::new(),
                address: "Rue Carnot".to_string(),
                coordinates: None,
            })
            .unwrap();

        assert_eq!(place.status, PublicationStatus::Pending);
        assert!(place.slug.starts_with("fromagerie-pierre-gay-"));
        assert_eq!(place.owner_id.as_deref(), Some("u1"));
        assert_eq!(app.location(), "/dashboard");
    }

    #[test]
    fn test_claim_place_once() {
        let app = signed_in_app();
        seed_place(&app);

        let claim = app.claim_place("place2", "Je suis la gérante").unwrap();
        assert_eq!(claim.status, ClaimStatus::Pending);
        assert!(app.claim_place("place2", "encore").is_none());
        assert!(app.claim_place("missing", "?").is_none());
        assert_eq!(app.mirror().claims.len(), 1);
    }

    #[test]
    fn test_live_vote_scenario() {
        let app = signed_in_app();
        let live = app
            .post_live_event(&LiveEventDraft {
                title: "Concert au Pâquier".to_string(),
                description: String::new(),
                place_id: None,
                duration_minutes: None,
            })
            .unwrap();
        assert_eq!(
            (live.expires_at - live.created_at).num_minutes(),
            DEFAULT_LIVE_EVENT_MINUTES
        );

        let up = app.vote_live_event(&live.id, Vote::Up).unwrap();
        assert_eq!(up.score(), 1);

        let down = app.vote_live_event(&live.id, Vote::Down).unwrap();
        assert!(down.downvotes.contains(&"u1".to_string()));
        assert!(!down.upvotes.contains(&"u1".to_string()));
        assert_eq!(down.score(), -1);
    }

    #[test]
    fn test_live_event_duration_is_capped() {
        let app = signed_in_app();
        for minutes in [i64::MAX / 2, i64::MAX, MAX_LIVE_EVENT_MINUTES + 1] {
            let live = app
                .post_live_event(&LiveEventDraft {
                    title: "Marathon".to_string(),
                    description: String::new(),
                    place_id: None,
                    duration_minutes: Some(minutes),
                })
                .unwrap();
            assert_eq!(
                (live.expires_at - live.created_at).num_minutes(),
                MAX_LIVE_EVENT_MINUTES
            );
        }
    }

    #[test]
    fn test_concurrent_claims_open_one() {
        let app = signed_in_app();
        seed_place(&app);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| app.claim_place("place2", "Je suis la gérante"));
            }
        });
        assert_eq!(app.mirror().claims.len(), 1);
    }

    #[test]
    fn test_live_vote_twice_restores() {
        let app = signed_in_app();
        let live = app
            .post_live_event(&LiveEventDraft {
                title: "Feu d'artifice".to_string(),
                description: String::new(),
                place_id: None,
                duration_minutes: Some(30),
            })
            .unwrap();

        app.vote_live_event(&live.id, Vote::Down);
        let restored = app.vote_live_event(&live.id, Vote::Down).unwrap();
        assert_eq!(restored.upvotes, live.upvotes);
        assert_eq!(restored.downvotes, live.downvotes);
    }

    #[test]
    fn test_vote_on_expired_live_event_is_ignored() {
        let app = signed_in_app();
        let now = Utc::now();
        app.mirror().live_events.apply_fetched(vec![LiveEvent {
            id: "old".to_string(),
            title: "Brocante".to_string(),
            description: String::new(),
            place_id: None,
            author_id: "u2".to_string(),
            created_at: now - Duration::hours(4),
            expires_at: now - Duration::hours(1),
            upvotes: Vec::new(),
            downvotes: Vec::new(),
        }]);
        assert!(app.vote_live_event("old", Vote::Up).is_none());
    }
}
