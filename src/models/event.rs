//! Agenda events and ephemeral live events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{plain_entity, slugged_entity, PublicationStatus};

/// A scheduled event in the agenda.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default)]
    pub status: PublicationStatus,
    #[serde(default)]
    pub created_at: String,
}

slugged_entity!(Event);

/// Request body for proposing an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub place_id: Option<String>,
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: Option<f64>,
}

/// Direction of a vote on a live event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
}

/// A short-lived "happening now" post that expires on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub upvotes: Vec<String>,
    #[serde(default)]
    pub downvotes: Vec<String>,
}

plain_entity!(LiveEvent);

impl LiveEvent {
    /// Net vote count.
    pub fn score(&self) -> i64 {
        self.upvotes.len() as i64 - self.downvotes.len() as i64
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whole minutes left before expiry, zero once expired.
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_minutes().max(0)
    }

    /// Fraction of the lifetime still ahead, in `[0, 1]`.
    pub fn freshness(&self, now: DateTime<Utc>) -> f64 {
        let lifetime = (self.expires_at - self.created_at).num_seconds();
        if lifetime <= 0 {
            return 0.0;
        }
        let left = (self.expires_at - now).num_seconds();
        (left as f64 / lifetime as f64).clamp(0.0, 1.0)
    }

    /// Copy of this event with `user_id`'s vote applied.
    ///
    /// A user holds at most one vote. Casting the opposite vote replaces the
    /// previous one; casting the same vote again withdraws it.
    pub fn with_vote(&self, user_id: &str, vote: Vote) -> Self {
        let (same, opposite) = match vote {
            Vote::Up => (&self.upvotes, &self.downvotes),
            Vote::Down => (&self.downvotes, &self.upvotes),
        };

        let already_cast = same.iter().any(|id| id == user_id);
        let same: Vec<String> = if already_cast {
            same.iter().filter(|id| *id != user_id).cloned().collect()
        } else {
            same.iter().cloned().chain([user_id.to_string()]).collect()
        };
        let opposite: Vec<String> = opposite
            .iter()
            .filter(|id| *id != user_id)
            .cloned()
            .collect();

        let (upvotes, downvotes) = match vote {
            Vote::Up => (same, opposite),
            Vote::Down => (opposite, same),
        };

        Self {
            upvotes,
            downvotes,
            ..self.clone()
        }
    }
}

/// Request body for posting a live event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveEventDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub place_id: Option<String>,
    /// Lifetime in minutes; defaults to three hours
    #[serde(default)]
    pub duration_minutes: Option<i64>,
}
