//! Hiking trails.

use serde::{Deserialize, Serialize};

use super::{slugged_entity, PublicationStatus};

/// Trail difficulty grade.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Facile,
    Moyen,
    Difficile,
}

/// A hiking trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trail {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub distance_km: f64,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub elevation_gain: u32,
    #[serde(default)]
    pub status: PublicationStatus,
    #[serde(default)]
    pub created_at: String,
}

slugged_entity!(Trail);

/// Request body for proposing a trail.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub distance_km: f64,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub elevation_gain: u32,
}
