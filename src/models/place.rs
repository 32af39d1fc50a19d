//! Directory places and their reviews.

use serde::{Deserialize, Serialize};

use super::{slugged_entity, PublicationStatus};

/// Top-level directory section a place belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MainCategory {
    Restaurant,
    Hebergement,
    Activite,
    Commerce,
}

impl MainCategory {
    pub const ALL: [MainCategory; 4] = [
        MainCategory::Restaurant,
        MainCategory::Hebergement,
        MainCategory::Activite,
        MainCategory::Commerce,
    ];

    /// Path segment of a single place page (`/restaurant/{slug}`).
    pub fn detail_segment(&self) -> &'static str {
        match self {
            MainCategory::Restaurant => "restaurant",
            MainCategory::Hebergement => "hebergement",
            MainCategory::Activite => "activite",
            MainCategory::Commerce => "commerce",
        }
    }

    /// Path segment of the category listing (`/restaurants`).
    pub fn list_segment(&self) -> &'static str {
        match self {
            MainCategory::Restaurant => "restaurants",
            MainCategory::Hebergement => "hebergements",
            MainCategory::Activite => "activites",
            MainCategory::Commerce => "commerces",
        }
    }
}

/// Map position of a place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Whether the position can be drawn as a map marker.
    ///
    /// `(0, 0)` is what the backend stores for places that were never geocoded.
    pub fn is_valid_marker(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
            && !(self.lat == 0.0 && self.lng == 0.0)
    }
}

/// A user review attached to a place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub author_name: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: String,
}

/// A place in the directory (restaurant, lodging, activity, shop).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    pub name: String,
    pub main_category: MainCategory,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub status: PublicationStatus,
    #[serde(default)]
    pub created_at: String,
}

slugged_entity!(Place);

/// Request body for proposing a new place.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDraft {
    pub name: String,
    pub main_category: MainCategory,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// Request body for a new review.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDraft {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}
