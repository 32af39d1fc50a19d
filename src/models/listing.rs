//! Classified ads.

use serde::{Deserialize, Serialize};

use super::{slugged_entity, PublicationStatus};

/// Whether the ad offers or asks for something.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    #[default]
    Offre,
    Demande,
}

/// A classified ad.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub listing_type: ListingType,
    pub user_id: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub status: PublicationStatus,
    #[serde(default)]
    pub created_at: String,
}

slugged_entity!(Listing);

/// Request body for creating a listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub listing_type: ListingType,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Request body for editing a listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

impl ListingUpdate {
    pub fn apply(&self, listing: &Listing) -> Listing {
        Listing {
            title: self.title.clone().unwrap_or_else(|| listing.title.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| listing.description.clone()),
            price: self.price.or(listing.price),
            category: self
                .category
                .clone()
                .unwrap_or_else(|| listing.category.clone()),
            images: self.images.clone().unwrap_or_else(|| listing.images.clone()),
            ..listing.clone()
        }
    }
}
