//! Member profiles.

use serde::{Deserialize, Serialize};

use super::slugged_entity;

/// Platform role carried by a profile.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Pro,
    Moderator,
    Admin,
}

impl UserRole {
    /// Whether the role may act in the moderation panel.
    pub fn can_moderate(&self) -> bool {
        matches!(self, UserRole::Moderator | UserRole::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Pro => "pro",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(UserRole::User),
            "pro" => Some(UserRole::Pro),
            "moderator" => Some(UserRole::Moderator),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// A member profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub favorite_place_ids: Vec<String>,
    #[serde(default)]
    pub joined_at: String,
}

slugged_entity!(Profile);

impl Profile {
    pub fn has_favorite(&self, place_id: &str) -> bool {
        self.favorite_place_ids.iter().any(|id| id == place_id)
    }

    /// Copy of this profile with `place_id` added to or removed from the favorites.
    pub fn with_favorite_toggled(&self, place_id: &str) -> Self {
        let favorite_place_ids = if self.has_favorite(place_id) {
            self.favorite_place_ids
                .iter()
                .filter(|id| *id != place_id)
                .cloned()
                .collect()
        } else {
            self.favorite_place_ids
                .iter()
                .cloned()
                .chain([place_id.to_string()])
                .collect()
        };

        Self {
            favorite_place_ids,
            ..self.clone()
        }
    }
}

/// Request body for the settings page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(&self, profile: &Profile) -> Profile {
        Profile {
            full_name: self
                .full_name
                .clone()
                .unwrap_or_else(|| profile.full_name.clone()),
            bio: self.bio.clone().unwrap_or_else(|| profile.bio.clone()),
            location: self
                .location
                .clone()
                .unwrap_or_else(|| profile.location.clone()),
            avatar_url: self
                .avatar_url
                .clone()
                .unwrap_or_else(|| profile.avatar_url.clone()),
            cover_url: self
                .cover_url
                .clone()
                .unwrap_or_else(|| profile.cover_url.clone()),
            ..profile.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_favorite_toggle_scenario() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "favoritePlaceIds": []
        }))
        .unwrap();

        let once = profile.with_favorite_toggled("place1");
        assert_eq!(once.favorite_place_ids, vec!["place1".to_string()]);

        let twice = once.with_favorite_toggled("place1");
        assert!(twice.favorite_place_ids.is_empty());
    }

    #[test]
    fn test_role_round_trip() {
        for role in [UserRole::User, UserRole::Pro, UserRole::Moderator, UserRole::Admin] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert!(UserRole::Admin.can_moderate());
        assert!(!UserRole::Pro.can_moderate());
    }
}
