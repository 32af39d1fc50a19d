//! Session bootstrap: auth session + profile enrichment → current user.

use serde::Deserialize;

use super::{AuthClient, AuthSession};
use crate::fetch::ApiClient;
use crate::models::{Profile, UserRole};

/// Endpoint returning the signed-in member's profile fields.
pub const PROFILE_ENRICHMENT_ENDPOINT: &str = "/api/profiles/me";

/// Who is using the shell.
///
/// `current_user` is only ever set from a session the auth service verified.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub current_user: Option<Profile>,
    pub auth_user: Option<AuthSession>,
}

impl Session {
    pub fn signed_out() -> Self {
        Self::default()
    }
}

/// Profile fields served by the REST API for the session's user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEnrichment {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub favorite_place_ids: Vec<String>,
    #[serde(default)]
    pub joined_at: Option<String>,
}

/// Combine the auth user and the enrichment payload into a [`Profile`].
pub fn map_profile(auth: &AuthSession, enrichment: ProfileEnrichment) -> Profile {
    let user = &auth.user;
    let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

    Profile {
        id: user.id.clone(),
        slug: enrichment.slug.unwrap_or_default(),
        email: user.email.clone(),
        full_name: non_empty(enrichment.full_name).unwrap_or_else(|| user.name.clone()),
        avatar_url: non_empty(enrichment.avatar_url)
            .or_else(|| user.image.clone())
            .unwrap_or_default(),
        cover_url: enrichment.cover_url.unwrap_or_default(),
        bio: enrichment.bio.unwrap_or_default(),
        location: enrichment.location.unwrap_or_default(),
        role: enrichment
            .role
            .or_else(|| user.role.as_deref().and_then(UserRole::parse))
            .unwrap_or_default(),
        favorite_place_ids: enrichment.favorite_place_ids,
        joined_at: enrichment
            .joined_at
            .or_else(|| user.created_at.clone())
            .unwrap_or_default(),
    }
}

/// Ask the auth service for the session and build the current user.
///
/// Every failure is the ordinary logged-out state: it is logged and yields
/// an empty [`Session`].
pub async fn bootstrap_session(auth: &dyn AuthClient, api: &ApiClient) -> Session {
    let auth_session = match auth.get_session().await {
        Ok(Some(session)) => session,
        Ok(None) => {
            tracing::debug!("No active session");
            return Session::signed_out();
        }
        Err(e) => {
            tracing::warn!("Session check failed: {}", e);
            return Session::signed_out();
        }
    };

    let enrichment = match api
        .get_json::<ProfileEnrichment>(PROFILE_ENRICHMENT_ENDPOINT)
        .await
    {
        Ok(enrichment) => enrichment,
        Err(e) => {
            tracing::warn!(user_id = %auth_session.user.id, "Profile enrichment failed: {}", e);
            return Session::signed_out();
        }
    };

    let profile = map_profile(&auth_session, enrichment);
    tracing::info!(user_id = %profile.id, role = profile.role.as_str(), "Session restored");

    Session {
        current_user: Some(profile),
        auth_user: Some(auth_session),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthSessionInfo, AuthUser};

    fn auth_session() -> AuthSession {
        AuthSession {
            session: AuthSessionInfo {
                id: "s1".to_string(),
                token: "tok".to_string(),
                user_id: "u1".to_string(),
                expires_at: "2026-12-31T00:00:00Z".to_string(),
            },
            user: AuthUser {
                id: "u1".to_string(),
                email: "camille@example.fr".to_string(),
                name: "Camille".to_string(),
                image: Some("https://cdn.example.fr/camille.png".to_string()),
                role: Some("moderator".to_string()),
                banned: None,
                created_at: Some("2025-03-01T10:00:00Z".to_string()),
            },
        }
    }

    #[test]
    fn test_map_profile_defaults_from_auth_user() {
        let profile = map_profile(&auth_session(), ProfileEnrichment::default());

        assert_eq!(profile.id, "u1");
        assert_eq!(profile.full_name, "Camille");
        assert_eq!(profile.avatar_url, "https://cdn.example.fr/camille.png");
        assert_eq!(profile.role, UserRole::Moderator);
        assert_eq!(profile.bio, "");
        assert_eq!(profile.slug, "");
        assert_eq!(profile.joined_at, "2025-03-01T10:00:00Z");
    }

    #[test]
    fn test_map_profile_prefers_enrichment() {
        let enrichment = ProfileEnrichment {
            slug: Some("camille-r".to_string()),
            full_name: Some("Camille Roux".to_string()),
            avatar_url: Some(String::new()),
            role: Some(UserRole::Pro),
            favorite_place_ids: vec!["p1".to_string()],
            ..ProfileEnrichment::default()
        };
        let profile = map_profile(&auth_session(), enrichment);

        assert_eq!(profile.slug, "camille-r");
        assert_eq!(profile.full_name, "Camille Roux");
        // Empty enrichment avatar falls back to the auth image.
        assert_eq!(profile.avatar_url, "https://cdn.example.fr/camille.png");
        assert_eq!(profile.role, UserRole::Pro);
        assert_eq!(profile.favorite_place_ids, vec!["p1".to_string()]);
    }
}
