//! Data models for the Salut Annecy shell.
//!
//! These records mirror the REST API payloads field for field (camelCase JSON).

mod article;
mod community;
mod event;
mod listing;
mod moderation;
mod place;
mod pro;
mod profile;
mod trail;

pub use article::*;
pub use community::*;
pub use event::*;
pub use listing::*;
pub use moderation::*;
pub use place::*;
pub use pro::*;
pub use profile::*;
pub use trail::*;

use serde::{Deserialize, Serialize};

/// A record mirrored from one of the backend collections.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Human-readable path key, for entities that have one.
    fn slug(&self) -> Option<&str> {
        None
    }
}

/// Publication state of user-submitted directory content.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Pending,
    #[default]
    Published,
    Rejected,
}

/// Non-empty slug, or `None` when the backend sent an empty string.
pub(crate) fn non_empty(slug: &str) -> Option<&str> {
    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

/// URL slug from a title: lowercase ASCII words joined by dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars().flat_map(char::to_lowercase) {
        let c = match c {
            'à' | 'â' | 'ä' | 'á' => 'a',
            'ç' => 'c',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' | 'í' => 'i',
            'ô' | 'ö' | 'ó' => 'o',
            'ù' | 'û' | 'ü' | 'ú' => 'u',
            'ÿ' => 'y',
            'œ' => {
                slug.push('o');
                'e'
            }
            'æ' => {
                slug.push('a');
                'e'
            }
            other => other,
        };
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Implements [`Entity`] for records with `id` and `slug` string fields.
macro_rules! slugged_entity {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::models::Entity for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn slug(&self) -> Option<&str> {
                    $crate::models::non_empty(&self.slug)
                }
            }
        )+
    };
}

/// Implements [`Entity`] for records addressed by id only.
macro_rules! plain_entity {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::models::Entity for $ty {
                fn id(&self) -> &str {
                    &self.id
                }
            }
        )+
    };
}

pub(crate) use plain_entity;
pub(crate) use slugged_entity;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Fête du Lac d'Annecy"), "fete-du-lac-d-annecy");
        assert_eq!(slugify("  Vélo -- électrique!  "), "velo-electrique");
        assert_eq!(slugify("Œufs & bœuf"), "oeufs-boeuf");
        assert_eq!(slugify("!!!"), "");
    }
}
