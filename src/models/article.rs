//! Magazine articles and reader comments.

use serde::{Deserialize, Serialize};

use super::slugged_entity;

/// A reader comment under an article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub author_name: String,
    pub content: String,
    pub created_at: String,
}

/// A magazine article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

slugged_entity!(Article);
