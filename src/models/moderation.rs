//! Ownership claims and content reports handled by the moderation panel.

use serde::{Deserialize, Serialize};

use super::plain_entity;

/// Review state of a place claim.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A pro member's request to manage a place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceClaim {
    pub id: String,
    pub place_id: String,
    pub user_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: ClaimStatus,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<String>,
}

/// Kind of content a report points at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReportTargetKind {
    Place,
    Event,
    Listing,
    Article,
    Comment,
    ForumThread,
    ForumPost,
    Profile,
    Group,
    LiveEvent,
}

/// The reported piece of content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportTarget {
    pub kind: ReportTargetKind,
    pub id: String,
}

/// Review state of a report.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Resolved,
    Dismissed,
}

/// A content report filed by a member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub reporter_id: String,
    pub target: ReportTarget,
    pub reason: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default)]
    pub created_at: String,
}

/// Request body for submitting the report modal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDraft {
    pub reason: String,
    #[serde(default)]
    pub details: String,
}

plain_entity!(PlaceClaim, Report);
