//! Forums, groups and private conversations.

use serde::{Deserialize, Serialize};

use super::{plain_entity, slugged_entity};

/// A reply inside a forum thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: String,
}

/// A forum discussion thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForumThread {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    pub category_id: String,
    pub title: String,
    pub author_id: String,
    #[serde(default)]
    pub posts: Vec<ForumPost>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_locked: bool,
}

slugged_entity!(ForumThread);

/// Request body for opening a thread.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadDraft {
    pub category_id: String,
    pub title: String,
    pub content: String,
}

/// Role of a member inside a group.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Admin,
    Moderator,
    #[default]
    Member,
}

/// Membership entry of a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub profile_id: String,
    #[serde(default)]
    pub role: GroupRole,
    #[serde(default)]
    pub joined_at: String,
}

/// A community group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub members: Vec<GroupMember>,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
}

slugged_entity!(Group);

impl Group {
    pub fn is_member(&self, profile_id: &str) -> bool {
        self.members.iter().any(|m| m.profile_id == profile_id)
    }

    /// Copy of this group with `profile_id` joined or removed.
    ///
    /// `member_count` is recounted from `members`, so a stale server count
    /// is corrected on the first toggle.
    pub fn with_membership_toggled(&self, profile_id: &str, now: &str) -> Self {
        let members: Vec<GroupMember> = if self.is_member(profile_id) {
            self.members
                .iter()
                .filter(|m| m.profile_id != profile_id)
                .cloned()
                .collect()
        } else {
            let joined = GroupMember {
                profile_id: profile_id.to_string(),
                role: GroupRole::Member,
                joined_at: now.to_string(),
            };
            self.members.iter().cloned().chain([joined]).collect()
        };

        Self {
            member_count: u32::try_from(members.len()).unwrap_or(u32::MAX),
            members,
            ..self.clone()
        }
    }
}

/// Request body for creating a group.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub is_private: bool,
}

/// A private message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: String,
}

/// A private conversation between members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub participant_ids: Vec<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub last_message_at: String,
    #[serde(default)]
    pub created_at: String,
}

plain_entity!(Conversation);

impl Conversation {
    /// Whether this is the one-to-one conversation between `a` and `b`.
    pub fn is_direct_between(&self, a: &str, b: &str) -> bool {
        self.participant_ids.len() == 2
            && self.participant_ids.iter().any(|p| p == a)
            && self.participant_ids.iter().any(|p| p == b)
    }

    pub fn has_participant(&self, profile_id: &str) -> bool {
        self.participant_ids.iter().any(|p| p == profile_id)
    }
}
