//! Community actions: comments, listings, forums, groups, conversations and
//! the member's own profile.

use std::sync::Arc;

use super::{local_slug, new_id, now_rfc3339, App};
use crate::models::{
    Article, Comment, Conversation, ForumPost, ForumThread, Group, GroupDraft, GroupMember,
    GroupRole, Listing, ListingDraft, ListingUpdate, Message, Profile, ProfileUpdate,
    PublicationStatus, ThreadDraft,
};
use crate::navigation::Destination;

impl App {
    /// Append a comment under an article.
    pub fn add_comment(&self, article_id: &str, content: &str) -> Option<Comment> {
        let user = self.require_user("add_comment")?;
        let content = content.trim();
        if content.is_empty() {
            return None;
        }

        let comment = Comment {
            id: new_id(),
            user_id: user.id.clone(),
            author_name: user.full_name.clone(),
            content: content.to_string(),
            created_at: now_rfc3339(),
        };

        let added = comment.clone();
        self.mirror.articles.update(article_id, move |article| Article {
            comments: article.comments.iter().cloned().chain([added]).collect(),
            ..article.clone()
        })?;
        Some(comment)
    }

    // ==================== LISTINGS ====================

    /// Publish a listing and open its page.
    pub fn create_listing(&self, draft: &ListingDraft) -> Option<Arc<Listing>> {
        let user = self.require_user("create_listing")?;
        if draft.title.trim().is_empty() {
            return None;
        }

        let id = new_id();
        let listing = self.mirror.listings.append(Listing {
            slug: local_slug(&draft.title, &id),
            id,
            title: draft.title.trim().to_string(),
            description: draft.description.clone(),
            price: draft.price,
            category: draft.category.clone(),
            listing_type: draft.listing_type,
            user_id: user.id,
            images: draft.images.clone(),
            status: PublicationStatus::Published,
            created_at: now_rfc3339(),
        });

        self.navigate_to(Destination::listing(&listing.id));
        Some(listing)
    }

    /// Edit one of the current user's listings.
    pub fn update_listing(&self, listing_id: &str, update: &ListingUpdate) -> Option<Arc<Listing>> {
        let user = self.require_user("update_listing")?;
        let listing = self.mirror.listings.get_by_id(listing_id)?;
        if listing.user_id != user.id {
            tracing::debug!(listing_id, "Ignored edit of someone else's listing");
            return None;
        }
        self.mirror
            .listings
            .update(listing_id, |listing| update.apply(listing))
    }

    /// Delete one of the current user's listings.
    pub fn delete_listing(&self, listing_id: &str) -> bool {
        let Some(user) = self.require_user("delete_listing") else {
            return false;
        };
        let owned = self
            .mirror
            .listings
            .get_by_id(listing_id)
            .is_some_and(|l| l.user_id == user.id);
        if !owned {
            return false;
        }

        let removed = self.mirror.listings.remove(listing_id);
        if removed {
            self.navigate_to(Destination::MyListings);
        }
        removed
    }

    // ==================== FORUMS ====================

    /// Open a thread with its first post and show it.
    pub fn create_thread(&self, draft: &ThreadDraft) -> Option<Arc<ForumThread>> {
        let user = self.require_user("create_thread")?;
        let title = draft.title.trim();
        let content = draft.content.trim();
        if title.is_empty() || content.is_empty() {
            return None;
        }

        let id = new_id();
        let now = now_rfc3339();
        let thread = self.mirror.threads.append(ForumThread {
            slug: local_slug(title, &id),
            id,
            category_id: draft.category_id.clone(),
            title: title.to_string(),
            author_id: user.id.clone(),
            posts: vec![ForumPost {
                id: new_id(),
                author_id: user.id,
                content: content.to_string(),
                created_at: now.clone(),
            }],
            created_at: now,
            is_pinned: false,
            is_locked: false,
        });

        self.navigate_to(Destination::thread(&thread.id));
        Some(thread)
    }

    /// Reply in a thread. Locked threads take no replies.
    pub fn add_forum_post(&self, thread_id: &str, content: &str) -> Option<ForumPost> {
        let user = self.require_user("add_forum_post")?;
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        let thread = self.mirror.threads.get_by_id(thread_id)?;
        if thread.is_locked {
            tracing::debug!(thread_id, "Ignored reply to locked thread");
            return None;
        }

        let post = ForumPost {
            id: new_id(),
            author_id: user.id,
            content: content.to_string(),
            created_at: now_rfc3339(),
        };
        let added = post.clone();
        self.mirror.threads.update(thread_id, move |thread| ForumThread {
            posts: thread.posts.iter().cloned().chain([added]).collect(),
            ..thread.clone()
        })?;
        Some(post)
    }

    // ==================== GROUPS ====================

    /// Join or leave a group on behalf of `profile_id`.
    ///
    /// Members act for themselves; moderators may act for anyone.
    pub fn toggle_group_membership(&self, group_id: &str, profile_id: &str) -> Option<Arc<Group>> {
        let user = self.require_user("toggle_group_membership")?;
        if user.id != profile_id && !user.role.can_moderate() {
            tracing::debug!(group_id, profile_id, "Ignored membership change for another member");
            return None;
        }

        let now = now_rfc3339();
        let group = self
            .mirror
            .groups
            .update(group_id, |group| group.with_membership_toggled(profile_id, &now))?;

        tracing::debug!(
            group_id,
            profile_id,
            member = group.is_member(profile_id),
            member_count = group.member_count,
            "Group membership toggled"
        );
        Some(group)
    }

    /// Create a group with the current user as its admin.
    pub fn create_group(&self, draft: &GroupDraft) -> Option<Arc<Group>> {
        let user = self.require_user("create_group")?;
        let name = draft.name.trim();
        if name.is_empty() {
            return None;
        }

        let id = new_id();
        let now = now_rfc3339();
        let group = self.mirror.groups.append(Group {
            slug: local_slug(name, &id),
            id,
            name: name.to_string(),
            description: draft.description.clone(),
            category: draft.category.clone(),
            is_private: draft.is_private,
            members: vec![GroupMember {
                profile_id: user.id.clone(),
                role: GroupRole::Admin,
                joined_at: now.clone(),
            }],
            member_count: 1,
            created_by: user.id,
            created_at: now,
        });

        self.navigate_to(Destination::group(&group.id));
        Some(group)
    }

    // ==================== CONVERSATIONS ====================

    /// Open the one-to-one conversation with `other_id`, creating it once.
    pub fn start_conversation(&self, other_id: &str) -> Option<Arc<Conversation>> {
        let user = self.require_user("start_conversation")?;
        if other_id.is_empty() || other_id == user.id {
            return None;
        }

        let participant_ids = vec![user.id.clone(), other_id.to_string()];
        let (conversation, created) = self.mirror.conversations.find_or_append(
            |c| c.is_direct_between(&user.id, other_id),
            || {
                let now = now_rfc3339();
                Conversation {
                    id: new_id(),
                    participant_ids,
                    messages: Vec::new(),
                    last_message_at: now.clone(),
                    created_at: now,
                }
            },
        );
        if created {
            tracing::debug!(conversation_id = %conversation.id, "Conversation started");
        }

        self.navigate_to(Destination::conversation(&conversation.id));
        Some(conversation)
    }

    /// Send a message in a conversation the current user takes part in.
    pub fn send_message(&self, conversation_id: &str, content: &str) -> Option<Message> {
        let user = self.require_user("send_message")?;
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        let conversation = self.mirror.conversations.get_by_id(conversation_id)?;
        if !conversation.has_participant(&user.id) {
            tracing::debug!(conversation_id, "Ignored message from non-participant");
            return None;
        }

        let message = Message {
            id: new_id(),
            sender_id: user.id,
            content: content.to_string(),
            created_at: now_rfc3339(),
        };
        let added = message.clone();
        self.mirror
            .conversations
            .update(conversation_id, move |conversation| Conversation {
                last_message_at: added.created_at.clone(),
                messages: conversation.messages.iter().cloned().chain([added]).collect(),
                ..conversation.clone()
            })?;
        Some(message)
    }

    // ==================== PROFILE ====================

    /// Save the settings page.
    pub fn update_profile(&self, update: &ProfileUpdate) -> Option<Profile> {
        self.modify_current_user("update_profile", |user| {
            let updated = update.apply(user);
            let stored = updated.clone();
            self.mirror.profiles.update(&user.id, move |profile| Profile {
                full_name: stored.full_name,
                bio: stored.bio,
                location: stored.location,
                avatar_url: stored.avatar_url,
                cover_url: stored.cover_url,
                ..profile.clone()
            });
            updated
        })
    }
}
