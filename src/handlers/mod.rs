//! Application root: owns the mirror, the session, the history and the
//! modal flags, and implements every user action as an optimistic update.
//!
//! Handlers are synchronous and never wait for the network. A handler whose
//! preconditions fail (usually: nobody signed in) does nothing and returns
//! `None`; the view layer is expected to disable the control beforehand.

mod commerce;
mod community;
mod directory;
mod moderation;
mod session;

use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{AuthSession, Session};
use crate::models::{Profile, ReportTarget};
use crate::navigation::{resolve, Destination, Navigator};
use crate::store::Mirror;

/// Transient UI flags. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalState {
    pub report_target: Option<ReportTarget>,
    pub login_open: bool,
    pub register_open: bool,
}

/// The application root.
pub struct App {
    mirror: Arc<Mirror>,
    navigator: Navigator,
    session: RwLock<Session>,
    modals: RwLock<ModalState>,
}

impl App {
    pub fn new(mirror: Arc<Mirror>) -> Self {
        Self {
            mirror,
            navigator: Navigator::new(),
            session: RwLock::new(Session::signed_out()),
            modals: RwLock::new(ModalState::default()),
        }
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Resolve `destination`, push it on the history and reset the scroll.
    pub fn navigate_to(&self, destination: Destination) -> String {
        let path = resolve(&destination, &self.mirror);
        self.navigator.push(path.clone());
        path
    }

    pub fn location(&self) -> String {
        self.navigator.location()
    }

    pub fn current_user(&self) -> Option<Profile> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current_user
            .clone()
    }

    pub fn auth_user(&self) -> Option<AuthSession> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .auth_user
            .clone()
    }

    pub fn set_session(&self, session: Session) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    pub fn modals(&self) -> ModalState {
        self.modals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ==================== MODALS ====================

    pub fn open_login(&self) {
        self.update_modals(|m| {
            m.login_open = true;
            m.register_open = false;
        });
    }

    pub fn open_register(&self) {
        self.update_modals(|m| {
            m.register_open = true;
            m.login_open = false;
        });
    }

    pub fn close_auth_modals(&self) {
        self.update_modals(|m| {
            m.login_open = false;
            m.register_open = false;
        });
    }

    /// Open the report dialog on `target`; signed-out visitors get the login dialog.
    pub fn open_report(&self, target: ReportTarget) {
        if self.current_user().is_none() {
            self.open_login();
            return;
        }
        self.update_modals(|m| m.report_target = Some(target));
    }

    pub fn close_report(&self) {
        self.update_modals(|m| m.report_target = None);
    }

    fn update_modals(&self, f: impl FnOnce(&mut ModalState)) {
        f(&mut self.modals.write().unwrap_or_else(PoisonError::into_inner));
    }

    // ==================== PRECONDITIONS ====================

    /// The signed-in profile, or `None` (logged) for a no-op.
    fn require_user(&self, action: &str) -> Option<Profile> {
        let user = self.current_user();
        if user.is_none() {
            tracing::debug!(action, "Ignored: no current user");
        }
        user
    }

    fn require_moderator(&self, action: &str) -> Option<Profile> {
        let user = self.require_user(action)?;
        if !user.role.can_moderate() {
            tracing::debug!(action, user_id = %user.id, "Ignored: not a moderator");
            return None;
        }
        Some(user)
    }

    /// Read-modify-write of the current user under one session lock.
    fn modify_current_user<F>(&self, action: &str, f: F) -> Option<Profile>
    where
        F: FnOnce(&Profile) -> Profile,
    {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        let Some(current) = session.current_user.as_ref() else {
            tracing::debug!(action, "Ignored: no current user");
            return None;
        };
        let updated = f(current);
        session.current_user = Some(updated.clone());
        Some(updated)
    }
}

/// Client-side id: UUID v7, ordered by creation time.
pub(crate) fn new_id() -> String {
    Uuid::now_v7().to_string()
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Slug for a locally created record, suffixed to stay distinct from server slugs.
pub(crate) fn local_slug(title: &str, id: &str) -> String {
    let base = crate::models::slugify(title);
    let start = id.char_indices().rev().nth(5).map(|(i, _)| i).unwrap_or(0);
    let suffix = &id[start..];
    if base.is_empty() {
        suffix.to_string()
    } else {
        format!("{}-{}", base, suffix)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::models::ReportTargetKind;

    #[test]
    fn test_navigate_to_pushes_resolved_path() {
        let app = signed_out_app();
        let path = app.navigate_to(Destination::Events);
        assert_eq!(path, "/events");
        assert_eq!(app.location(), "/events");
        assert_eq!(app.navigator().scroll_resets(), 1);
    }

    #[test]
    fn test_report_modal_needs_user() {
        let target = ReportTarget {
            kind: ReportTargetKind::Listing,
            id: "l1".to_string(),
        };

        let guest = signed_out_app();
        guest.open_report(target.clone());
        assert!(guest.modals().login_open);
        assert!(guest.modals().report_target.is_none());

        let member = signed_in_app();
        member.open_report(target.clone());
        assert_eq!(member.modals().report_target, Some(target));
        member.close_report();
        assert!(member.modals().report_target.is_none());
    }

    #[test]
    fn test_login_and_register_are_exclusive() {
        let app = signed_out_app();
        app.open_login();
        app.open_register();
        let modals = app.modals();
        assert!(modals.register_open);
        assert!(!modals.login_open);
        app.close_auth_modals();
        assert_eq!(app.modals(), ModalState::default());
    }

    #[test]
    fn test_local_slug() {
        assert_eq!(
            local_slug("Vends vélo", "0190aaaa-bbbb-7ccc-8ddd-eeeeee123456"),
            "vends-velo-123456"
        );
        assert_eq!(local_slug("???", "abcdef123"), "def123");
    }
}
