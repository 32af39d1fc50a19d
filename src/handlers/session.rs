//! Session actions. The auth service is the authority; after every change the
//! session is read back from it instead of being assumed.

use super::App;
use crate::auth::{bootstrap_session, AuthClient};
use crate::fetch::ApiClient;
use crate::models::Profile;
use crate::navigation::Destination;

impl App {
    /// Restore the session at startup.
    pub async fn bootstrap(&self, auth: &dyn AuthClient, api: &ApiClient) -> Option<Profile> {
        let session = bootstrap_session(auth, api).await;
        self.set_session(session);
        self.current_user()
    }

    /// Sign in with email and password.
    ///
    /// A refused sign-in leaves the visitor signed out with the dialog open.
    pub async fn sign_in(
        &self,
        auth: &dyn AuthClient,
        api: &ApiClient,
        email: &str,
        password: &str,
    ) -> Option<Profile> {
        if let Err(e) = auth.sign_in_email(email.trim(), password).await {
            tracing::warn!("Sign-in refused: {}", e);
            return None;
        }
        let user = self.bootstrap(auth, api).await;
        if user.is_some() {
            self.close_auth_modals();
        }
        user
    }

    /// Create an account; the auth service signs the new member in.
    pub async fn sign_up(
        &self,
        auth: &dyn AuthClient,
        api: &ApiClient,
        name: &str,
        email: &str,
        password: &str,
    ) -> Option<Profile> {
        if let Err(e) = auth.sign_up_email(name.trim(), email.trim(), password).await {
            tracing::warn!("Sign-up refused: {}", e);
            return None;
        }
        let user = self.bootstrap(auth, api).await;
        if user.is_some() {
            self.close_auth_modals();
        }
        user
    }

    /// Sign out and go home. The local session is cleared even when the
    /// auth service cannot be reached.
    pub async fn sign_out(&self, auth: &dyn AuthClient) -> String {
        if let Err(e) = auth.sign_out().await {
            tracing::warn!("Sign-out call failed: {}", e);
        }
        self.set_session(crate::auth::Session::signed_out());
        self.close_report();
        self.navigate_to(Destination::Home)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::super::test_support::*;
    use super::*;
    use crate::auth::{AuthSession, AuthSessionInfo, AuthUser};
    use crate::errors::AppError;

    /// Auth service double; rejects every call when `reachable` is false.
    struct FakeAuth {
        reachable: bool,
        signed_in: AtomicBool,
    }

    #[async_trait]
    impl AuthClient for FakeAuth {
        async fn get_session(&self) -> Result<Option<AuthSession>, AppError> {
            if !self.signed_in.load(Ordering::SeqCst) {
                return Ok(None);
            }
            Ok(Some(AuthSession {
                session: AuthSessionInfo {
                    id: "s1".to_string(),
                    token: "tok".to_string(),
                    user_id: "u1".to_string(),
                    expires_at: String::new(),
                },
                user: AuthUser {
                    id: "u1".to_string(),
                    email: "camille@example.fr".to_string(),
                    name: "Camille".to_string(),
                    image: None,
                    role: None,
                    banned: None,
                    created_at: None,
                },
            }))
        }

        async fn sign_in_email(&self, _email: &str, password: &str) -> Result<(), AppError> {
            if !self.reachable || password != "secret" {
                return Err(AppError::Unauthorized("bad credentials".to_string()));
            }
            self.signed_in.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn sign_up_email(&self, _: &str, _: &str, _: &str) -> Result<(), AppError> {
            Err(AppError::Validation("email taken".to_string()))
        }

        async fn sign_out(&self) -> Result<(), AppError> {
            self.signed_in.store(false, Ordering::SeqCst);
            if self.reachable {
                Ok(())
            } else {
                Err(AppError::Upstream {
                    message: "unreachable".to_string(),
                    status: None,
                })
            }
        }
    }

    fn unreachable_api() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9").unwrap()
    }

    #[tokio::test]
    async fn test_refused_sign_in_stays_signed_out() {
        let app = signed_out_app();
        app.open_login();
        let auth = FakeAuth {
            reachable: true,
            signed_in: AtomicBool::new(false),
        };

        assert!(app
            .sign_in(&auth, &unreachable_api(), "camille@example.fr", "wrong")
            .await
            .is_none());
        assert!(app.current_user().is_none());
        assert!(app.modals().login_open);
    }

    #[tokio::test]
    async fn test_sign_in_without_profile_enrichment_is_signed_out() {
        let app = signed_out_app();
        let auth = FakeAuth {
            reachable: true,
            signed_in: AtomicBool::new(false),
        };

        let user = app
            .sign_in(&auth, &unreachable_api(), "camille@example.fr", "secret")
            .await;
        assert!(user.is_none());
        assert!(app.auth_user().is_none());
    }

    #[tokio::test]
    async fn test_refused_sign_up() {
        let app = signed_out_app();
        let auth = FakeAuth {
            reachable: true,
            signed_in: AtomicBool::new(false),
        };
        assert!(app
            .sign_up(&auth, &unreachable_api(), "Camille", "camille@example.fr", "secret")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_even_when_unreachable() {
        let app = signed_in_app();
        app.navigate_to(Destination::Settings);
        let auth = FakeAuth {
            reachable: false,
            signed_in: AtomicBool::new(true),
        };

        let path = app.sign_out(&auth).await;
        assert_eq!(path, "/");
        assert_eq!(app.location(), "/");
        assert!(app.current_user().is_none());
    }
}
