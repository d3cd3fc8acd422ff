// Auth/session proxy over the identity service
use crate::error::{AppError, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::watch;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles");
}

/// Shape check shared by sign-up and the operator tools.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }

    pub fn dashboard_route(&self) -> &'static str {
        match self {
            UserRole::Admin => "/admin",
            UserRole::User => "/dashboard",
        }
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            other => Err(AppError::InvalidInput(format!("unknown role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;
    async fn sign_up(&self, email: &str, password: &str, name: Option<&str>) -> Result<Session>;
}

/// Holds the signed-in session and broadcasts every change to subscribers.
pub struct AuthSession<B> {
    backend: B,
    state: watch::Sender<Option<Session>>,
}

impl<B: AuthBackend> AuthSession<B> {
    pub fn new(backend: B) -> Self {
        let (state, _) = watch::channel(None);
        Self { backend, state }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let session = self.backend.sign_in(email, password).await?;
        Ok(self.adopt(session))
    }

    pub async fn sign_up(&self, email: &str, password: &str, name: Option<&str>) -> Result<User> {
        let session = self.backend.sign_up(email, password, name).await?;
        Ok(self.adopt(session))
    }

    pub fn sign_out(&self) {
        if self.state.send_replace(None).is_some() {
            tracing::info!("Signed out");
        }
    }

    fn adopt(&self, session: Session) -> User {
        let user = session.user.clone();
        tracing::info!("Signed in as {} ({})", user.email, user.role.as_str());
        self.state.send_replace(Some(session));
        user
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().as_ref().map(|session| session.user.clone())
    }

    /// A receiver whose first `borrow()` is the current state.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    /// Where a freshly signed-in (or signed-out) user should land.
    pub fn dashboard_route(&self) -> &'static str {
        match self.state.borrow().as_ref() {
            Some(session) => session.user.role.dashboard_route(),
            None => "/",
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub(crate) struct FakeAuth {
        pub calls: AtomicUsize,
    }

    pub(crate) fn session_for(email: &str, role: UserRole) -> Session {
        Session {
            token: format!("token-{}", email),
            user: User {
                id: 7,
                email: email.to_string(),
                name: None,
                role,
            },
        }
    }

    #[async_trait]
    impl AuthBackend for FakeAuth {
        async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if password != "hunter22" {
                return Err(AppError::Upstream { status: 401, message: "Invalid email or password".to_string() });
            }
            let role = if email.starts_with("admin") { UserRole::Admin } else { UserRole::User };
            Ok(session_for(email, role))
        }

        async fn sign_up(&self, email: &str, _password: &str, name: Option<&str>) -> Result<Session> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut session = session_for(email, UserRole::User);
            session.user.name = name.map(str::to_string);
            Ok(session)
        }
    }

    #[tokio::test]
    async fn test_sign_in_routes_by_role() {
        let auth = AuthSession::new(FakeAuth::default());
        assert_eq!(auth.dashboard_route(), "/");

        let user = auth.sign_in("admin@example.com", "hunter22").await.unwrap();
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(auth.dashboard_route(), "/admin");

        auth.sign_out();
        auth.sign_in("sam@example.com", "hunter22").await.unwrap();
        assert_eq!(auth.dashboard_route(), "/dashboard");
    }

    #[tokio::test]
    async fn test_failed_sign_in_keeps_signed_out() {
        let auth = AuthSession::new(FakeAuth::default());
        let err = auth.sign_in("sam@example.com", "wrong").await.unwrap_err();

        assert_eq!(err.user_message(), crate::error::GENERIC_FAILURE);
        assert!(auth.current().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_state_changes() {
        let auth = AuthSession::new(FakeAuth::default());
        let mut changes = auth.subscribe();
        assert!(changes.borrow().is_none());

        auth.sign_up("new@example.com", "hunter22", Some("New")).await.unwrap();
        changes.changed().await.unwrap();
        let name = changes.borrow_and_update().as_ref().and_then(|s| s.user.name.clone());
        assert_eq!(name.as_deref(), Some("New"));

        auth.sign_out();
        changes.changed().await.unwrap();
        assert!(changes.borrow().is_none());
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("  ana@example.com "));
        assert!(!is_valid_email("ana@"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("an a@example.com"));
        assert!(!is_valid_email("@"));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("user".parse::<UserRole>().unwrap(), UserRole::User);
        assert!("root".parse::<UserRole>().is_err());
        assert_eq!(UserRole::default(), UserRole::User);
    }
}
