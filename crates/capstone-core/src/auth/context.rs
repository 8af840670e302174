use crate::error::{ApiError, Result};

/// Authentication context available to every operation.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The authenticated user id (if any).
    uid: Option<String>,
    /// Verified email from the identity token.
    email: Option<String>,
    /// Whether the request is authenticated.
    authenticated: bool,
}

impl AuthContext {
    /// Create an unauthenticated context.
    pub fn unauthenticated() -> Self {
        Self {
            uid: None,
            email: None,
            authenticated: false,
        }
    }

    /// Create an authenticated context.
    pub fn authenticated(uid: impl Into<String>, email: Option<String>) -> Self {
        Self {
            uid: Some(uid.into()),
            email,
            authenticated: true,
        }
    }

    /// Check if the caller is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Get the caller's uid if authenticated.
    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    /// Get the caller's email, if the token carried one.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Get the caller's uid, returning an error if not authenticated.
    pub fn require_uid(&self) -> Result<&str> {
        self.uid
            .as_deref()
            .ok_or_else(|| ApiError::Unauthenticated("Authentication required".into()))
    }
}
