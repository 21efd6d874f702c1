//! Bearer-token session handed explicitly to the HTTP layer.

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::model::AuthResponse;

/// Read-only authentication context shared by every outgoing request.
///
/// Cloning is cheap; all clones see the same token. The core never changes it.
#[derive(Clone, Default)]
pub struct Session {
    token: Option<Arc<SecretString>>,
    username: Option<String>,
}

impl Session {
    /// Session without credentials; requests go out unauthenticated.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Session carrying a pre-issued token.
    #[must_use]
    pub fn with_token(token: SecretString) -> Self {
        Self {
            token: Some(Arc::new(token)),
            username: None,
        }
    }

    /// Session built from a login or register response.
    #[must_use]
    pub fn from_auth(response: AuthResponse) -> Self {
        Self {
            token: Some(Arc::new(SecretString::from(response.token))),
            username: Some(response.username),
        }
    }

    /// Value for the `Authorization` header, if any.
    #[must_use]
    pub fn bearer(&self) -> Option<String> {
        self.token
            .as_ref()
            .map(|token| format!("Bearer {}", token.expose_secret()))
    }

    /// Whether a token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Account name, when known.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("username", &self.username)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_only_when_token_present() {
        assert_eq!(Session::anonymous().bearer(), None);
        let session = Session::with_token(SecretString::from("abc".to_owned()));
        assert_eq!(session.bearer().as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn debug_output_hides_token() {
        let session = Session::from_auth(AuthResponse {
            token: "super-secret".to_owned(),
            role: "ADMIN".to_owned(),
            username: "ops".to_owned(),
        });
        let printed = format!("{session:?}");
        assert!(!printed.contains("super-secret"), "token leaked: {printed}");
        assert_eq!(session.username(), Some("ops"));
    }
}
