//! Shared auth UI helpers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route components should apply identical unauthenticated redirect behavior,
//! and the login form branches on why a login failed.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use leptos::prelude::*;
use leptos_router::NavigateOptions;
use notex::{ErrorKind, SessionError};

use crate::state::auth::AuthState;

/// True once the startup check has resolved with no user.
pub fn should_redirect_unauth(state: &AuthState) -> bool {
    !state.loading && state.user.is_none()
}

/// Redirect to `/login` whenever auth has loaded and no user is present.
pub fn install_unauth_redirect<F>(auth: RwSignal<AuthState>, navigate: F)
where
    F: Fn(&str, NavigateOptions) + Clone + 'static,
{
    Effect::new(move || {
        if should_redirect_unauth(&auth.get()) {
            navigate("/login", NavigateOptions::default());
        }
    });
}

/// Login outcome categories the form renders differently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginFailure {
    BadCredentials,
    Unverified,
    Unreachable,
    Other(String),
}

impl LoginFailure {
    pub fn classify(error: &SessionError) -> Self {
        match error.kind() {
            Some(ErrorKind::Unauthorized) => Self::BadCredentials,
            Some(ErrorKind::Forbidden) => Self::Unverified,
            Some(ErrorKind::Unreachable | ErrorKind::TimedOut) => Self::Unreachable,
            _ => Self::Other(error.to_string()),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadCredentials => "Invalid username or password.",
            Self::Unverified => "Please verify your account before logging in.",
            Self::Unreachable => "Cannot reach the server. Try again later.",
            Self::Other(detail) => detail,
        }
    }

    /// Unverified accounts are sent to the verification screen.
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            Self::Unverified => Some("/verify"),
            _ => None,
        }
    }
}
