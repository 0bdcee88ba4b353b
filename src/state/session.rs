//! Session Store: the single record of who is logged in right now.
//!
//! SYSTEM CONTEXT
//! ==============
//! Constructed once at bootstrap from a [`NotexApi`] and handed to every
//! consumer by reference (Leptos context in the browser, a local in the CLI).
//! Tests build isolated instances around a scripted transport.
//!
//! DESIGN
//! ======
//! ```text
//!            restore: no token / fetch fails
//!   Unknown ─────────────────────────────────► Anonymous
//!      │                                         ▲   │
//!      │ restore: fetch ok          logout / 401 │   │ login ok
//!      ▼                                         │   ▼
//!   Authenticated(identity) ◄────────────────────┴───┘
//! ```
//!
//! The identity is only set after its fetch completes with the credential
//! still held, so `Authenticated` always implies a present token. A `401`
//! observed by the gateway fires a hook that drops a resolved session to
//! `Anonymous` immediately, and [`SessionStore::state`] reconciles against
//! the token holder so a cleared credential is never reported as
//! authenticated.
//!
//! ERROR HANDLING
//! ==============
//! `login` keeps the gateway's error kinds intact so callers can branch on
//! bad credentials (`401`), unverified account (`403`), and unreachable
//! server. A login whose follow-up identity fetch fails rolls the stored
//! credential back and ends `Anonymous`.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::net::api::NotexApi;
use crate::net::error::{ApiError, ErrorKind};
use crate::net::types::{Identity, LoginRequest};
use crate::token::{TokenHolder, TokenStoreError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Startup check has not resolved yet.
    #[default]
    Unknown,
    Anonymous,
    Authenticated(Identity),
}

impl SessionState {
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("could not persist credential: {0}")]
    Storage(#[from] TokenStoreError),
}

impl SessionError {
    /// Gateway error kind, or `None` for local storage failures.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Api(e) => Some(e.kind()),
            Self::Storage(_) => None,
        }
    }
}

struct Inner {
    api: NotexApi,
    state: RwLock<SessionState>,
}

impl Inner {
    fn tokens(&self) -> &TokenHolder {
        self.api.gateway().tokens()
    }

    fn replace(&self, next: SessionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    fn on_unauthorized(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let SessionState::Authenticated(identity) = &*state {
            tracing::info!(username = %identity.username, "credential rejected; session now anonymous");
            *state = SessionState::Anonymous;
        }
    }
}

/// Cheap-clone handle to the process-wide session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").field("state", &self.state()).finish()
    }
}

/// Non-owning counterpart of [`SessionStore`].
#[derive(Clone)]
pub struct WeakSessionStore {
    inner: Weak<Inner>,
}

impl std::fmt::Debug for WeakSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakSessionStore").field("alive", &(self.inner.strong_count() > 0)).finish()
    }
}

impl WeakSessionStore {
    #[must_use]
    pub fn upgrade(&self) -> Option<SessionStore> {
        self.inner.upgrade().map(|inner| SessionStore { inner })
    }
}

impl SessionStore {
    /// Create a store in [`SessionState::Unknown`] and subscribe it to the
    /// gateway's `401` notifications.
    pub fn new(api: NotexApi) -> Self {
        let inner = Arc::new(Inner { api, state: RwLock::new(SessionState::Unknown) });
        let weak: Weak<Inner> = Arc::downgrade(&inner);
        inner.api.gateway().on_unauthorized(move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_unauthorized();
            }
        });
        Self { inner }
    }

    #[must_use]
    pub fn api(&self) -> &NotexApi {
        &self.inner.api
    }

    /// Handle that does not keep the store alive. Use it from gateway hooks,
    /// which the store itself owns through its [`NotexApi`].
    #[must_use]
    pub fn downgrade(&self) -> WeakSessionStore {
        WeakSessionStore { inner: Arc::downgrade(&self.inner) }
    }

    /// Current state, reconciled with the token holder.
    #[must_use]
    pub fn state(&self) -> SessionState {
        let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, SessionState::Authenticated(_)) && !self.inner.tokens().is_present() {
            *state = SessionState::Anonymous;
        }
        state.clone()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state().identity().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    /// Startup check. With no stored credential this resolves to
    /// `Anonymous` without touching the network; otherwise the identity is
    /// fetched and any failure clears the credential.
    pub async fn restore(&self) -> SessionState {
        let tokens = self.inner.tokens();
        if !tokens.is_present() {
            tracing::debug!("no stored credential; session anonymous");
            self.inner.replace(SessionState::Anonymous);
            return SessionState::Anonymous;
        }

        let next = match self.inner.api.me().await {
            Ok(identity) if tokens.is_present() => {
                tracing::info!(username = %identity.username, "session restored");
                SessionState::Authenticated(identity)
            }
            Ok(_) => SessionState::Anonymous,
            Err(e) => {
                tracing::warn!(error = %e, "stored credential rejected at startup");
                tokens.clear();
                SessionState::Anonymous
            }
        };
        self.inner.replace(next.clone());
        next
    }

    /// Exchange credentials for a token, persist it, then fetch the identity.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Api`] when the login call or the identity
    /// fetch fails, and [`SessionError::Storage`] when the token cannot be
    /// persisted.
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, SessionError> {
        let tokens = self.inner.tokens();
        let request = LoginRequest { username: username.to_owned(), password: password.to_owned() };

        let response = match self.inner.api.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::info!(%username, kind = ?e.kind(), "login rejected");
                self.settle_after_failure();
                return Err(e.into());
            }
        };

        if let Err(e) = tokens.set(&response.token) {
            tracing::warn!(error = %e, "could not persist credential after login");
            self.settle_after_failure();
            return Err(e.into());
        }

        match self.inner.api.me().await {
            Ok(identity) if tokens.is_present() => {
                tracing::info!(username = %identity.username, "login complete");
                self.inner.replace(SessionState::Authenticated(identity.clone()));
                Ok(identity)
            }
            Ok(_) => {
                self.inner.replace(SessionState::Anonymous);
                Err(ApiError::Unauthorized(None).into())
            }
            Err(e) => {
                tracing::warn!(error = %e, "identity fetch failed after login; discarding credential");
                tokens.clear();
                self.inner.replace(SessionState::Anonymous);
                Err(e.into())
            }
        }
    }

    /// Clear the credential and the identity. No network call.
    pub fn logout(&self) {
        self.inner.tokens().clear();
        self.inner.replace(SessionState::Anonymous);
        tracing::info!("logged out");
    }

    /// Re-fetch the identity, e.g. after a profile update.
    ///
    /// # Errors
    ///
    /// Returns the gateway error. A `401` also leaves the session
    /// `Anonymous`; other failures keep the current state.
    pub async fn refresh(&self) -> Result<Identity, SessionError> {
        match self.inner.api.me().await {
            Ok(identity) if self.inner.tokens().is_present() => {
                self.inner.replace(SessionState::Authenticated(identity.clone()));
                Ok(identity)
            }
            Ok(_) => {
                self.inner.replace(SessionState::Anonymous);
                Err(ApiError::Unauthorized(None).into())
            }
            Err(e) => {
                if e.kind() == ErrorKind::Unauthorized {
                    self.inner.replace(SessionState::Anonymous);
                }
                Err(e.into())
            }
        }
    }

    /// A failed login never leaves an unresolved or credential-less session
    /// in any state other than `Anonymous`.
    fn settle_after_failure(&self) {
        let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
        let authenticated = matches!(*state, SessionState::Authenticated(_));
        if !authenticated || !self.inner.tokens().is_present() {
            *state = SessionState::Anonymous;
        }
    }
}
