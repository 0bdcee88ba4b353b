//! Auth-session state for the current browser user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Used by route guards and user-aware components to coordinate login
//! redirects and identity-dependent rendering. The core [`SessionStore`] is
//! the source of truth; [`AuthState`] is its reactive projection, re-synced
//! after every session operation and after any `401` the gateway observes.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use leptos::prelude::*;
use notex::net::types::Identity;
use notex::{ClientConfig, Gateway, NotexApi, SessionError, SessionState, SessionStore, TokenHolder};

use crate::net::browser::BrowserTransport;
use crate::util::token_storage::LocalStorageTokenStore;

/// Authentication state tracking the current user and loading status.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<Identity>,
    /// True until the startup check has resolved.
    pub loading: bool,
}

impl AuthState {
    #[must_use]
    pub fn from_session(state: &SessionState) -> Self {
        match state {
            SessionState::Unknown => Self { user: None, loading: true },
            SessionState::Anonymous => Self { user: None, loading: false },
            SessionState::Authenticated(identity) => Self { user: Some(identity.clone()), loading: false },
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(Identity::is_admin)
    }
}

/// Session store paired with the signal components read.
#[derive(Clone, Debug)]
pub struct Auth {
    pub session: SessionStore,
    pub state: RwSignal<AuthState>,
}

impl Auth {
    pub fn new(session: SessionStore) -> Self {
        let state = RwSignal::new(AuthState::from_session(&session.state()));
        Self { session, state }
    }

    #[must_use]
    pub fn api(&self) -> &NotexApi {
        self.session.api()
    }

    /// Push the session's current state into the signal.
    pub fn sync(&self) {
        let next = AuthState::from_session(&self.session.state());
        if self.state.try_get_untracked().as_ref() != Some(&next) {
            let _ = self.state.try_set(next);
        }
    }

    pub async fn restore(&self) {
        self.session.restore().await;
        self.sync();
    }

    /// # Errors
    ///
    /// Returns the session error unchanged so the login form can branch on
    /// its kind.
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, SessionError> {
        let result = self.session.login(username, password).await;
        self.sync();
        result
    }

    pub fn logout(&self) {
        self.session.logout();
        self.sync();
    }

    /// # Errors
    ///
    /// Returns the session error unchanged.
    pub async fn refresh(&self) -> Result<Identity, SessionError> {
        let result = self.session.refresh().await;
        self.sync();
        result
    }
}

/// Build the process-wide session over `localStorage` and `fetch`.
pub fn browser_session(config: &ClientConfig) -> SessionStore {
    let tokens = TokenHolder::new(LocalStorageTokenStore::default());
    let gateway = Gateway::new(BrowserTransport::new(config), tokens).with_default_timeout(config.timeouts.request());
    SessionStore::new(NotexApi::new(gateway))
}

/// Provide [`Auth`] and its `RwSignal<AuthState>` as context, and keep the
/// signal in step with `401`s seen by any request.
pub fn provide_auth(session: SessionStore) -> Auth {
    let auth = Auth::new(session);
    // The gateway owns its hooks and the session owns the gateway.
    let session = auth.session.downgrade();
    let state = auth.state;
    auth.api().gateway().on_unauthorized(move || {
        if let Some(session) = session.upgrade() {
            Auth { session, state }.sync();
        }
    });
    provide_context(auth.clone());
    provide_context(auth.state);
    auth
}

/// Fetch the [`Auth`] installed by [`provide_auth`].
pub fn use_auth() -> Auth {
    expect_context::<Auth>()
}
