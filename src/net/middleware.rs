//! Request/response interceptors expressed as transport decorators.
//!
//! SYSTEM CONTEXT
//! ==============
//! The gateway stacks these as `ClearOnUnauthorized(BearerAuth(transport))`.
//! Each decorator is itself a [`Transport`], so either policy can be tested
//! against a scripted transport without a network library.

#[cfg(test)]
#[path = "middleware_test.rs"]
mod middleware_test;

use std::sync::{Arc, Mutex, PoisonError};

use super::transport::{AUTHORIZATION, ApiRequest, ApiResponse, Transport, TransportError};
use crate::token::TokenHolder;

pub const UNAUTHORIZED: u16 = 401;

type Hook = Arc<dyn Fn() + Send + Sync>;

/// Callbacks fired after a `401` has cleared the credential.
#[derive(Clone, Default)]
pub struct UnauthorizedHooks {
    hooks: Arc<Mutex<Vec<Hook>>>,
}

impl UnauthorizedHooks {
    pub fn register(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(hook));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fire(&self) {
        // Snapshot so a hook may register further hooks without deadlocking.
        let hooks: Vec<Hook> = self
            .hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for hook in hooks {
            hook();
        }
    }
}

impl std::fmt::Debug for UnauthorizedHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnauthorizedHooks").field("len", &self.len()).finish()
    }
}

// =============================================================================
// BEARER INJECTION
// =============================================================================

/// Attaches `Authorization: Bearer <token>` when a credential is held.
pub struct BearerAuth<T> {
    inner: T,
    tokens: TokenHolder,
}

impl<T> BearerAuth<T> {
    pub fn new(inner: T, tokens: TokenHolder) -> Self {
        Self { inner, tokens }
    }
}

/// Apply the bearer policy to `request` using the credential held right now.
pub fn attach_bearer(request: &mut ApiRequest, tokens: &TokenHolder) {
    match tokens.get() {
        Some(token) => request.set_header(AUTHORIZATION, format!("Bearer {token}")),
        None => request.remove_header(AUTHORIZATION),
    }
}

#[async_trait::async_trait(?Send)]
impl<T: Transport> Transport for BearerAuth<T> {
    async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, TransportError> {
        attach_bearer(&mut request, &self.tokens);
        self.inner.send(request).await
    }
}

// =============================================================================
// 401 HANDLING
// =============================================================================

/// Clears the credential on any `401`, then hands the response back untouched.
pub struct ClearOnUnauthorized<T> {
    inner: T,
    tokens: TokenHolder,
    hooks: UnauthorizedHooks,
}

impl<T> ClearOnUnauthorized<T> {
    pub fn new(inner: T, tokens: TokenHolder, hooks: UnauthorizedHooks) -> Self {
        Self { inner, tokens, hooks }
    }
}

/// Apply the `401` policy to a received response.
pub fn observe_response(response: &ApiResponse, path: &str, tokens: &TokenHolder, hooks: &UnauthorizedHooks) {
    if response.status != UNAUTHORIZED {
        return;
    }
    tracing::warn!(%path, "server rejected credential; clearing stored token");
    tokens.clear();
    hooks.fire();
}

#[async_trait::async_trait(?Send)]
impl<T: Transport> Transport for ClearOnUnauthorized<T> {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let path = request.path.clone();
        let response = self.inner.send(request).await?;
        observe_response(&response, &path, &self.tokens, &self.hooks);
        Ok(response)
    }
}
