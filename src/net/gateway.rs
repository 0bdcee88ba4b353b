//! Remote API Gateway: the sole egress point for network calls.
//!
//! SYSTEM CONTEXT
//! ==============
//! Built once at bootstrap around a concrete [`Transport`] and shared by the
//! session store and every endpoint wrapper. All requests pass through the
//! bearer and `401` middleware; callers see either a decoded body or an
//! [`ApiError`].
//!
//! TRADE-OFFS
//! ==========
//! Every call is one-shot: no retry, no queueing while unauthenticated, no
//! ordering between concurrent calls. A default deadline and an optional
//! cancellation token keep a hung server from blocking a caller forever.

#[cfg(test)]
#[path = "gateway_test.rs"]
mod gateway_test;

use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::error::ApiError;
use super::middleware::{BearerAuth, ClearOnUnauthorized, UnauthorizedHooks};
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::token::TokenHolder;

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Deadline for this call; falls back to the gateway default.
    pub timeout: Option<Duration>,
    /// Abort the call with [`ApiError::Cancelled`] once triggered.
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Times a call for the request log. `std::time::Instant` panics on
/// `wasm32-unknown-unknown`, so elapsed time is only reported natively.
#[derive(Debug, Clone, Copy)]
struct Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    started: std::time::Instant,
}

impl Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    fn start() -> Self {
        Self { started: std::time::Instant::now() }
    }

    #[cfg(target_arch = "wasm32")]
    fn start() -> Self {
        Self {}
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn elapsed_ms(self) -> Option<u64> {
        Some(u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX))
    }

    #[cfg(target_arch = "wasm32")]
    #[allow(clippy::unused_self)]
    fn elapsed_ms(self) -> Option<u64> {
        None
    }
}

pub struct Gateway {
    transport: Box<dyn Transport>,
    tokens: TokenHolder,
    hooks: UnauthorizedHooks,
    default_timeout: Option<Duration>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("tokens", &self.tokens)
            .field("hooks", &self.hooks)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Wrap `transport` with credential injection and `401` handling.
    pub fn new(transport: impl Transport + 'static, tokens: TokenHolder) -> Self {
        let hooks = UnauthorizedHooks::default();
        let stack = ClearOnUnauthorized::new(BearerAuth::new(transport, tokens.clone()), tokens.clone(), hooks.clone());
        Self { transport: Box::new(stack), tokens, hooks, default_timeout: None }
    }

    /// Deadline applied to calls that do not carry their own.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenHolder {
        &self.tokens
    }

    /// Register a callback fired after any `401` has cleared the credential.
    pub fn on_unauthorized(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.hooks.register(hook);
    }

    /// Issue `request` and return the raw response if it is 2xx.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for transport failures, cancellation, and any
    /// non-2xx status.
    pub async fn execute(&self, mut request: ApiRequest, options: &RequestOptions) -> Result<ApiResponse, ApiError> {
        if let Some(timeout) = options.timeout.or(request.timeout).or(self.default_timeout) {
            request.timeout = Some(timeout);
        }
        let method = request.method;
        let path = request.path.clone();
        let watch = Stopwatch::start();

        let sent = self.transport.send(request);
        let outcome = match &options.cancel {
            None => sent.await,
            Some(token) => {
                let cancelled = std::pin::pin!(token.cancelled());
                match futures::future::select(sent, cancelled).await {
                    futures::future::Either::Left((outcome, _)) => outcome,
                    futures::future::Either::Right(((), _)) => {
                        tracing::debug!(%method, %path, elapsed_ms = watch.elapsed_ms(), "request cancelled");
                        return Err(ApiError::Cancelled);
                    }
                }
            }
        };

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    %method,
                    %path,
                    elapsed_ms = watch.elapsed_ms(),
                    error = %e,
                    "request failed without response"
                );
                return Err(e.into());
            }
        };

        if response.is_success() {
            tracing::debug!(
                %method,
                %path,
                status = response.status,
                elapsed_ms = watch.elapsed_ms(),
                "request ok"
            );
            Ok(response)
        } else {
            tracing::debug!(
                %method,
                %path,
                status = response.status,
                elapsed_ms = watch.elapsed_ms(),
                "request rejected"
            );
            Err(ApiError::from_response(&response))
        }
    }

    /// Issue `request` and decode a JSON body.
    ///
    /// # Errors
    ///
    /// As [`Gateway::execute`], plus [`ApiError::Malformed`] when the body does
    /// not decode into `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.send_json_with(request, &RequestOptions::default()).await
    }

    /// [`Gateway::send_json`] with per-call options.
    ///
    /// # Errors
    ///
    /// As [`Gateway::send_json`].
    pub async fn send_json_with<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self.execute(request, options).await?;
        response.json().map_err(|e| ApiError::Malformed(e.to_string()))
    }

    /// Issue `request` and discard the body.
    ///
    /// # Errors
    ///
    /// As [`Gateway::execute`].
    pub async fn send_unit(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(request, &RequestOptions::default()).await.map(|_| ())
    }
}
