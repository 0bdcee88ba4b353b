//! Error taxonomy surfaced by the gateway to every caller.
//!
//! ERROR HANDLING
//! ==============
//! The only local recovery is clearing the credential on `401`, done in
//! middleware. Everything here is returned to the caller unmodified so the
//! presentation layer decides what the user sees.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use std::collections::BTreeMap;

use serde::Deserialize;

use super::transport::{ApiResponse, TransportError};

/// Structured error body the server attaches to non-2xx responses.
///
/// All fields are optional; validation failures additionally carry a
/// field-name to message map in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ErrorBody {
    pub timestamp: Option<String>,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub errors: BTreeMap<String, String>,
}

impl ErrorBody {
    /// Lenient decode: anything that is not a JSON object yields `None`.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_slice(raw).ok()?;
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

/// Flat classification used by callers to branch on failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unreachable,
    TimedOut,
    Cancelled,
    BadRequest,
    Unauthorized,
    Forbidden,
    Conflict,
    Status,
    Malformed,
    InvalidRequest,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("server unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out")]
    TimedOut,

    #[error("request cancelled")]
    Cancelled,

    #[error("bad request{}", detail(.0))]
    BadRequest(Option<ErrorBody>),

    #[error("unauthorized{}", detail(.0))]
    Unauthorized(Option<ErrorBody>),

    #[error("forbidden{}", detail(.0))]
    Forbidden(Option<ErrorBody>),

    #[error("conflict{}", detail(.0))]
    Conflict(Option<ErrorBody>),

    #[error("request failed with status {status}{}", detail(.body))]
    Status { status: u16, body: Option<ErrorBody> },

    /// A 2xx response whose body did not decode into the expected shape.
    #[error("malformed response body: {0}")]
    Malformed(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn detail(body: &Option<ErrorBody>) -> String {
    body.as_ref()
        .and_then(|b| b.message.as_deref())
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl ApiError {
    /// Classify a non-2xx response.
    #[must_use]
    pub fn from_response(response: &ApiResponse) -> Self {
        let body = ErrorBody::parse(&response.body);
        match response.status {
            400 => Self::BadRequest(body),
            401 => Self::Unauthorized(body),
            403 => Self::Forbidden(body),
            409 => Self::Conflict(body),
            status => Self::Status { status, body },
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unreachable(_) => ErrorKind::Unreachable,
            Self::TimedOut => ErrorKind::TimedOut,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Status { .. } => ErrorKind::Status,
            Self::Malformed(_) => ErrorKind::Malformed,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    /// HTTP status when a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest(_) => Some(400),
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::Conflict(_) => Some(409),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            Self::BadRequest(body)
            | Self::Unauthorized(body)
            | Self::Forbidden(body)
            | Self::Conflict(body)
            | Self::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Server-supplied message, if the response carried one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.body().and_then(|b| b.message.as_deref())
    }

    /// Per-field validation messages from a `400` response.
    #[must_use]
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::BadRequest(Some(body)) if !body.errors.is_empty() => Some(&body.errors),
            _ => None,
        }
    }

    /// True when no response arrived at all.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unreachable | ErrorKind::TimedOut)
    }
}

impl From<TransportError> for ApiError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Unreachable(reason) => Self::Unreachable(reason),
            TransportError::TimedOut => Self::TimedOut,
            TransportError::InvalidRequest(reason) => Self::InvalidRequest(reason),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidRequest(format!("payload encode failed: {e}"))
    }
}
