//! Networking modules for the Notex REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` is the raw "issue one HTTP request" primitive, `middleware`
//! wraps it with credential injection and `401` handling, `gateway` turns
//! statuses into typed errors, `api` fixes one method per endpoint, and
//! `types` defines the wire schema.

pub mod api;
pub mod error;
pub mod gateway;
#[cfg(feature = "native")]
pub mod http;
pub mod middleware;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
