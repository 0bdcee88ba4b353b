//! Browser networking.
//!
//! SYSTEM CONTEXT
//! ==============
//! `browser` adapts `fetch` (via `gloo-net`) to the core's transport trait.
//! Everything above it (credential injection, `401` handling, endpoint
//! wrappers) lives in the `notex` core.

pub mod browser;
