//! # notex
//!
//! Client core for the Notex note-taking and group-messaging API.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every screen of the browser client and every CLI command goes through the
//! same three pieces:
//!
//! - [`token::TokenHolder`] keeps the bearer credential in durable storage.
//! - [`net::gateway::Gateway`] is the only egress point. It injects the
//!   credential into outgoing requests and clears it when the server answers
//!   `401 Unauthorized`.
//! - [`state::session::SessionStore`] tracks who is logged in and is rebuilt
//!   from the stored credential at startup.
//!
//! The network itself sits behind [`net::transport::Transport`], so the same
//! core drives `reqwest` natively and `gloo-net` in the browser.

pub mod config;
pub mod net;
pub mod state;
pub mod token;

pub use config::ClientConfig;
pub use net::api::NotexApi;
pub use net::error::{ApiError, ErrorKind};
pub use net::gateway::{Gateway, RequestOptions};
pub use state::session::{SessionError, SessionState, SessionStore, WeakSessionStore};
pub use token::{TokenHolder, TokenStore};
