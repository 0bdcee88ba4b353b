//! # client
//!
//! Browser bindings for the Notex client core.
//!
//! This crate supplies what only makes sense inside a browser tab: the
//! `localStorage` credential slot, a `gloo-net` transport, and the Leptos
//! context that mirrors the session store into a reactive signal for route
//! guards and user-aware components. Screens build on top of these.

pub mod net;
pub mod state;
pub mod util;

/// Install the panic hook and route `log`/`tracing` output to the console.
#[cfg(feature = "hydrate")]
pub fn init_browser() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Debug).is_err() {
        leptos::logging::warn!("console logger already installed");
    }
}
