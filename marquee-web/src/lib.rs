//! Marquee Web - addon protocol and list management over HTTP
//!
//! Serves per-user manifests and catalog pages in the streaming-client addon
//! protocol, plus a small JSON API for managing a user's lists.

pub mod handlers;
pub mod server;

pub use server::{AppState, build_router, run_server};
