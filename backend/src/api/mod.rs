//! HTTP API module.
//!
//! This module provides the HTTP server, its request/response types and the
//! shared log broadcaster used by every pipeline step.

pub mod server;
pub mod types;
pub mod logs;

pub use server::{router, start_server, AppState};
pub use types::*;
pub use logs::*;
