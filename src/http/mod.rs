//! HTTP API for triggering capture from a local page or tool
//!
//! This module provides a small REST API around one capture session:
//! - POST /permission/prime - Resolve the permission prompt
//! - POST /session/start - Start a capture session
//! - GET /session/status - Query session status
//! - GET /health - Health check
//!
//! Captured media is only ever written to the local downloads directory;
//! nothing here serves or uploads it.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
