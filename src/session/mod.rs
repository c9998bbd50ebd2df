//! Capture session management
//!
//! This module provides the `CaptureSession` abstraction that manages:
//! - Permission priming and the readiness flag
//! - Acquiring the one shared device stream and waiting for real frames
//! - Scheduling the photo burst, the recording and the teardown
//! - Session statistics and state management

pub mod config;
mod orchestrator;
mod session;
mod stats;

pub use config::CaptureConfig;
pub use orchestrator::{wait_for_frames, CaptureSchedule};
pub use session::CaptureSession;
pub use stats::{SessionStats, StartOutcome};
