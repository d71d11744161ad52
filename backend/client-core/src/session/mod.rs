//! Processing sessions.
//!
//! A session starts on a `start` command and streams one detection message
//! per analyzed frame until `stop`, end of media, or connection loss.

pub mod capability;
pub mod pacing;
pub mod scheduler;

pub use capability::{Detector, FrameSource, MediaOpener};
pub use pacing::{FPS_EPSILON, Pacer};
pub use scheduler::{SessionEnd, SessionReport, SessionScheduler};
