//! Wire models for the supervisor link.
//!
//! This crate contains the data exchanged over the detection socket:
//! commands pushed by the supervisor and detection messages streamed back.
//! Models carry validation at construction but no I/O.

pub mod command;
pub mod detection;
pub mod error;

pub use command::{Command, StartCommand};
pub use common::ErrorLocation;
pub use detection::builder::DetectionMessageBuilder;
pub use detection::{
    BoundingBox, Detection, DetectionMessage, MessageKind, RawDetection, round_confidence,
};
pub use error::model_error::ModelError;

#[cfg(test)]
mod tests;
