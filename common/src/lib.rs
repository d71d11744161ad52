//! Shared building blocks for the detection client workspace.
//!
//! ## Architecture
//!
//! - **common** (this crate): Cross-cutting helpers with no domain knowledge
//! - **models**: Wire data exchanged with the supervisor
//! - **client-core**: IPC client and session scheduling
//! - **detection-streamer**: Process wiring (logging, config, simulation backend)

pub mod error;

pub use error::error_location::ErrorLocation;
