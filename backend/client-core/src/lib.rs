//! Client side of the supervisor ↔ detector link.
//!
//! The supervisor owns a Unix socket and pushes `start`/`stop` commands as
//! newline-delimited JSON. This crate connects to it, waits for commands and
//! runs paced detection sessions, streaming one `target_detection` message per
//! analyzed frame.
//!
//! - [`ipc`]: framing, transport, command dispatch, detection emission
//! - [`session`]: capability traits and the paced per-frame loop
//! - [`service`]: the top-level wait-for-command loop
//! - [`config`]: TOML/env configuration

pub mod config;
pub mod error;
pub mod ipc;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub const SOCKET_DIR: &str = "/tmp";
pub const SOCKET_FILE_NAME: &str = "detection.sock";
pub const DEFAULT_SOCKET_PATH: &str = const_format::concatcp!(SOCKET_DIR, "/", SOCKET_FILE_NAME);

/// Frame rate used when neither the source nor the start command has one.
pub const SESSION_DEFAULT_FPS: f64 = 30.0;
