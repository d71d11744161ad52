//! Supervisor link: newline-delimited JSON over a Unix stream socket.
//!
//! Inbound lines carry [`models::Command`]s; outbound lines carry
//! [`models::DetectionMessage`]s. Layering, bottom up:
//!
//! - [`frame_decoder`] splits the byte stream into lines
//! - [`channel`] owns the socket (connect with retry, timed read/write, close)
//! - [`dispatcher`] decodes lines into commands, skipping malformed ones
//! - [`emitter`] encodes detector output into messages
//! - [`client`] bundles the above behind [`IpcClient`]

pub mod channel;
pub mod client;
pub mod connection_state;
pub mod dispatcher;
pub mod emitter;
pub mod frame_decoder;

pub use channel::{ChannelConfig, ChannelManager, Inbound};
pub use client::IpcClient;
pub use connection_state::ConnectionState;
pub use dispatcher::{CommandDispatcher, CommandEvent, DispatchState};
pub use emitter::DetectionEmitter;
pub use frame_decoder::FrameDecoder;
