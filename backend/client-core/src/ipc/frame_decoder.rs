//! Newline framing for the supervisor stream.
//!
//! Bytes arrive in arbitrary chunks. The decoder keeps the trailing partial
//! line and yields complete lines in arrival order, without the terminator.
//! Lines longer than the configured limit are dropped as a whole and reported
//! once, so one runaway producer cannot grow the buffer without bound.

use crate::error::ipc::IpcError;

use common::ErrorLocation;
use models::Command;

use std::collections::VecDeque;
use std::panic::Location;

use log::{trace, warn};
use serde_json::Value;

pub const LINE_TERMINATOR: u8 = b'\n';

/// Incremental line splitter with an upper bound on line length.
#[derive(Debug)]
pub struct FrameDecoder {
    /// Bytes after the last terminator seen so far.
    partial: Vec<u8>,
    /// Complete lines (or oversize reports) not yet taken by the caller.
    ready: VecDeque<Result<Vec<u8>, IpcError>>,
    max_message_bytes: usize,
    /// Inside an oversized line; bytes are dropped until the next terminator.
    discarding: bool,
}

impl FrameDecoder {
    pub fn new(max_message_bytes: usize) -> Self {
        Self {
            partial: Vec::new(),
            ready: VecDeque::new(),
            max_message_bytes: max_message_bytes.max(1),
            discarding: false,
        }
    }

    /// Append received bytes.
    ///
    /// # Returns
    ///
    /// The number of entries (lines or oversize reports) this chunk completed.
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        let before = self.ready.len();
        let mut rest = bytes;

        while !rest.is_empty() {
            let Some(position) = rest.iter().position(|&b| b == LINE_TERMINATOR) else {
                if !self.discarding {
                    self.partial.extend_from_slice(rest);
                    if self.partial.len() > self.max_message_bytes {
                        let length = self.partial.len();
                        self.partial.clear();
                        self.discarding = true;
                        self.reject_oversized(length);
                    }
                }
                break;
            };

            let (segment, tail) = rest.split_at(position);
            rest = &tail[1..];

            if self.discarding {
                // Tail end of a line that was already reported.
                self.discarding = false;
                continue;
            }

            self.partial.extend_from_slice(segment);
            let line = std::mem::take(&mut self.partial);
            if line.len() > self.max_message_bytes {
                self.reject_oversized(line.len());
            } else {
                self.ready.push_back(Ok(line));
            }
        }

        let produced = self.ready.len() - before;
        trace!(
            "Fed {} bytes, {produced} line(s) ready, {} byte(s) pending",
            bytes.len(),
            self.partial.len()
        );
        produced
    }

    /// Take the oldest complete line, if any.
    pub fn next_message(&mut self) -> Option<Result<Vec<u8>, IpcError>> {
        self.ready.pop_front()
    }

    /// Drop all buffered state. Used when the connection is closed.
    pub fn clear(&mut self) {
        self.partial.clear();
        self.ready.clear();
        self.discarding = false;
    }

    /// Complete lines waiting to be taken.
    pub fn pending(&self) -> usize {
        self.ready.len()
    }

    /// Bytes of an incomplete line held back.
    pub fn buffered_bytes(&self) -> usize {
        self.partial.len()
    }

    /// Parse one line into a [`Command`].
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::JsonDecode`] if the line is not valid JSON or not an object.
    #[track_caller]
    pub fn decode(line: &[u8]) -> Result<Command, IpcError> {
        let value: Value = serde_json::from_slice(line).map_err(|e| IpcError::JsonDecode {
            message: format!("Invalid JSON line: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(Command::from_value(value)?)
    }

    fn reject_oversized(&mut self, length: usize) {
        warn!(
            "Discarding inbound line of {length}+ bytes (limit {})",
            self.max_message_bytes
        );
        self.ready.push_back(Err(IpcError::Frame {
            message: format!(
                "Line exceeds {} bytes and was discarded",
                self.max_message_bytes
            ),
            location: ErrorLocation::from(Location::caller()),
        }));
    }
}
