//! Serializes detector output into `target_detection` lines.

use crate::error::ipc::IpcError;
use crate::ipc::channel::ChannelManager;

use common::ErrorLocation;
use models::{DetectionMessage, DetectionMessageBuilder, RawDetection};

use std::panic::Location;

use log::trace;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Default)]
pub struct DetectionEmitter {
    sent: u64,
}

impl DetectionEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detection messages written successfully.
    pub fn messages_sent(&self) -> u64 {
        self.sent
    }

    /// Build the canonical message for one frame and serialize it as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Encode`] if a detection is invalid (empty class,
    /// non-finite confidence).
    #[track_caller]
    pub fn encode(timestamp_ms: u64, detections: Vec<RawDetection>) -> Result<Vec<u8>, IpcError> {
        let message = DetectionMessageBuilder::default()
            .with_timestamp_ms(timestamp_ms)
            .with_detections(detections)
            .build()?;

        Self::encode_message(&message)
    }

    #[track_caller]
    pub fn encode_message(message: &DetectionMessage) -> Result<Vec<u8>, IpcError> {
        to_json_line(message)
    }

    /// Send one detection message.
    ///
    /// An empty `detections` list still produces a message.
    pub async fn send_detection(
        &mut self,
        channel: &mut ChannelManager,
        timestamp_ms: u64,
        detections: Vec<RawDetection>,
    ) -> Result<(), IpcError> {
        let line = Self::encode(timestamp_ms, detections)?;
        channel.send_line(&line).await?;
        self.sent += 1;
        trace!("Sent detections for t={timestamp_ms}ms");
        Ok(())
    }

    /// Send an arbitrary JSON value as one line. Not counted as a detection message.
    pub async fn send_raw(
        &mut self,
        channel: &mut ChannelManager,
        value: &Value,
    ) -> Result<(), IpcError> {
        let line = to_json_line(value)?;
        channel.send_line(&line).await
    }
}

#[track_caller]
fn to_json_line<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, IpcError> {
    serde_json::to_vec(value).map_err(|e| IpcError::JsonEncode {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}
