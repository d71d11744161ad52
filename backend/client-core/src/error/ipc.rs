use common::ErrorLocation;

use models::ModelError;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum IpcError {
    /// The overall connect timeout or a send deadline was exhausted.
    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Not Connected Error: {message} {location}")]
    NotConnected {
        message: String,
        location: ErrorLocation,
    },

    /// An inbound line broke framing rules and was dropped.
    #[error("Frame Error: {message} {location}")]
    Frame {
        message: String,
        location: ErrorLocation,
    },

    #[error("JSON Decode Error: {message} {location}")]
    JsonDecode {
        message: String,
        location: ErrorLocation,
    },

    #[error("JSON Encode Error: {message} {location}")]
    JsonEncode {
        message: String,
        location: ErrorLocation,
    },

    /// Detector output could not be turned into a valid message.
    #[error("Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },
}

impl IpcError {
    /// Whether the channel is gone after this error.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            IpcError::Send { .. }
                | IpcError::NotConnected { .. }
                | IpcError::Timeout { .. }
        )
    }
}

impl From<ModelError> for IpcError {
    #[track_caller]
    fn from(error: ModelError) -> Self {
        match error {
            ModelError::Decode { message, .. } => IpcError::JsonDecode {
                message,
                location: ErrorLocation::from(Location::caller()),
            },
            ModelError::Validation { message, .. } => IpcError::Encode {
                message,
                location: ErrorLocation::from(Location::caller()),
            },
        }
    }
}
