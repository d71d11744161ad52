use client_core::error::CoreError;
use client_core::error::config::ConfigError;
use client_core::error::ipc::IpcError;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error;

/// Errors that end the streamer process.
#[derive(Debug, Error)]
pub enum StreamerError {
    /// Error from this binary (logging, runtime, filesystem setup)
    #[error("Streamer Error: {message} {location}")]
    Streamer {
        message: String,
        location: ErrorLocation,
    },

    /// Error from client-core (config, connection)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },
}

impl From<CoreError> for StreamerError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        StreamerError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<IpcError> for StreamerError {
    #[track_caller]
    fn from(error: IpcError) -> Self {
        StreamerError::from(CoreError::from(error))
    }
}

impl From<ConfigError> for StreamerError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        StreamerError::from(CoreError::from(error))
    }
}
