use common::ErrorLocation;

use std::error::Error as StdError;

use thiserror::Error as ThisError;

/// Failures reported by a media backend.
///
/// Both are soft for the client: an open failure yields an empty detection
/// message, a rewind failure ends the session as end-of-media.
#[derive(Debug, ThisError)]
pub enum MediaError {
    #[error("Media Open Error: {message} {location}")]
    Open {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    #[error("Media Rewind Error: {message} {location}")]
    Rewind {
        message: String,
        location: ErrorLocation,
    },
}
