//! What a session needs from the outside world.
//!
//! Decoding media and running a model are not this crate's business; a
//! session only sees these traits. The streamer binary plugs in a synthetic
//! backend, tests plug in scripted ones.

use crate::error::media::MediaError;

use models::{RawDetection, StartCommand};

/// A sequential stream of decoded frames.
pub trait FrameSource {
    type Frame;

    /// Next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Option<Self::Frame>;

    /// Playback position of the frame last returned, if the source tracks one.
    fn position_ms(&self) -> Option<f64> {
        None
    }

    /// Native frame rate, if known.
    fn frame_rate(&self) -> Option<f64> {
        None
    }

    /// Seek back to the first frame.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Rewind`] if the source cannot seek.
    fn rewind(&mut self) -> Result<(), MediaError>;
}

/// Opens the source named by a start command. The source is dropped when the session ends.
pub trait MediaOpener {
    type Source: FrameSource;

    /// # Errors
    ///
    /// Returns [`MediaError::Open`] if the media cannot be opened.
    fn open(&mut self, start: &StartCommand) -> Result<Self::Source, MediaError>;
}

/// Object detector over frames of type `F`.
///
/// Output order and confidence precision do not matter; the emitter
/// normalizes both.
pub trait Detector<F> {
    fn detect(&mut self, frame: &F) -> Vec<RawDetection>;
}
