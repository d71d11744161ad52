//! Commands pushed by the supervisor.
//!
//! The supervisor sends one JSON object per line with a `cmd` tag:
//!
//! ```text
//! {"cmd":"start","video_path":"clip.mp4","duration_sec":12.5,"fps":30,"loop":true,"frame_interval":5}
//! {"cmd":"stop"}
//! ```
//!
//! Anything else (unknown tag, missing tag, a `start` without `video_path`
//! or with mistyped fields) is surfaced as [`Command::Unknown`] so a newer
//! supervisor never breaks an older client.

use crate::ErrorLocation;
use crate::error::model_error::ModelError;

use std::panic::Location;

use serde::Deserialize;
use serde_json::Value;

pub const CMD_FIELD: &str = "cmd";
pub const START_COMMAND: &str = "start";
pub const STOP_COMMAND: &str = "stop";

/// A decoded supervisor command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start(StartCommand),
    Stop,
    /// Unrecognized or incomplete command, kept verbatim for logging.
    Unknown { raw: Value },
}

/// Parameters of a processing session.
#[derive(Debug, Clone, PartialEq)]
pub struct StartCommand {
    pub video_path: String,
    /// Informational; sessions end on Stop or end of media, not on duration.
    pub duration_sec: f64,
    /// Nominal frame rate; `0` means "let the source or default decide".
    pub fps: f64,
    pub loop_playback: bool,
    /// Analyze every Nth frame. `None` when the supervisor did not send one.
    pub frame_interval: Option<u32>,
}

impl StartCommand {
    /// Frame stride to use, falling back to `default` and never below 1.
    pub fn frame_interval_or(&self, default: u32) -> u32 {
        self.frame_interval.unwrap_or(default).max(1)
    }
}

/// Raw `start` fields as they appear on the wire. `null` counts as absent.
#[derive(Debug, Deserialize)]
struct StartFields {
    video_path: String,
    #[serde(default)]
    duration_sec: Option<f64>,
    #[serde(default)]
    fps: Option<f64>,
    #[serde(default, rename = "loop")]
    loop_playback: Option<bool>,
    #[serde(default)]
    frame_interval: Option<f64>,
}

impl From<StartFields> for StartCommand {
    fn from(fields: StartFields) -> Self {
        let non_negative = |v: Option<f64>| v.filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0);

        let frame_interval = fields
            .frame_interval
            .filter(|v| v.is_finite())
            .map(|v| v.floor().clamp(1.0, f64::from(u32::MAX)) as u32);

        Self {
            video_path: fields.video_path,
            duration_sec: non_negative(fields.duration_sec),
            fps: non_negative(fields.fps),
            loop_playback: fields.loop_playback.unwrap_or(false),
            frame_interval,
        }
    }
}

impl Command {
    /// Interpret a parsed JSON value as a command.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Decode`] if the value is not a JSON object.
    /// Objects never fail: unusable ones become [`Command::Unknown`].
    #[track_caller]
    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        if !value.is_object() {
            return Err(ModelError::Decode {
                message: format!("Command must be a JSON object, got: {value}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let tag = value
            .get(CMD_FIELD)
            .and_then(Value::as_str)
            .map(str::to_owned);

        let command = match tag.as_deref() {
            Some(START_COMMAND) => match StartFields::deserialize(&value) {
                Ok(fields) => Command::Start(fields.into()),
                Err(_) => Command::Unknown { raw: value },
            },
            Some(STOP_COMMAND) => Command::Stop,
            _ => Command::Unknown { raw: value },
        };

        Ok(command)
    }

    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start(_) => START_COMMAND,
            Command::Stop => STOP_COMMAND,
            Command::Unknown { .. } => "unknown",
        }
    }
}
