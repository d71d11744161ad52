pub mod config;
pub mod ipc;
pub mod media;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Ipc(#[from] ipc::IpcError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Media(#[from] media::MediaError),
}
