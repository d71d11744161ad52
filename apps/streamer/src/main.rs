use detection_streamer::error::StreamerError;
use detection_streamer::logger::{initialize as LoggerInitialize, log_dir};
use detection_streamer::simulation::{SimulatedDetector, SyntheticMedia};

use client_core::config::ClientConfig;
use client_core::ipc::IpcClient;
use client_core::service::serve;
use client_core::session::SessionScheduler;

use common::ErrorLocation;

use std::panic::Location;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{error, info};
use tokio::runtime::Builder as RuntimeBuilder;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("detection-streamer: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), StreamerError> {
    let log_dir = log_dir();

    // Logger first so config loading is visible.
    LoggerInitialize(&log_dir)?;
    info!("Detection streamer starting, logs in {}", log_dir.display());

    let config = ClientConfig::from_environment()?;

    let runtime = RuntimeBuilder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| StreamerError::Streamer {
            message: format!("Failed to build async runtime: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    runtime.block_on(stream(config))
}

async fn stream(config: ClientConfig) -> Result<(), StreamerError> {
    let mut client = IpcClient::connect(&config.ipc).await?;

    let scheduler = SessionScheduler::new(config.session.clone());
    let mut media = SyntheticMedia;
    let mut detector = SimulatedDetector::new(run_seed(), config.detector.confidence_threshold);

    let report = serve(&mut client, &scheduler, &mut media, &mut detector).await;

    info!(
        "Streamer finished: {} session(s), {} detection messages, {} unknown command(s)",
        report.sessions, report.messages_sent, report.unknown_commands
    );
    Ok(())
}

fn run_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
