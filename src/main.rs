use std::{env, str::FromStr};

use chorus_core::{Config, SyncMode};
use chorus_server::{run_server, ServerError, ServerOptions, DEFAULT_PORT};
use colored::Colorize;
use log::{error, info};
use thiserror::Error;
use tokio::runtime;

mod logging;

#[derive(Debug, Error)]
enum StartupError {
    #[error("{variable} is invalid: {reason}")]
    Config {
        variable: &'static str,
        reason: String,
    },

    #[error("Could not build async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("{0}")]
    Server(#[from] ServerError),
}

impl StartupError {
    fn hint(&self) -> String {
        match self {
            StartupError::Config { variable, .. } => format!("Fix or unset the {} environment variable, then try again.", variable),
            StartupError::Runtime(_) => "This error is fatal, and should not happen.".to_string(),
            StartupError::Server(ServerError::Bind { port, .. }) => format!("Make sure nothing else is listening on port {}, or set CHORUS_SERVER_PORT to another port.", port),
            StartupError::Server(ServerError::InvalidOrigin(_)) => "CHORUS_FRONTEND_ORIGIN must be a plain origin like https://chorus.example".to_string(),
            StartupError::Server(_) => "The server stopped unexpectedly.".to_string(),
        }
    }
}

/// Reads an optional environment variable, parsing it if set.
fn var<T>(variable: &'static str) -> Result<Option<T>, StartupError>
where
    T: FromStr,
    T::Err: ToString,
{
    match env::var(variable) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| StartupError::Config {
                variable,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn configure() -> Result<(Config, ServerOptions), StartupError> {
    let mut config = Config::default();

    if let Some(seconds) = var::<f32>("CHORUS_HEARTBEAT_SECONDS")? {
        if !(seconds.is_finite() && seconds > 0.) {
            return Err(StartupError::Config {
                variable: "CHORUS_HEARTBEAT_SECONDS",
                reason: "must be a positive number".to_string(),
            });
        }

        config.heartbeat_interval_in_seconds = seconds;
    }

    if let Some(threshold) = var::<f64>("CHORUS_DRIFT_THRESHOLD")? {
        config.drift_threshold_in_seconds = threshold.max(0.);
    }

    if let Some(sync_mode) = var::<SyncMode>("CHORUS_SYNC_MODE")? {
        config.sync_mode = sync_mode;
    }

    let options = ServerOptions {
        port: var("CHORUS_SERVER_PORT")?.unwrap_or(DEFAULT_PORT),
        frontend_origin: env::var("CHORUS_FRONTEND_ORIGIN")
            .ok()
            .filter(|o| !o.trim().is_empty()),
    };

    Ok((config, options))
}

fn run() -> Result<(), StartupError> {
    let (config, options) = configure()?;

    info!("Building async runtime...");
    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("chorus-async")
        .build()?;

    info!(
        "Starting with {:?} sync, heartbeats every {}s",
        config.sync_mode, config.heartbeat_interval_in_seconds
    );

    runtime.block_on(run_server(&config, options))?;
    Ok(())
}

fn main() {
    logging::init_logger();

    if let Err(error) = run() {
        error!("{} Read the error below to troubleshoot the issue. If you think this might be a bug, please report it by making a GitHub issue.", "chorus failed to start!".bold().red());
        error!("{}", error);
        error!(
            "{}",
            format!("Hint: {}", error.hint())
                .dimmed()
                .italic()
        );
    }
}
