//! Clinic CLI - a command-line client for the clinic dashboard API.
//!
//! Lists patients, appointments, bills, diagnoses and treatments from the
//! clinic backend, keeping the login token between runs.

mod commands;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clinic_core::{ApiClient, ApiError, Config};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;

/// Log file prefix inside `<cache_dir>/logs`
const LOG_FILE_PREFIX: &str = "clinic.log";

/// Initialize the tracing subscriber for logging.
///
/// Warnings and above go to stderr; everything the filter allows is also
/// written to a daily-rolling file under the cache directory.
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}\n", e);
            eprintln!("{}", commands::USAGE);
            std::process::exit(2);
        }
    };
    if let Command::Help = command {
        println!("{}", commands::USAGE);
        return Ok(());
    }

    let mut config = Config::load()?;
    let _guard = init_tracing(config.cache_dir().ok().map(|dir| dir.join("logs")));
    info!(base_url = %config.base_url(), "Clinic CLI starting");

    let session = Arc::new(config.session()?);
    let api = ApiClient::with_timeout(config.base_url(), session, config.request_timeout())?;

    if let Err(e) = commands::run(command, &api, &mut config).await {
        if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_unauthenticated) {
            eprintln!("Session expired - run `clinic login`");
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}
