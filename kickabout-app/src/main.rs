mod app;
mod config;
mod fmt;
mod logging;
mod ui;

use std::process;
use std::sync::Arc;

use colored::Colorize;
use log::warn;
use thiserror::Error;
use tokio::runtime;

use kickabout_backend::{MemoryBackend, RestBackend, RestConfig};
use kickabout_client::Client;
use kickabout_core::SharedBackend;

use crate::app::App;
use crate::config::{BackendKind, Config, ConfigError};

const LOG_FILE: &str = "kickabout.log";

#[derive(Debug, Error)]
enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Could not start logging: {0}")]
    Logging(#[from] fern::InitError),
    #[error("Terminal failure: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    fn hint(&self) -> String {
        match self {
            AppError::Config(_) => {
                "Leave KICKABOUT_BACKEND unset to use the built-in demo, or set it to \"rest\" \
                 together with KICKABOUT_URL and KICKABOUT_API_KEY."
                    .to_string()
            }
            AppError::Logging(_) => format!("Make sure {} is writable.", LOG_FILE),
            AppError::Io(_) => {
                "Your terminal may not support raw mode. Try another terminal emulator."
                    .to_string()
            }
        }
    }
}

fn main() {
    if let Err(error) = start() {
        eprintln!("{} {}", "kickabout:".red().bold(), error);
        eprintln!("{}", format!("hint: {}", error.hint()).italic().dimmed());
        process::exit(1);
    }
}

fn start() -> Result<(), AppError> {
    let config = Config::from_env()?;
    logging::init_logger(LOG_FILE)?;

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("kickabout")
        .build()?;

    let (backend, demo) = match config.backend {
        BackendKind::Memory => {
            let memory = Arc::new(MemoryBackend::with_demo_data());
            let shared: SharedBackend = memory.clone();

            (shared, Some(memory))
        }
        BackendKind::Rest { base_url, api_key } => {
            let rest: SharedBackend = Arc::new(RestBackend::new(RestConfig { base_url, api_key }));

            (rest, None)
        }
    };

    let (client, events) = Client::new(backend);

    // Restore before the terminal takes over, so a stored session skips
    // straight past sign in
    let restored = runtime
        .block_on(client.auth.restore())
        .unwrap_or_else(|error| {
            warn!("Could not restore the session: {}", error);
            None
        });

    let mut app = App::new(client, events, demo);
    app.resume(restored, &runtime);

    let mut terminal = ui::init_terminal()?;
    let result = app.run(&mut terminal, &runtime);
    ui::restore_terminal()?;

    result.map_err(AppError::from)
}
