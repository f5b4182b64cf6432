//! mdlocal - keep the images of a markdown vault local.
//!
//! # Usage
//!
//! ```bash
//! mdlocal --vault ~/notes process journal/today.md
//! mdlocal --vault ~/notes all --dry-run
//! mdlocal --vault ~/notes watch -v
//! ```

mod app;
mod cli;
mod error;
mod watch;

use crate::app::App;
use crate::cli::{Cli, Command};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let app = match App::activate(&cli) {
        Ok(app) => app,
        Err(err) => {
            tracing::error!(error = ?err, "Startup failed");
            return ExitCode::FAILURE;
        },
    };

    let result = match &cli.command {
        Command::Process { files } => Ok(app.process_files(files.as_slice()).await),
        Command::All => app.process_all().await,
        Command::Watch => watch::run(&app).await.map(|()| 0),
        Command::Clean { files } => Ok(app.clean(files.as_slice()).await),
        Command::Config => {
            println!("{}", app.config().settings());
            Ok(0)
        },
    };
    app.deactivate();

    match result {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            tracing::warn!(failed, "Some documents could not be processed");
            ExitCode::FAILURE
        },
        Err(err) => {
            tracing::error!(error = ?err, "Command failed");
            ExitCode::FAILURE
        },
    }
}

/// `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
