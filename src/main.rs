mod app;
mod block;
mod config;
mod error;
mod logging;
mod peer;
mod placement;
mod ranking;
mod server;
mod store;
mod system;
mod transfer;
mod util;

#[cfg(test)]
mod test_util;

use std::{env, process::exit};

use clap::{Parser, Subcommand};
use log::{error, info};

use crate::{
    app::{App, Role},
    error::{ConfigError, EX_CONFIG},
};

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"), long_about = None)]
struct Args {
    /// Location of configuration file
    #[arg(short, long, value_name = "/path/to/config.yaml")]
    config: String,

    /// Enable debug output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one peer of the configured peer set
    Serve {
        /// Position of this peer in the `peers` list
        #[arg(short, long)]
        index: usize,
    },

    /// Split, hash and place every file of the uploader's base directory
    Upload,

    /// Reconstruct every recorded file into the downloader's base directory
    Download,
}

impl From<Command> for Role {
    fn from(command: Command) -> Self {
        match command {
            Command::Serve { index } => Role::Serve { index },
            Command::Upload => Role::Upload,
            Command::Download => Role::Download,
        }
    }
}

/// Conventional status for a process stopped by SIGINT.
const EX_INTERRUPTED: i32 = 130;

/// A stopped peer has simply finished serving. A stopped upload or download left work undone.
fn interrupt_exit_code(command: &Command) -> i32 {
    match command {
        Command::Serve { .. } => 0,
        Command::Upload | Command::Download => EX_INTERRUPTED,
    }
}

fn exit_code(e: &anyhow::Error) -> i32 {
    if e.downcast_ref::<ConfigError>().is_some() {
        EX_CONFIG
    } else {
        1
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.verbose >= 2 {
        env::set_var("RUST_BACKTRACE", "1");
    }

    if let Err(e) = logging::setup_logger(logging::level_from_verbosity(args.verbose)) {
        eprintln!("Failed to initialize logger: {e}. ");
        exit(1);
    }

    info!("Started {} version {}. ", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let interrupted = interrupt_exit_code(&args.command);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received SIGINT, shutting down. ");
        exit(interrupted);
    }) {
        error!("Failed to set SIGINT handler: {e}. ");
        exit(1);
    }

    let config = match config::Config::new(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to parse configuration file: {e}. ");
            eprintln!("Invalid configuration: {e}. ");
            exit(EX_CONFIG);
        },
    };

    let app = match App::new(config, args.command.into()) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Program failed: {e}. ");
            exit(exit_code(&e));
        },
    };

    if let Err(e) = app.start().await {
        eprintln!("Program failed: {e}. ");
        exit(exit_code(&e));
    }
}
