mod app;
mod config;
mod connection;
mod db;
mod generator;
mod interchange;
mod logger;
mod model;
mod printer;

use std::process::ExitCode;

use clap::Parser;

use crate::{app::run_app, config::Args, logger::{error, init}};

fn main() -> ExitCode {
    let args = Args::parse();

    // Logging is best effort; a missing config dir must not stop the seed.
    if let Ok(log_path) = args.log_path() {
        let _ = init(log_path);
    }

    let settings = match args.settings() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error: {err:#}");
            eprintln!("Please ensure the credentials file exists and is correctly formatted.");
            error(&format!("fatal error: {err:#}"));
            return ExitCode::FAILURE;
        }
    };

    run_app(&settings);
    ExitCode::SUCCESS
}
