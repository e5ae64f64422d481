//! brook - a front-end asset pipeline with a live-reload dev server.

mod actor;
mod asset;
mod cli;
mod config;
mod core;
mod embed;
mod logger;
mod pipeline;
mod reload;
mod utils;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands, build, serve::DevServer};
use config::ProjectConfig;

fn main() -> Result<ExitCode> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = Arc::new(ProjectConfig::load(&cli)?);

    match cli.command() {
        Commands::Default { .. } => serve_and_watch(config).map(|()| ExitCode::SUCCESS),
        Commands::Build => Ok(exit_code(build::build_all(&config))),
        Commands::Run { tasks } => Ok(exit_code(build::run_tasks(&config, &tasks))),
    }
}

/// Bind the server, build once, then serve and watch until Ctrl+C.
///
/// Build failures are reported and do not stop the server.
fn serve_and_watch(config: Arc<ProjectConfig>) -> Result<()> {
    let server = DevServer::start(&config, config.proxy_target())?;
    build::build_all(&config);
    server.run(config)
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
