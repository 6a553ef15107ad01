// Fretsense - Electric guitar expression style detection
// Module declarations

pub mod audio;
pub mod classify;
pub mod commands;
pub mod config;
pub mod contour;
pub mod error;
pub mod evaluation;
pub mod notes;
pub mod pipeline;
pub mod storage;
pub mod techniques;

use clap::Parser;

use crate::commands::Cli;
use crate::config::DetectorConfig;

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = DetectorConfig::load(cli.config.as_deref())?;
    log::debug!("Detector config: {:?}", config);

    commands::execute(cli.command, &config)
}
