mod app;
mod cli;
mod color;
mod config;
mod data;
mod error;
mod state;
mod ui;

use anyhow::Context;
use app::LinefinderApp;
use clap::Parser;
use eframe::egui;

use crate::cli::Cli;
use crate::config::SessionConfig;
use crate::state::AppState;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    config.tutorial |= cli.tutorial;

    log::info!(
        "Starting line finder: spectrum={}, line list={}, log={}",
        cli.spectrum.display(),
        cli.line_list.display(),
        cli.log.display()
    );
    let state = AppState::new(config, &cli.spectrum, &cli.line_list, &cli.log);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 850.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Line Finder",
        options,
        Box::new(|cc| Ok(Box::new(LinefinderApp::new(cc, state)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("running the line finder window")
}
