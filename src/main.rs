mod app;
mod cache;
mod color;
mod config;
mod data;
mod error;
mod form;
mod predict;
mod state;
#[cfg(test)]
mod testing;
mod ui;

use std::path::Path;
use std::process::ExitCode;

use app::CarPriceApp;
use config::{CONFIG_FILE, DashboardConfig};
use eframe::egui;
use error::LoadError;
use state::AppState;

/// Configuration, dataset, then model. Any failure here ends the process
/// before a window opens.
fn startup() -> Result<AppState, LoadError> {
    let config = DashboardConfig::load_or_default(Path::new(CONFIG_FILE))?;
    AppState::start(config)
}

fn main() -> ExitCode {
    env_logger::init();

    let state = match startup() {
        Ok(state) => state,
        Err(e) => {
            log::error!("Startup failed: {e}");
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Car Price Predictor",
        options,
        Box::new(|_cc| Ok(Box::new(CarPriceApp::new(state)))),
    );
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("UI terminated with error: {e}");
            ExitCode::FAILURE
        }
    }
}
