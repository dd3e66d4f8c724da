use std::path::Path;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::{AppState, View};
use crate::ui::{about, plot, prediction, table};

// ---------------------------------------------------------------------------
// Left side panel – view selector
// ---------------------------------------------------------------------------

pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Choose View");
    ui.separator();

    for view in View::ALL {
        ui.radio_value(&mut state.view, view, view.label());
    }

    ui.add_space(12.0);
    ui.separator();
    ui.small(format!("Dataset: {}", file_name(&state.dataset_path)));
    ui.small(format!("Model: {}", file_name(&state.model_path)));
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open dataset…").clicked() {
                open_dataset_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open model…").clicked() {
                open_model_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label(format!(
            "{} listings, years {} to {}",
            state.dataset.len(),
            state.dataset.year_range().start(),
            state.dataset.year_range().end()
        ));

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("🚗 Car Price Prediction");
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| match state.view {
            View::DataInsights => data_insights(ui, state),
            View::AboutModel => about::model_insights(ui, &state.model.summary(), &state.config),
            View::Prediction => prediction::prediction_view(ui, state),
        });
}

fn data_insights(ui: &mut Ui, state: &AppState) {
    ui.strong("📊 Data Overview");
    table::preview_table(ui, &state.dataset, state.config.preview_rows);
    ui.add_space(12.0);

    ui.columns(2, |cols| {
        plot::price_distribution(&mut cols[0], &state.overview);
        plot::brand_averages(&mut cols[1], &state.overview);
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_dataset_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open car listings")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open_dataset(&path);
    }
}

pub fn open_model_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open price model")
        .add_filter("Model artifact", &["json"])
        .pick_file();

    if let Some(path) = file {
        state.open_model(&path);
    }
}
