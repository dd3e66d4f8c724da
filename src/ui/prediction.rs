use std::ops::RangeInclusive;

use eframe::egui::{self, Button, Color32, DragValue, RichText, Ui};

use crate::data::model::{
    ACCIDENTAL, BRAND, CAR_TYPE, FUEL_TYPE, FieldValue, KILOMETERS, MODEL_NAME, MODEL_VARIANT,
    OWNER, STATE, TRANSMISSION, YEAR,
};
use crate::form::PredictionForm;
use crate::state::{AppState, PredictionOutcome, RETRY_HINT};

const LEFT_COLUMN: [&str; 6] = [BRAND, MODEL_NAME, MODEL_VARIANT, CAR_TYPE, OWNER, YEAR];
const RIGHT_COLUMN: [&str; 5] = [FUEL_TYPE, TRANSMISSION, STATE, ACCIDENTAL, KILOMETERS];

type Change = Option<(&'static str, FieldValue)>;

// ---------------------------------------------------------------------------
// Prediction view
// ---------------------------------------------------------------------------

pub fn prediction_view(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Enter Car Details:");
    ui.add_space(6.0);

    let years = state.assembler.bounds().years.clone();
    let mut change: Change = None;

    ui.columns(2, |cols| {
        let form = &mut state.form;
        details_grid(&mut cols[0], "details_left", &LEFT_COLUMN, form, &years, &mut change);
        details_grid(&mut cols[1], "details_right", &RIGHT_COLUMN, form, &years, &mut change);
    });

    if let Some((field, value)) = change {
        state.select(field, value);
    }

    ui.separator();

    let missing = state.form.empty_choices();
    if !missing.is_empty() {
        ui.label(
            RichText::new(format!("No choices available for: {}", missing.join(", ")))
                .color(Color32::YELLOW),
        );
    }

    if ui
        .add_enabled(state.form.can_submit(), Button::new("Predict Price"))
        .clicked()
    {
        state.submit_prediction();
    }

    ui.add_space(8.0);
    match &state.outcome {
        Some(PredictionOutcome::Success { price, record }) => {
            ui.label(
                RichText::new(format!("Predicted Price: {price}"))
                    .size(20.0)
                    .strong()
                    .color(Color32::from_rgb(0, 160, 70)),
            );
            egui::CollapsingHeader::new("Model input")
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    for (name, value) in record.iter() {
                        ui.label(format!("{name}: {value}"));
                    }
                });
        }
        Some(PredictionOutcome::Failure { message }) => {
            ui.label(RichText::new(message).color(Color32::RED));
            ui.label(RETRY_HINT);
        }
        None => {}
    }
}

fn details_grid(
    ui: &mut Ui,
    id: &str,
    fields: &[&'static str],
    form: &mut PredictionForm,
    years: &RangeInclusive<i64>,
    change: &mut Change,
) {
    egui::Grid::new(id)
        .num_columns(2)
        .spacing([12.0, 8.0])
        .show(ui, |ui: &mut Ui| {
            for &field in fields {
                ui.label(field);
                match field {
                    YEAR => {
                        ui.add(DragValue::new(&mut form.year).range(years.clone()));
                    }
                    KILOMETERS => {
                        ui.add(
                            DragValue::new(&mut form.kilometers)
                                .range(0..=i64::MAX)
                                .speed(100.0)
                                .suffix(" km"),
                        );
                    }
                    _ => {
                        if let Some(value) = choice_combo(ui, field, form) {
                            *change = Some((field, value));
                        }
                    }
                }
                ui.end_row();
            }
        });
}

/// Returns the newly picked value, if any.
fn choice_combo(ui: &mut Ui, field: &'static str, form: &PredictionForm) -> Option<FieldValue> {
    let selected = form.selected(field);
    let mut picked = None;

    egui::ComboBox::from_id_salt(field)
        .width(200.0)
        .selected_text(selected.map(ToString::to_string).unwrap_or_else(|| "(none)".to_string()))
        .show_ui(ui, |ui: &mut Ui| {
            for option in form.options(field) {
                if ui
                    .selectable_label(selected == Some(option), option.to_string())
                    .clicked()
                {
                    picked = Some(option.clone());
                }
            }
        });

    picked.filter(|value| Some(value) != selected)
}
