use eframe::egui::{self, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::{Dataset, PRICE, RECORD_SCHEMA};

const ROW_HEIGHT: f32 = 20.0;

/// The first `rows` listings, all twelve columns.
pub fn preview_table(ui: &mut Ui, dataset: &Dataset, rows: usize) {
    let head = dataset.head(rows);

    ScrollArea::horizontal()
        .id_salt("preview_scroll")
        .show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .vscroll(false)
                .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
                .columns(Column::auto().at_least(64.0), RECORD_SCHEMA.len() + 1)
                .header(ROW_HEIGHT, |mut header| {
                    for spec in &RECORD_SCHEMA {
                        header.col(|ui| {
                            ui.strong(spec.name);
                        });
                    }
                    header.col(|ui| {
                        ui.strong(PRICE);
                    });
                })
                .body(|mut body| {
                    for listing in head {
                        body.row(ROW_HEIGHT, |mut row| {
                            for spec in &RECORD_SCHEMA {
                                let cell = listing
                                    .record
                                    .get(spec.name)
                                    .map(ToString::to_string)
                                    .unwrap_or_default();
                                row.col(|ui| {
                                    ui.label(cell);
                                });
                            }
                            row.col(|ui| {
                                ui.label(format!("{:.2}", listing.price));
                            });
                        });
                    }
                });
        });
}
