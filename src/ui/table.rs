use eframe::egui::{self, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::Dataset;

const ROW_HEIGHT: f32 = 18.0;
const CLEAN_DISTRICT_HEADER: &str = "Clean_Area";

/// Scrollable view of the raw rows, with the derived district column
/// appended once it exists.
pub fn raw_table(ui: &mut Ui, dataset: &Dataset) {
    let clean = dataset.clean_districts();
    let n_cols = dataset.headers.len() + usize::from(clean.is_some());

    ui.push_id("raw_table", |ui: &mut Ui| {
        egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .max_scroll_height(300.0)
                .columns(Column::auto().at_least(60.0).resizable(true), n_cols)
                .header(ROW_HEIGHT + 4.0, |mut header| {
                    for h in &dataset.headers {
                        header.col(|ui: &mut Ui| {
                            ui.strong(h);
                        });
                    }
                    if clean.is_some() {
                        header.col(|ui: &mut Ui| {
                            ui.strong(CLEAN_DISTRICT_HEADER);
                        });
                    }
                })
                .body(|body| {
                    body.rows(ROW_HEIGHT, dataset.len(), |mut row| {
                        let i = row.index();
                        for cell in &dataset.rows[i] {
                            row.col(|ui: &mut Ui| {
                                ui.label(cell.to_string());
                            });
                        }
                        if let Some(labels) = clean {
                            row.col(|ui: &mut Ui| {
                                ui.label(&labels[i]);
                            });
                        }
                    });
                });
        });
    });
}
