use eframe::egui::{self, Color32, RichText, Ui};

use crate::data::city::CityOrigin;
use crate::state::{AppState, Status};

const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "xls", "xlsx", "xlsm", "xlsb", "ods"];

// ---------------------------------------------------------------------------
// Left side panel – file picker and dataset summary
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("🏙️ 全台實價登錄分析系統");
    ui.separator();

    ui.strong("請上傳內政部資料");
    if ui.button("📂 選擇檔案…").clicked() {
        open_file_dialog(state);
    }
    ui.small("支援 CSV、XLS、XLSX，也可直接拖放檔案");

    if let Some(warning) = &state.font_warning {
        ui.add_space(6.0);
        ui.label(RichText::new(warning).color(Color32::RED));
    }

    ui.separator();

    let Some(session) = &state.session else {
        ui.label("尚未載入資料。");
        return;
    };

    let ds = &session.dataset;
    egui::Grid::new("dataset_summary")
        .num_columns(2)
        .spacing([8.0, 4.0])
        .show(ui, |ui: &mut Ui| {
            ui.label("檔案");
            ui.label(&ds.file_name);
            ui.end_row();

            ui.label("筆數");
            ui.label(ds.len().to_string());
            ui.end_row();

            if let Some(analysis) = &session.analysis {
                ui.label("縣市");
                ui.label(city_label(analysis.city.name(), analysis.city.alternate()));
                ui.end_row();

                ui.label("行政區數");
                ui.label(analysis.districts.distinct().to_string());
                ui.end_row();

                let column = |idx: Option<usize>| {
                    idx.and_then(|i| ds.headers.get(i).cloned())
                        .unwrap_or_else(|| "-".to_string())
                };
                ui.label("行政區欄位");
                ui.label(column(analysis.roles.district));
                ui.end_row();
                ui.label("地址欄位");
                ui.label(column(analysis.roles.address));
                ui.end_row();
                ui.label("總價欄位");
                ui.label(column(analysis.roles.price));
                ui.end_row();
            }
        });

    if ds.is_empty() {
        ui.add_space(6.0);
        ui.label(RichText::new("⚠️ 檔案沒有任何資料列").color(Color32::from_rgb(200, 120, 0)));
    }

    if let Some(analysis) = &session.analysis {
        if analysis.city.origin == CityOrigin::Fallback {
            ui.add_space(6.0);
            ui.label(
                RichText::new(format!(
                    "⚠️ 資料中未找到縣市名稱，預設為{}",
                    analysis.city.name()
                ))
                .color(Color32::from_rgb(200, 120, 0)),
            );
        }
    }
}

/// `臺南市（台南市）`, or just the name when both spellings agree.
fn city_label(name: &str, alternate: &str) -> String {
    if name == alternate {
        name.to_string()
    } else {
        format!("{name}（{alternate}）")
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("檔案", |ui: &mut Ui| {
            if ui.button("開啟…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let has_map = state
                .session
                .as_ref()
                .and_then(|s| s.analysis.as_ref())
                .is_some_and(|a| a.map.is_some());
            if ui
                .add_enabled(has_map, egui::Button::new("匯出地圖 HTML…"))
                .clicked()
            {
                state.export_map_html();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(session) = &state.session {
            ui.label(format!("{}：{} 筆", session.dataset.file_name, session.dataset.len()));
            ui.separator();
        }

        match &state.status {
            Some(Status::Info(msg)) => {
                ui.label(RichText::new(msg).color(Color32::from_rgb(0, 140, 60)));
            }
            Some(Status::Error(msg)) => {
                ui.label(RichText::new(msg).color(Color32::RED));
            }
            None => {}
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("開啟實價登錄資料")
        .add_filter("支援的檔案", SUPPORTED_EXTENSIONS)
        .add_filter("CSV", &["csv"])
        .add_filter("Excel", &["xls", "xlsx", "xlsm", "xlsb"])
        .pick_file();

    if let Some(path) = file {
        state.open_path(&path);
    }
}

/// Load the first supported file dropped onto the window.
pub fn handle_dropped_files(ctx: &egui::Context, state: &mut AppState) {
    let dropped = ctx.input(|i| i.raw.dropped_files.clone());
    let path = dropped.into_iter().filter_map(|f| f.path).find(|p| {
        p.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
    });
    if let Some(path) = path {
        state.open_path(&path);
    }
}
