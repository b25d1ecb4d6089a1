use eframe::egui;

use crate::state::AppState;
use crate::ui::{charts, map, panels, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct RealtyApp {
    pub state: AppState,
}

impl RealtyApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for RealtyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        panels::handle_dropped_files(ctx, &mut self.state);

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: file picker ----
        egui::SidePanel::left("file_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: table, charts, map ----
        egui::CentralPanel::default().show(ctx, |ui| {
            let provider = self.state.config.tile_provider;
            let Some(session) = self.state.session.as_mut() else {
                ui.centered_and_justified(|ui| {
                    ui.heading("請上傳實價登錄 CSV 或 Excel 檔案  (檔案 → 開啟…)");
                });
                return;
            };

            let mut download = None;
            let mut export_map = false;
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.heading("📄 原始資料");
                    table::raw_table(ui, &session.dataset);
                    ui.add_space(12.0);
                    ui.separator();

                    if session.analysis.is_none() {
                        ui.label("⚠️ 找不到「鄉鎮市區」或「行政區」欄位，無法進行行政區分析。");
                        return;
                    }
                    download = charts::chart_sections(ui, session);
                    ui.add_space(12.0);
                    ui.separator();
                    export_map = map::map_section(ui, session, provider);
                });

            if let Some(kind) = download {
                self.state.export_chart(kind);
            }
            if export_map {
                self.state.export_map_html();
            }
        });
    }
}
