mod analysis;
mod app;
mod chart;
mod color;
mod config;
mod data;
mod error;
mod export;
mod fonts;
mod map;
mod state;
mod ui;

use app::RealtyApp;
use config::AppConfig;
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let config = AppConfig::load();
    log::info!("Base directory {}", config.base_dir.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "全台實價登錄分析系統",
        options,
        Box::new(move |cc| {
            let fonts = fonts::install(&cc.egui_ctx, &config.font_path());
            let state = AppState::new(config, fonts.render, fonts.warning);
            Ok(Box::new(RealtyApp::new(state)))
        }),
    )
}
