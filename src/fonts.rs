use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use eframe::egui::{self, FontData, FontDefinitions, FontFamily};
use plotters::style::FontStyle;

use crate::config::RenderConfig;
use crate::error::AnalysisError;

/// Name of the bundled CJK font inside egui's font table.
const CJK_FONT_NAME: &str = "NotoSansTC";
/// egui default font used when the CJK font is missing.
const FALLBACK_FONT_NAME: &str = "Ubuntu-Light";

/// Result of font setup, kept by the app for the side-panel warning.
pub struct FontSetup {
    pub render: RenderConfig,
    /// Set when the CJK font file was not found.
    pub warning: Option<String>,
}

/// Load the CJK font into egui and register it (or egui's Latin fallback)
/// as the chart export font. Runs once at startup.
pub fn install(ctx: &egui::Context, font_path: &Path) -> FontSetup {
    let render = RenderConfig::default();

    let (chart_font, warning) = match std::fs::read(font_path) {
        Ok(bytes) => {
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            let mut fonts = FontDefinitions::default();
            fonts
                .font_data
                .insert(CJK_FONT_NAME.to_owned(), Arc::new(FontData::from_static(bytes)));
            for family in [FontFamily::Proportional, FontFamily::Monospace] {
                fonts
                    .families
                    .entry(family)
                    .or_default()
                    .insert(0, CJK_FONT_NAME.to_owned());
            }
            ctx.set_fonts(fonts);
            log::info!("Loaded font {}", font_path.display());
            (Some(bytes), None)
        }
        Err(e) => {
            log::warn!("Font {} unavailable: {e}", font_path.display());
            (
                fallback_font_bytes(),
                Some(format!("❌ 找不到字體檔 ({})", font_path.display())),
            )
        }
    };

    match chart_font {
        Some(bytes) => {
            if let Err(e) = register_chart_font(&render.font_family, bytes) {
                log::error!("{e}");
            }
        }
        None => log::error!("No font available for chart export"),
    }

    FontSetup { render, warning }
}

/// Bytes of egui's bundled Latin font.
pub fn fallback_font_bytes() -> Option<&'static [u8]> {
    let defaults = FontDefinitions::default();
    let data = defaults.font_data.get(FALLBACK_FONT_NAME)?;
    Some(match &data.font {
        Cow::Borrowed(b) => b,
        Cow::Owned(v) => Box::leak(v.clone().into_boxed_slice()),
    })
}

/// Make `bytes` the chart backend's font for `family`.
pub fn register_chart_font(family: &str, bytes: &'static [u8]) -> Result<(), AnalysisError> {
    plotters::style::register_font(family, FontStyle::Normal, bytes)
        .map_err(|_| AnalysisError::Font(format!("{family}: invalid font data")))
}
