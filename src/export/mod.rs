//! Downloads: chart PNGs and the standalone map page.
//!
//! ```text
//!   Analysis ──► chart::{district_bars, district_ring, price_bars, price_ring}
//!                   │
//!                   ▼
//!              png::{bar_chart_png, ring_chart_png} ──► save dialog ──► file
//!
//!   MapView ──► html::render_map_html ──► save dialog ──► file
//! ```

pub mod html;
pub mod png;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::analysis::Analysis;
use crate::chart::{self, ChartKind};
use crate::color::{flare, viridis};
use crate::config::RenderConfig;
use crate::error::AnalysisError;

/// Render one chart to PNG bytes. `None` when the chart has no data
/// (price charts without a price column).
pub fn chart_png(
    kind: ChartKind,
    analysis: &Analysis,
    title: &str,
    config: &RenderConfig,
) -> Result<Option<Vec<u8>>, AnalysisError> {
    match kind {
        ChartKind::DistrictBar => {
            let items = chart::district_bars(analysis);
            png::bar_chart_png(title, &items, &viridis(items.len()), config).map(Some)
        }
        ChartKind::DistrictRing => {
            png::ring_chart_png(title, &chart::district_ring(analysis), config).map(Some)
        }
        ChartKind::PriceBar => chart::price_bars(analysis)
            .map(|items| png::bar_chart_png(title, &items, &flare(items.len()), config))
            .transpose(),
        ChartKind::PriceRing => chart::price_ring(analysis)
            .map(|ring| png::ring_chart_png(title, &ring, config))
            .transpose(),
    }
}

/// Ask for a destination and write `bytes` there. `Ok(None)` when the
/// user cancels the dialog.
pub fn save_with_dialog(
    default_name: &str,
    filter_name: &str,
    extensions: &[&str],
    bytes: &[u8],
) -> Result<Option<PathBuf>> {
    let Some(path) = rfd::FileDialog::new()
        .set_title("儲存檔案")
        .set_file_name(default_name)
        .add_filter(filter_name, extensions)
        .save_file()
    else {
        return Ok(None);
    };
    write_export(&path, bytes)?;
    Ok(Some(path))
}

pub fn write_export(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::data::loader::parse_csv;
    use crate::map::BoundaryCache;
    use std::sync::Once;

    static FONT: Once = Once::new();

    fn with_font() -> RenderConfig {
        let config = RenderConfig {
            dpi: 60,
            ..RenderConfig::default()
        };
        FONT.call_once(|| {
            let bytes = crate::fonts::fallback_font_bytes().unwrap();
            crate::fonts::register_chart_font(&config.font_family, bytes).unwrap();
        });
        config
    }

    fn sample_analysis(csv: &str) -> Analysis {
        let mut ds = parse_csv(csv.as_bytes(), "sample.csv").unwrap();
        let config = AppConfig {
            base_dir: PathBuf::from("/nonexistent"),
            ..AppConfig::default()
        };
        crate::analysis::analyse(&mut ds, &config, &mut BoundaryCache::default())
            .unwrap()
            .unwrap()
    }

    fn is_png(bytes: &[u8]) -> bool {
        bytes.starts_with(b"\x89PNG\r\n\x1a\n")
    }

    #[test]
    fn every_chart_renders_to_png() {
        let config = with_font();
        let analysis = sample_analysis(
            "鄉鎮市區,總價元\n臺南市東區,1000000\n臺南市東區,6000000\n臺南市北區,12000000\n臺南市安平區,21000000\n",
        );
        for kind in ChartKind::ALL {
            let bytes = chart_png(kind, &analysis, "Title", &config).unwrap().unwrap();
            assert!(is_png(&bytes), "{kind:?}");
        }
    }

    #[test]
    fn exported_png_is_cropped_within_figure() {
        let config = with_font();
        let analysis = sample_analysis("鄉鎮市區\n臺南市東區\n臺南市北區\n");
        let bytes = chart_png(ChartKind::DistrictBar, &analysis, "Title", &config)
            .unwrap()
            .unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        let (w, h) = config.pixels(config.bar_size);
        assert!(img.width() <= w && img.height() <= h);
    }

    #[test]
    fn price_charts_need_a_price_column() {
        let config = with_font();
        let analysis = sample_analysis("鄉鎮市區\n臺南市東區\n");
        assert!(chart_png(ChartKind::PriceBar, &analysis, "t", &config).unwrap().is_none());
        assert!(chart_png(ChartKind::PriceRing, &analysis, "t", &config).unwrap().is_none());
    }

    #[test]
    fn write_export_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        write_export(&path, b"<html></html>").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"<html></html>");
    }
}
