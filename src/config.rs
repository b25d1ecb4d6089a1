use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::map::tiles::TileProvider;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TWREALTY_CONFIG";
/// Config file looked up in the working directory otherwise.
pub const CONFIG_FILE: &str = "twrealty.json";

// ---------------------------------------------------------------------------
// Application configuration
// ---------------------------------------------------------------------------

/// Settings read once at startup. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory the font and boundary paths are resolved against.
    pub base_dir: PathBuf,
    pub font_file: PathBuf,
    pub boundary_file: PathBuf,
    pub tile_provider: TileProvider,
    /// Non-empty address cells scanned for a city name.
    pub detection_sample: usize,
    /// Non-empty district cells scanned for a city name.
    pub district_sample: usize,
    /// City assumed when the data names none.
    pub fallback_city: String,
    /// Districts shown before the rest is folded into 其他.
    pub top_n: usize,
    pub tile_timeout_secs: u64,
    pub max_tiles: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            font_file: PathBuf::from("NotoSansTC-Regular.ttf"),
            boundary_file: PathBuf::from("information").join("TOWN_MOI_1140318.json"),
            tile_provider: TileProvider::Nlsc,
            detection_sample: 50,
            district_sample: 10,
            fallback_city: "臺南市".to_string(),
            top_n: 10,
            tile_timeout_secs: 5,
            max_tiles: 24,
        }
    }
}

impl AppConfig {
    /// Load from `$TWREALTY_CONFIG`, then `./twrealty.json`, else defaults.
    /// A broken file is reported and ignored.
    pub fn load() -> Self {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::from_file(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(e) => {
                log::warn!("Ignoring config {}: {e:#}", path.display());
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let text = std::fs::read_to_string(path).context("reading config file")?;
        serde_json::from_str(&text).context("parsing config JSON")
    }

    pub fn font_path(&self) -> PathBuf {
        self.base_dir.join(&self.font_file)
    }

    pub fn boundary_path(&self) -> PathBuf {
        self.base_dir.join(&self.boundary_file)
    }
}

// ---------------------------------------------------------------------------
// Render configuration for exported charts
// ---------------------------------------------------------------------------

/// Immutable style passed to every off-screen chart render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Font family name registered with the chart backend.
    pub font_family: String,
    pub dpi: u32,
    /// Bar chart size in inches.
    pub bar_size: (f64, f64),
    /// Ring chart size in inches.
    pub ring_size: (f64, f64),
    /// Margin kept around the cropped content, in inches.
    pub pad_inches: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            dpi: 300,
            bar_size: (10.0, 7.0),
            ring_size: (10.0, 8.5),
            pad_inches: 0.1,
        }
    }
}

impl RenderConfig {
    /// Pixel size of a figure given in inches.
    pub fn pixels(&self, inches: (f64, f64)) -> (u32, u32) {
        let dpi = self.dpi as f64;
        ((inches.0 * dpi).round() as u32, (inches.1 * dpi).round() as u32)
    }

    /// Pixel size of a typographic point size at this DPI.
    pub fn pt(&self, points: f64) -> f64 {
        points * self.dpi as f64 / 72.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{ "fallback_city": "臺北市", "tile_provider": "carto_light" }"#).unwrap();
        let cfg = AppConfig::from_file(&path).unwrap();
        assert_eq!(cfg.fallback_city, "臺北市");
        assert_eq!(cfg.tile_provider, TileProvider::CartoLight);
        assert_eq!(cfg.detection_sample, 50);
        assert_eq!(cfg.top_n, 10);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(AppConfig::from_file(&path).is_err());
    }

    #[test]
    fn paths_resolve_against_base_dir() {
        let cfg = AppConfig {
            base_dir: PathBuf::from("/srv/app"),
            ..AppConfig::default()
        };
        assert_eq!(cfg.font_path(), PathBuf::from("/srv/app/NotoSansTC-Regular.ttf"));
        assert!(cfg.boundary_path().ends_with("information/TOWN_MOI_1140318.json"));
    }

    #[test]
    fn figure_pixels_follow_dpi() {
        let rc = RenderConfig::default();
        assert_eq!(rc.pixels(rc.bar_size), (3000, 2100));
        assert_eq!(rc.pt(72.0), 300.0);
    }
}
