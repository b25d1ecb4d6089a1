use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use eframe::egui::{ColorImage, TextureHandle};

use crate::analysis::{Analysis, analyse};
use crate::chart::ChartKind;
use crate::config::{AppConfig, RenderConfig};
use crate::data::loader::load_file;
use crate::data::model::Dataset;
use crate::export;
use crate::map::BoundaryCache;
use crate::map::shapes::{SIMPLIFY_TOLERANCE, TownShape, project_layer};
use crate::map::tiles::{TileCache, TileKey};

// ---------------------------------------------------------------------------
// Session: everything derived from one loaded file
// ---------------------------------------------------------------------------

pub struct Session {
    pub dataset: Dataset,
    /// `None` when the file has no district column.
    pub analysis: Option<Analysis>,
    /// Editable chart titles, seeded with the city-specific defaults.
    pub titles: HashMap<ChartKind, String>,
    /// Projected town outlines for the map section.
    pub map_shapes: Vec<TownShape>,
    /// Basemap tiles fetched for the map section.
    pub basemap: Vec<(TileKey, Arc<ColorImage>)>,
    /// GPU textures for `basemap`, uploaded on first draw.
    pub textures: HashMap<TileKey, TextureHandle>,
}

impl Session {
    fn new(dataset: Dataset, analysis: Option<Analysis>) -> Self {
        let titles = analysis
            .as_ref()
            .map(|a| {
                ChartKind::ALL
                    .iter()
                    .map(|&kind| (kind, kind.default_title(a.city.name())))
                    .collect()
            })
            .unwrap_or_default();
        Session {
            dataset,
            analysis,
            titles,
            map_shapes: Vec::new(),
            basemap: Vec::new(),
            textures: HashMap::new(),
        }
    }

    pub fn title(&self, kind: ChartKind) -> &str {
        self.titles.get(&kind).map(String::as_str).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Status line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Info(String),
    Error(String),
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: AppConfig,
    pub render: RenderConfig,

    /// Loaded file and its analysis (None until user loads a file).
    pub session: Option<Session>,

    /// Filtered boundary layers, reused across loads of the same city.
    pub boundaries: BoundaryCache,

    /// Downloaded basemap tiles.
    pub tiles: TileCache,

    /// Status / error message shown in the UI.
    pub status: Option<Status>,

    /// Shown in the side panel when the CJK font is missing.
    pub font_warning: Option<String>,
}

impl AppState {
    pub fn new(config: AppConfig, render: RenderConfig, font_warning: Option<String>) -> Self {
        Self {
            config,
            render,
            session: None,
            boundaries: BoundaryCache::default(),
            tiles: TileCache::default(),
            status: None,
            font_warning,
        }
    }

    /// Load and analyse a file. Any failure replaces the previous session
    /// with nothing and leaves one error message.
    pub fn open_path(&mut self, path: &Path) {
        log::info!("Opening {}", path.display());
        match self.load_session(path) {
            Ok(session) => {
                self.session = Some(session);
                self.status = Some(Status::Info("✅ 數據分析完成！".to_string()));
            }
            Err(e) => {
                log::error!("Failed to analyse {}: {e:#}", path.display());
                self.session = None;
                self.status = Some(Status::Error(format!("讀取檔案或分析時發生錯誤：{e:#}")));
            }
        }
    }

    fn load_session(&mut self, path: &Path) -> Result<Session> {
        let mut dataset = load_file(path)?;
        log::info!(
            "Loaded {} rows with columns {:?}",
            dataset.len(),
            dataset.headers
        );
        let analysis = analyse(&mut dataset, &self.config, &mut self.boundaries)?;
        let mut session = Session::new(dataset, analysis);

        if let Some(map) = session.analysis.as_ref().and_then(|a| a.map.as_ref()) {
            session.map_shapes = project_layer(&map.layer, SIMPLIFY_TOLERANCE);
            session.basemap = self.tiles.basemap(
                self.config.tile_provider,
                map.layer.bounds,
                self.config.max_tiles,
                Duration::from_secs(self.config.tile_timeout_secs),
            );
        }
        Ok(session)
    }

    fn analysis(&self) -> Option<(&Session, &Analysis)> {
        let session = self.session.as_ref()?;
        Some((session, session.analysis.as_ref()?))
    }

    /// Render one chart and save it through a file dialog.
    pub fn export_chart(&mut self, kind: ChartKind) {
        let result = self.try_export_chart(kind);
        self.report_export(result);
    }

    fn try_export_chart(&self, kind: ChartKind) -> Result<Option<PathBuf>> {
        let Some((session, analysis)) = self.analysis() else {
            return Ok(None);
        };
        let Some(bytes) = export::chart_png(kind, analysis, session.title(kind), &self.render)? else {
            return Ok(None);
        };
        export::save_with_dialog(&kind.file_name(analysis.city.name()), "PNG", &["png"], &bytes)
    }

    /// Write the choropleth as a standalone Leaflet page.
    pub fn export_map_html(&mut self) {
        let result = self.try_export_map_html();
        self.report_export(result);
    }

    fn try_export_map_html(&self) -> Result<Option<PathBuf>> {
        let Some((_, analysis)) = self.analysis() else {
            return Ok(None);
        };
        let Some(map) = &analysis.map else {
            return Ok(None);
        };
        let city = analysis.city.name();
        let html = export::html::render_map_html(map, self.config.tile_provider);
        export::save_with_dialog(&map_file_name(city), "HTML", &["html"], html.as_bytes())
    }

    fn report_export(&mut self, result: Result<Option<PathBuf>>) {
        match result {
            Ok(Some(path)) => {
                self.status = Some(Status::Info(format!("✅ 已儲存 {}", path.display())));
            }
            Ok(None) => {}
            Err(e) => {
                log::error!("Export failed: {e:#}");
                self.status = Some(Status::Error(format!("匯出失敗：{e:#}")));
            }
        }
    }
}

pub fn map_file_name(city: &str) -> String {
    format!("{city}_成交地圖.html")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_state(base_dir: &Path) -> AppState {
        let config = AppConfig {
            base_dir: base_dir.to_path_buf(),
            ..AppConfig::default()
        };
        AppState::new(config, RenderConfig::default(), None)
    }

    #[test]
    fn open_path_analyses_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("高雄市_lvr.csv");
        std::fs::write(&path, "鄉鎮市區,總價元\n前鎮區,8000000\n苓雅區,3000000\n").unwrap();

        let mut state = offline_state(dir.path());
        state.open_path(&path);

        assert_eq!(state.status, Some(Status::Info("✅ 數據分析完成！".to_string())));
        let session = state.session.as_ref().unwrap();
        let analysis = session.analysis.as_ref().unwrap();
        assert_eq!(analysis.city.name(), "高雄市");
        assert_eq!(session.title(ChartKind::DistrictBar), "🏆 高雄市成交量前十名行政區");
        assert!(session.basemap.is_empty());
    }

    #[test]
    fn failed_load_clears_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.csv");
        std::fs::write(&good, "行政區\n東區\n").unwrap();

        let mut state = offline_state(dir.path());
        state.open_path(&good);
        assert!(state.session.is_some());

        state.open_path(&dir.path().join("missing.csv"));
        assert!(state.session.is_none());
        match &state.status {
            Some(Status::Error(msg)) => assert!(msg.starts_with("讀取檔案或分析時發生錯誤：")),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn malformed_boundary_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let info = dir.path().join("information");
        std::fs::create_dir(&info).unwrap();
        std::fs::write(info.join("TOWN_MOI_1140318.json"), "{ broken").unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "鄉鎮市區\n臺南市東區\n").unwrap();

        let mut state = offline_state(dir.path());
        state.open_path(&path);
        assert!(state.session.is_none());
        assert!(matches!(state.status, Some(Status::Error(_))));
    }

    #[test]
    fn file_without_district_column_keeps_raw_view() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "名稱,數量\nA,1\n").unwrap();

        let mut state = offline_state(dir.path());
        state.open_path(&path);
        let session = state.session.as_ref().unwrap();
        assert!(session.analysis.is_none());
        assert!(session.titles.is_empty());
        assert_eq!(session.dataset.len(), 1);
    }

    #[test]
    fn exports_without_analysis_do_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = offline_state(dir.path());
        state.export_chart(ChartKind::DistrictBar);
        state.export_map_html();
        assert!(state.status.is_none());
    }

    #[test]
    fn map_file_is_named_after_city() {
        assert_eq!(map_file_name("臺南市"), "臺南市_成交地圖.html");
    }
}
