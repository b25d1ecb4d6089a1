use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use eframe::egui::ColorImage;
use serde::{Deserialize, Serialize};

/// Zoom used when the city fits; larger cities get a coarser zoom.
pub const MAX_ZOOM: u8 = 11;

const USER_AGENT: &str = concat!("twrealty/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Hosted basemaps in Web-Mercator (XYZ) tiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileProvider {
    /// 國土測繪中心 electronic map (WMTS, row before column).
    Nlsc,
    /// CARTO light basemap.
    CartoLight,
}

impl TileProvider {
    /// Template with `{z}`, `{x}`, `{y}` placeholders, Leaflet style.
    pub fn template(self) -> &'static str {
        match self {
            TileProvider::Nlsc => {
                "https://wmts.nlsc.gov.tw/wmts/EMAP/default/GoogleMapsCompatible/{z}/{y}/{x}"
            }
            TileProvider::CartoLight => "https://basemaps.cartocdn.com/light_all/{z}/{x}/{y}.png",
        }
    }

    pub fn attribution(self) -> &'static str {
        match self {
            TileProvider::Nlsc => "&copy; 國土測繪圖資服務雲",
            TileProvider::CartoLight => "&copy; OpenStreetMap contributors &copy; CARTO",
        }
    }

    pub fn url(self, key: TileKey) -> String {
        self.template()
            .replace("{z}", &key.z.to_string())
            .replace("{x}", &key.x.to_string())
            .replace("{y}", &key.y.to_string())
    }
}

// ---------------------------------------------------------------------------
// Web-Mercator tile math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    /// West and east edges in degrees longitude.
    pub fn lon_range(self) -> (f64, f64) {
        let n = (1u64 << self.z) as f64;
        (self.x as f64 / n * 360.0 - 180.0, (self.x + 1) as f64 / n * 360.0 - 180.0)
    }

    /// North and south edges in projected (Mercator) degrees.
    pub fn merc_range(self) -> (f64, f64) {
        let n = (1u64 << self.z) as f64;
        let edge = |y: f64| (PI * (1.0 - 2.0 * y / n)).to_degrees();
        (edge(self.y as f64), edge(self.y as f64 + 1.0))
    }
}

/// Latitude projected to Mercator, scaled to degrees so it shares units
/// with longitude on the plot.
pub fn mercator_y(lat: f64) -> f64 {
    let phi = lat.to_radians();
    (PI / 4.0 + phi / 2.0).tan().ln().to_degrees()
}

fn tile_x(lon: f64, z: u8) -> u32 {
    let n = (1u64 << z) as f64;
    (((lon + 180.0) / 360.0 * n).floor()).clamp(0.0, n - 1.0) as u32
}

fn tile_y(lat: f64, z: u8) -> u32 {
    let n = (1u64 << z) as f64;
    let t = (1.0 - mercator_y(lat).to_radians() / PI) / 2.0 * n;
    t.floor().clamp(0.0, n - 1.0) as u32
}

/// Tiles covering `(min lon, min lat, max lon, max lat)` at zoom `z`.
pub fn covering(bounds: (f64, f64, f64, f64), z: u8) -> Vec<TileKey> {
    let (x0, x1) = (tile_x(bounds.0, z), tile_x(bounds.2, z));
    // Tile rows grow southwards.
    let (y0, y1) = (tile_y(bounds.3, z), tile_y(bounds.1, z));
    (y0..=y1)
        .flat_map(|y| (x0..=x1).map(move |x| TileKey { z, x, y }))
        .collect()
}

/// Highest zoom up to [`MAX_ZOOM`] whose covering has at most `max_tiles`.
pub fn choose_zoom(bounds: (f64, f64, f64, f64), max_tiles: usize) -> u8 {
    (0..=MAX_ZOOM)
        .rev()
        .find(|&z| covering(bounds, z).len() <= max_tiles)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tile cache
// ---------------------------------------------------------------------------

/// Downloaded tiles, keyed by provider and tile. Failed tiles are
/// remembered as `None` so they are not requested again.
#[derive(Default)]
pub struct TileCache {
    tiles: HashMap<(TileProvider, TileKey), Option<Arc<ColorImage>>>,
}

impl TileCache {
    /// Fetch (or reuse) every tile covering `bounds`. Network trouble is
    /// logged and yields a partial or empty basemap.
    pub fn basemap(
        &mut self,
        provider: TileProvider,
        bounds: (f64, f64, f64, f64),
        max_tiles: usize,
        timeout: Duration,
    ) -> Vec<(TileKey, Arc<ColorImage>)> {
        let z = choose_zoom(bounds, max_tiles);
        let keys = covering(bounds, z);

        let missing: Vec<TileKey> = keys
            .iter()
            .copied()
            .filter(|k| !self.tiles.contains_key(&(provider, *k)))
            .collect();
        if !missing.is_empty() {
            self.download(provider, &missing, timeout);
        }

        keys.into_iter()
            .filter_map(|k| {
                let image = self.tiles.get(&(provider, k))?.clone()?;
                Some((k, image))
            })
            .collect()
    }

    fn download(&mut self, provider: TileProvider, keys: &[TileKey], timeout: Duration) {
        let client = match reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Tile client unavailable: {e}");
                return;
            }
        };

        log::info!("Fetching {} basemap tiles from {provider:?}", keys.len());
        for &key in keys {
            match fetch_tile(&client, provider, key) {
                Ok(image) => {
                    self.tiles.insert((provider, key), Some(Arc::new(image)));
                }
                Err(e) => {
                    log::warn!("Tile {key:?} unavailable: {e:#}");
                    self.tiles.insert((provider, key), None);
                    if e.downcast_ref::<reqwest::Error>().is_some_and(|re| re.is_connect() || re.is_timeout()) {
                        // Offline: stop instead of waiting out every tile.
                        log::warn!("Basemap download aborted");
                        return;
                    }
                }
            }
        }
    }
}

fn fetch_tile(client: &reqwest::blocking::Client, provider: TileProvider, key: TileKey) -> Result<ColorImage> {
    let bytes = client
        .get(provider.url(key))
        .send()?
        .error_for_status()?
        .bytes()?;
    let rgba = image::load_from_memory(&bytes)
        .context("decoding tile image")?
        .to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}
