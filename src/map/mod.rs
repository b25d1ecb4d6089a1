//! Administrative boundaries: load, filter to one city, join with counts.

pub mod shapes;
pub mod tiles;

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use geo::{BoundingRect, Centroid, MultiPolygon};
use geojson::{Feature, GeoJson};

use crate::data::aggregate::{DistrictCounts, percent};
use crate::data::city::{CityMatch, strip_city_prefix};
use crate::error::AnalysisError;

const COUNTY_PROPERTY: &str = "COUNTYNAME";
const TOWN_PROPERTY: &str = "TOWNNAME";

// ---------------------------------------------------------------------------
// Boundary features
// ---------------------------------------------------------------------------

/// One district polygon of the active city.
#[derive(Debug, Clone)]
pub struct BoundaryFeature {
    pub county: String,
    /// `TOWNNAME` as stored in the file.
    pub town_raw: String,
    /// Town name with the city prefix removed; joins against district counts.
    pub town: String,
    pub shape: MultiPolygon<f64>,
    /// Centroid as (lon, lat).
    pub centroid: (f64, f64),
}

/// Per-feature count after joining with the district ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TownStat {
    pub count: usize,
    pub percent: f64,
}

/// All features of one city plus the derived map center.
#[derive(Debug, Clone)]
pub struct MapLayer {
    pub city: String,
    pub features: Vec<BoundaryFeature>,
    /// Mean of the feature centroids, as (lat, lon).
    pub center: (f64, f64),
    /// (min lon, min lat, max lon, max lat)
    pub bounds: (f64, f64, f64, f64),
}

impl MapLayer {
    fn new(city: &CityMatch, features: Vec<BoundaryFeature>) -> Option<Self> {
        if features.is_empty() {
            return None;
        }
        let n = features.len() as f64;
        let lat = features.iter().map(|f| f.centroid.1).sum::<f64>() / n;
        let lon = features.iter().map(|f| f.centroid.0).sum::<f64>() / n;

        let mut bounds = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for rect in features.iter().filter_map(|f| f.shape.bounding_rect()) {
            bounds.0 = bounds.0.min(rect.min().x);
            bounds.1 = bounds.1.min(rect.min().y);
            bounds.2 = bounds.2.max(rect.max().x);
            bounds.3 = bounds.3.max(rect.max().y);
        }

        Some(MapLayer {
            city: city.name().to_string(),
            features,
            center: (lat, lon),
            bounds,
        })
    }

    /// Count and share for each feature, in feature order. Towns without a
    /// matching district get zero.
    pub fn join(&self, counts: &DistrictCounts) -> Vec<TownStat> {
        self.features
            .iter()
            .map(|f| {
                let count = counts.get(&f.town).unwrap_or(0);
                TownStat {
                    count,
                    percent: percent(count, counts.total()),
                }
            })
            .collect()
    }
}

/// Parse a boundary file and keep the features of `city`.
pub fn load_layer(path: &Path, city: &CityMatch) -> Result<Option<MapLayer>, AnalysisError> {
    let file = File::open(path).map_err(|source| AnalysisError::BoundaryIo {
        path: path.to_path_buf(),
        source,
    })?;
    let geojson =
        GeoJson::from_reader(BufReader::new(file)).map_err(|source| AnalysisError::BoundaryParse {
            path: path.to_path_buf(),
            source,
        })?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(AnalysisError::NotFeatureCollection(path.to_path_buf()));
    };

    let total = collection.features.len();
    let features: Vec<BoundaryFeature> = collection
        .features
        .into_iter()
        .filter_map(|feature| boundary_feature(feature, city))
        .collect();
    log::info!(
        "Boundary file {}: {} of {total} features belong to {}",
        path.display(),
        features.len(),
        city.name()
    );

    Ok(MapLayer::new(city, features))
}

fn string_property(feature: &Feature, key: &str) -> Option<String> {
    feature
        .property(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
}

fn boundary_feature(feature: Feature, city: &CityMatch) -> Option<BoundaryFeature> {
    let county = string_property(&feature, COUNTY_PROPERTY)?;
    if !city.matches(&county) {
        return None;
    }
    let town_raw = string_property(&feature, TOWN_PROPERTY).unwrap_or_default();

    let shape = match geo::Geometry::<f64>::try_from(feature.geometry?.value).ok()? {
        geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
        geo::Geometry::MultiPolygon(mp) => mp,
        other => {
            log::debug!("Skipping {town_raw}: unsupported geometry {other:?}");
            return None;
        }
    };
    let centroid = shape.centroid()?;

    Some(BoundaryFeature {
        county,
        town: strip_city_prefix(&town_raw, city),
        town_raw,
        shape,
        centroid: (centroid.x(), centroid.y()),
    })
}

// ---------------------------------------------------------------------------
// Memoized (path, city) → layer table
// ---------------------------------------------------------------------------

/// Filtered layers keyed by city, valid for one boundary file. Asking for a
/// different file drops everything cached so far.
#[derive(Debug, Default)]
pub struct BoundaryCache {
    source: Option<PathBuf>,
    layers: HashMap<String, Option<Arc<MapLayer>>>,
}

impl BoundaryCache {
    /// The layer for `city`, or `None` when the file is absent or has no
    /// features for that city.
    pub fn layer(
        &mut self,
        path: &Path,
        city: &CityMatch,
    ) -> Result<Option<Arc<MapLayer>>, AnalysisError> {
        if self.source.as_deref() != Some(path) {
            if self.source.is_some() {
                log::debug!("Boundary source changed, clearing cache");
            }
            self.layers.clear();
            self.source = Some(path.to_path_buf());
        }

        if let Some(cached) = self.layers.get(city.name()) {
            return Ok(cached.clone());
        }

        if !path.exists() {
            log::warn!("Boundary file {} not found, map skipped", path.display());
            return Ok(None);
        }

        let layer = load_layer(path, city)?.map(Arc::new);
        self.layers.insert(city.name().to_string(), layer.clone());
        Ok(layer)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.layers.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::city::CityOrigin;

    fn square(x: f64, y: f64, size: f64) -> String {
        format!(
            "[[[{x},{y}],[{x2},{y}],[{x2},{y2}],[{x},{y2}],[{x},{y}]]]",
            x2 = x + size,
            y2 = y + size
        )
    }

    /// Two Tainan towns (one in the 台 spelling) and one Taipei town.
    pub(crate) fn sample_geojson() -> String {
        format!(
            r#"{{"type":"FeatureCollection","features":[
              {{"type":"Feature","properties":{{"COUNTYNAME":"臺南市","TOWNNAME":"東區"}},
                "geometry":{{"type":"Polygon","coordinates":{a}}}}},
              {{"type":"Feature","properties":{{"COUNTYNAME":"台南市","TOWNNAME":"台南市北區"}},
                "geometry":{{"type":"MultiPolygon","coordinates":[{b}]}}}},
              {{"type":"Feature","properties":{{"COUNTYNAME":"臺北市","TOWNNAME":"大安區"}},
                "geometry":{{"type":"Polygon","coordinates":{c}}}}}
            ]}}"#,
            a = square(120.0, 23.0, 0.2),
            b = square(120.4, 23.0, 0.2),
            c = square(121.5, 25.0, 0.1),
        )
    }

    fn tainan() -> CityMatch {
        CityMatch::new("臺南市", CityOrigin::Detected)
    }

    fn write_sample(dir: &Path) -> PathBuf {
        let path = dir.join("towns.json");
        std::fs::write(&path, sample_geojson()).unwrap();
        path
    }

    #[test]
    fn filters_by_either_spelling_and_strips_town_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let layer = load_layer(&write_sample(dir.path()), &tainan()).unwrap().unwrap();
        let towns: Vec<&str> = layer.features.iter().map(|f| f.town.as_str()).collect();
        assert_eq!(towns, vec!["東區", "北區"]);
        assert_eq!(layer.features[1].town_raw, "台南市北區");
    }

    #[test]
    fn center_is_mean_of_centroids() {
        let dir = tempfile::tempdir().unwrap();
        let layer = load_layer(&write_sample(dir.path()), &tainan()).unwrap().unwrap();
        let (lat, lon) = layer.center;
        assert!((lat - 23.1).abs() < 1e-9);
        assert!((lon - 120.3).abs() < 1e-9);
        assert!((layer.bounds.2 - 120.6).abs() < 1e-9);
    }

    #[test]
    fn join_fills_missing_towns_with_zero() {
        let dir = tempfile::tempdir().unwrap();
        let layer = load_layer(&write_sample(dir.path()), &tainan()).unwrap().unwrap();
        let counts = DistrictCounts::from_labels(&["東區", "東區", "安平區", "東區"]);
        let stats = layer.join(&counts);
        assert_eq!(stats[0], TownStat { count: 3, percent: 75.0 });
        assert_eq!(stats[1], TownStat { count: 0, percent: 0.0 });
    }

    #[test]
    fn city_without_features_has_no_layer() {
        let dir = tempfile::tempdir().unwrap();
        let city = CityMatch::new("金門縣", CityOrigin::Detected);
        assert!(load_layer(&write_sample(dir.path()), &city).unwrap().is_none());
    }

    #[test]
    fn missing_file_is_skipped_not_an_error() {
        let mut cache = BoundaryCache::default();
        let got = cache.layer(Path::new("/nonexistent/towns.json"), &tainan()).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"type\": \"Nope\"").unwrap();
        let mut cache = BoundaryCache::default();
        assert!(cache.layer(&path, &tainan()).is_err());
    }

    #[test]
    fn truncated_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ broken").unwrap();
        let err = load_layer(&path, &tainan()).unwrap_err();
        assert!(matches!(err, AnalysisError::BoundaryParse { .. }));
        assert!(err.to_string().starts_with("parsing boundary file"));
    }

    #[test]
    fn geometry_is_not_a_feature_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("point.json");
        std::fs::write(&path, r#"{"type":"Point","coordinates":[120.2,23.0]}"#).unwrap();
        let err = load_layer(&path, &tainan()).unwrap_err();
        assert!(matches!(err, AnalysisError::NotFeatureCollection(_)));
    }

    #[test]
    fn cache_serves_repeat_lookups_and_resets_on_new_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(dir.path());
        let mut cache = BoundaryCache::default();

        let first = cache.layer(&path, &tainan()).unwrap().unwrap();
        std::fs::remove_file(&path).unwrap();
        // Served from the table even though the file is gone.
        let again = cache.layer(&path, &tainan()).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(cache.len(), 1);

        let other = dir.path().join("other.json");
        assert!(cache.layer(&other, &tainan()).unwrap().is_none());
        assert_eq!(cache.len(), 0);
    }
}
