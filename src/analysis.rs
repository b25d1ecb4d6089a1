use std::sync::Arc;

use crate::config::AppConfig;
use crate::data::aggregate::{DistrictCounts, PriceBreakdown};
use crate::data::city::{CityDetector, CityMatch, strip_city_prefix};
use crate::data::columns::ColumnRoles;
use crate::data::model::Dataset;
use crate::error::AnalysisError;
use crate::map::{BoundaryCache, MapLayer, TownStat};

/// Shown instead of an empty district label.
pub const BLANK_DISTRICT: &str = "(空白)";

// ---------------------------------------------------------------------------
// Analysis results
// ---------------------------------------------------------------------------

/// Boundary layer of the active city joined with the district counts.
#[derive(Debug, Clone)]
pub struct MapView {
    pub layer: Arc<MapLayer>,
    /// One entry per `layer.features`, same order.
    pub stats: Vec<TownStat>,
}

/// Everything derived from one loaded dataset.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub roles: ColumnRoles,
    pub city: CityMatch,
    pub districts: DistrictCounts,
    /// `None` when the file has no total-price column.
    pub prices: Option<PriceBreakdown>,
    /// `None` when the boundary file is absent or has no features for the city.
    pub map: Option<MapView>,
    pub top_n: usize,
}

impl Analysis {
    /// Top districts for the bar chart.
    pub fn top_districts(&self) -> &[(String, usize)] {
        self.districts.top(self.top_n)
    }

    /// Top districts plus 其他 for the ring chart.
    pub fn district_slices(&self) -> Vec<(String, usize)> {
        self.districts.top_with_other(self.top_n)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run columns → city → normalization → aggregation → map join on a
/// freshly loaded dataset. Returns `Ok(None)` when there is no district
/// column to analyse. Adds the clean-district column to `dataset`.
pub fn analyse(
    dataset: &mut Dataset,
    config: &AppConfig,
    boundaries: &mut BoundaryCache,
) -> Result<Option<Analysis>, AnalysisError> {
    let roles = ColumnRoles::detect(&dataset.headers);
    let Some(district_col) = roles.district else {
        log::warn!("No district column in {:?}", dataset.headers);
        return Ok(None);
    };

    let city = CityDetector::new(&config.fallback_city).detect(
        dataset,
        &roles,
        config.detection_sample,
        config.district_sample,
    );

    let clean: Vec<String> = dataset
        .column(district_col)
        .map(|cell| {
            let label = strip_city_prefix(&cell.to_string(), &city);
            if label.is_empty() {
                BLANK_DISTRICT.to_string()
            } else {
                label
            }
        })
        .collect();
    let rows = dataset.len();
    dataset
        .set_clean_districts(clean)
        .map_err(|got| AnalysisError::ColumnLength { got, rows })?;

    let districts = DistrictCounts::from_labels(dataset.clean_districts().unwrap_or_default());
    let prices = roles
        .price
        .map(|col| PriceBreakdown::from_values(dataset.column(col)));
    if let Some(p) = &prices {
        log::info!("{} of {} rows have a usable total price", p.valid, dataset.len());
    }

    let map = boundaries
        .layer(&config.boundary_path(), &city)?
        .map(|layer| MapView {
            stats: layer.join(&districts),
            layer,
        });

    log::info!(
        "Analysed {} rows: {} in {} districts",
        dataset.len(),
        city.name(),
        districts.distinct()
    );

    Ok(Some(Analysis {
        roles,
        city,
        districts,
        prices,
        map,
        top_n: config.top_n,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::city::CityOrigin;
    use crate::data::loader::parse_csv;
    use std::path::PathBuf;

    fn config_without_boundaries() -> AppConfig {
        AppConfig {
            base_dir: PathBuf::from("/nonexistent"),
            ..AppConfig::default()
        }
    }

    #[test]
    fn tainan_csv_scenario() {
        let csv = "鄉鎮市區,總價元\n臺南市東區,1000000\n臺南市東區,6000000\n臺南市北區,abc\n";
        let mut ds = parse_csv(csv.as_bytes(), "upload.csv").unwrap();
        let mut cache = BoundaryCache::default();
        let a = analyse(&mut ds, &config_without_boundaries(), &mut cache)
            .unwrap()
            .unwrap();

        assert_eq!(a.city.name(), "臺南市");
        assert_eq!(a.city.origin, CityOrigin::Detected);
        assert_eq!(ds.clean_districts().unwrap(), &["東區", "東區", "北區"]);
        assert_eq!(
            a.districts.ranked(),
            &[("東區".to_string(), 2), ("北區".to_string(), 1)]
        );
        let prices = a.prices.unwrap();
        assert_eq!(prices.valid, 2);
        // Missing boundary file: no map, no error.
        assert!(a.map.is_none());
    }

    #[test]
    fn no_district_column_means_no_analysis() {
        let mut ds = parse_csv("名稱,總價元\nA,1\n".as_bytes(), "x.csv").unwrap();
        let got = analyse(&mut ds, &config_without_boundaries(), &mut BoundaryCache::default()).unwrap();
        assert!(got.is_none());
        assert!(ds.clean_districts().is_none());
    }

    #[test]
    fn missing_price_column_skips_price_bands() {
        let mut ds = parse_csv("行政區\n東區\n\n".as_bytes(), "x.csv").unwrap();
        let a = analyse(&mut ds, &config_without_boundaries(), &mut BoundaryCache::default())
            .unwrap()
            .unwrap();
        assert!(a.prices.is_none());
        assert_eq!(a.city.origin, CityOrigin::Fallback);
    }

    #[test]
    fn blank_districts_are_labelled() {
        let mut ds = parse_csv("鄉鎮市區,x\n臺南市,1\n,2\n".as_bytes(), "x.csv").unwrap();
        let a = analyse(&mut ds, &config_without_boundaries(), &mut BoundaryCache::default())
            .unwrap()
            .unwrap();
        assert_eq!(a.districts.ranked(), &[(BLANK_DISTRICT.to_string(), 2)]);
    }

    #[test]
    fn more_than_ten_districts_fold_into_other() {
        let mut csv = String::from("鄉鎮市區\n");
        for i in 0..12 {
            csv.push_str(&format!("臺南市區{i}\n"));
        }
        let mut ds = parse_csv(csv.as_bytes(), "x.csv").unwrap();
        let a = analyse(&mut ds, &config_without_boundaries(), &mut BoundaryCache::default())
            .unwrap()
            .unwrap();
        assert_eq!(a.top_districts().len(), 10);
        let slices = a.district_slices();
        assert_eq!(slices.len(), 11);
        assert_eq!(slices.iter().map(|(_, c)| c).sum::<usize>(), 12);
    }

    #[test]
    fn boundary_layer_is_joined() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("towns.json"), crate::map::tests::sample_geojson()).unwrap();
        let config = AppConfig {
            base_dir: dir.path().to_path_buf(),
            boundary_file: PathBuf::from("towns.json"),
            ..AppConfig::default()
        };
        let mut ds = parse_csv("鄉鎮市區\n臺南市北區\n臺南市東區\n臺南市北區\n".as_bytes(), "x.csv").unwrap();
        let a = analyse(&mut ds, &config, &mut BoundaryCache::default())
            .unwrap()
            .unwrap();
        let map = a.map.unwrap();
        let counts: Vec<usize> = map.stats.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![1, 2]);
    }
}
