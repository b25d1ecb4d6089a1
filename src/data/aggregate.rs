use std::collections::HashMap;

use super::model::CellValue;

/// Label of the bucket that collects districts outside the top N.
pub const OTHER_LABEL: &str = "其他";

/// `part / whole` as a percentage rounded half-up to one decimal.
///
/// Rounded in integer tenths so exact ties such as 28.75 go up.
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let (part, whole) = (part as u128, whole as u128);
    let tenths = (part * 2000 + whole) / (2 * whole);
    tenths as f64 / 10.0
}

// ---------------------------------------------------------------------------
// District counts
// ---------------------------------------------------------------------------

/// Occurrences per clean district, ranked by count. Ties keep the order in
/// which the districts were first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistrictCounts {
    ranked: Vec<(String, usize)>,
    total: usize,
}

impl DistrictCounts {
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut ranked: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for label in labels {
            let label = label.as_ref();
            match index.get(label) {
                Some(&i) => ranked[i].1 += 1,
                None => {
                    index.insert(label, ranked.len());
                    ranked.push((label.to_string(), 1));
                }
            }
        }
        // `sort_by` is stable, so equal counts stay in encounter order.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        DistrictCounts {
            ranked,
            total: labels.len(),
        }
    }

    /// All districts, highest count first.
    #[cfg(test)]
    pub fn ranked(&self) -> &[(String, usize)] {
        &self.ranked
    }

    /// Number of rows counted.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn distinct(&self) -> usize {
        self.ranked.len()
    }

    pub fn get(&self, district: &str) -> Option<usize> {
        self.ranked
            .iter()
            .find(|(name, _)| name == district)
            .map(|(_, n)| *n)
    }

    /// The first `n` districts.
    pub fn top(&self, n: usize) -> &[(String, usize)] {
        &self.ranked[..n.min(self.ranked.len())]
    }

    /// The first `n` districts plus an `其他` entry summing the rest, when
    /// there is a rest.
    pub fn top_with_other(&self, n: usize) -> Vec<(String, usize)> {
        let mut slices = self.top(n).to_vec();
        if self.ranked.len() > n {
            let rest: usize = self.ranked[n..].iter().map(|(_, c)| c).sum();
            slices.push((OTHER_LABEL.to_string(), rest));
        }
        slices
    }
}

// ---------------------------------------------------------------------------
// Price bands
// ---------------------------------------------------------------------------

/// One of the five total-price ranges, in NT$.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceBand {
    UpTo5M,
    UpTo10M,
    UpTo15M,
    UpTo20M,
    Above20M,
}

impl PriceBand {
    pub const ALL: [PriceBand; 5] = [
        PriceBand::UpTo5M,
        PriceBand::UpTo10M,
        PriceBand::UpTo15M,
        PriceBand::UpTo20M,
        PriceBand::Above20M,
    ];

    /// Upper edges of the first four bands. A value on an edge belongs to
    /// the band below it.
    const EDGES: [f64; 4] = [5e6, 1e7, 1.5e7, 2e7];

    /// Band of a positive price; `None` for zero, negative or non-finite.
    pub fn of(price: f64) -> Option<PriceBand> {
        if !price.is_finite() || price <= 0.0 {
            return None;
        }
        let idx = Self::EDGES
            .iter()
            .position(|&edge| price <= edge)
            .unwrap_or(Self::EDGES.len());
        Some(Self::ALL[idx])
    }

    pub fn label(self) -> &'static str {
        match self {
            PriceBand::UpTo5M => "0-500萬",
            PriceBand::UpTo10M => "500-1000萬",
            PriceBand::UpTo15M => "1000-1500萬",
            PriceBand::UpTo20M => "1500-2000萬",
            PriceBand::Above20M => "2000萬以上",
        }
    }
}

/// Count and share of one band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStat {
    pub band: PriceBand,
    pub count: usize,
    /// Percentage of the valid sample, one decimal.
    pub percent: f64,
}

/// Price distribution over the valid (numeric, positive) sample.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBreakdown {
    pub bands: [BandStat; 5],
    /// Number of prices that fell into a band.
    pub valid: usize,
}

impl PriceBreakdown {
    pub fn from_values<'a>(cells: impl IntoIterator<Item = &'a CellValue>) -> Self {
        let mut counts = [0usize; 5];
        for band in cells
            .into_iter()
            .filter_map(CellValue::as_f64)
            .filter_map(PriceBand::of)
        {
            counts[band as usize] += 1;
        }
        let valid: usize = counts.iter().sum();
        let bands = std::array::from_fn(|i| BandStat {
            band: PriceBand::ALL[i],
            count: counts[i],
            percent: percent(counts[i], valid),
        });
        PriceBreakdown { bands, valid }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn counts_rank_descending_with_stable_ties() {
        let counts = DistrictCounts::from_labels(&labels(&["北區", "東區", "南區", "東區", "南區"]));
        assert_eq!(
            counts.ranked(),
            &[("東區".to_string(), 2), ("南區".to_string(), 2), ("北區".to_string(), 1)]
        );
        assert_eq!(counts.total(), 5);
        assert_eq!(counts.get("南區"), Some(2));
        assert_eq!(counts.get("西區"), None);
    }

    #[test]
    fn tainan_scenario_counts() {
        let counts = DistrictCounts::from_labels(&labels(&["東區", "東區", "北區"]));
        assert_eq!(counts.ranked(), &[("東區".to_string(), 2), ("北區".to_string(), 1)]);
    }

    #[test]
    fn other_bucket_only_when_more_than_n() {
        let ten: Vec<String> = (0..10).map(|i| format!("區{i}")).collect();
        let counts = DistrictCounts::from_labels(&ten);
        let slices = counts.top_with_other(10);
        assert_eq!(slices.len(), 10);
        assert!(slices.iter().all(|(name, _)| name != OTHER_LABEL));

        let mut twelve = ten.clone();
        twelve.extend(labels(&["甲", "乙", "乙"]));
        let counts = DistrictCounts::from_labels(&twelve);
        let slices = counts.top_with_other(10);
        assert_eq!(slices.len(), 11);
        // 乙 (2) ranks first, which pushes 區9 and 甲 into 其他.
        assert_eq!(slices[0], ("乙".to_string(), 2));
        assert_eq!(slices[10], (OTHER_LABEL.to_string(), 2));
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(1, 8), 12.5);
        assert_eq!(percent(1, 3), 33.3);
        assert_eq!(percent(2, 3), 66.7);
        assert_eq!(percent(1, 16), 6.3);
        assert_eq!(percent(23, 80), 28.8);
        assert_eq!(percent(41, 80), 51.3);
        assert_eq!(percent(51, 80), 63.8);
        assert_eq!(percent(80, 80), 100.0);
        assert_eq!(percent(3, 0), 0.0);
    }

    #[test]
    fn band_edges_belong_to_lower_band() {
        assert_eq!(PriceBand::of(5e6), Some(PriceBand::UpTo5M));
        assert_eq!(PriceBand::of(5e6 + 1.0), Some(PriceBand::UpTo10M));
        assert_eq!(PriceBand::of(2e7), Some(PriceBand::UpTo20M));
        assert_eq!(PriceBand::of(2e7 + 1.0), Some(PriceBand::Above20M));
        assert_eq!(PriceBand::of(0.0), None);
        assert_eq!(PriceBand::of(-1.0), None);
    }

    #[test]
    fn four_price_scenario() {
        let cells: Vec<CellValue> = [1e6, 6e6, 12e6, 21e6].iter().map(|&v| CellValue::Float(v)).collect();
        let pb = PriceBreakdown::from_values(&cells);
        assert_eq!(pb.valid, 4);
        let got: Vec<(&str, usize, f64)> = pb.bands.iter().map(|b| (b.band.label(), b.count, b.percent)).collect();
        assert_eq!(
            got,
            vec![
                ("0-500萬", 1, 25.0),
                ("500-1000萬", 1, 25.0),
                ("1000-1500萬", 1, 25.0),
                ("1500-2000萬", 0, 0.0),
                ("2000萬以上", 1, 25.0),
            ]
        );
    }

    #[test]
    fn invalid_prices_leave_the_denominator() {
        let cells = vec![
            CellValue::Integer(3_000_000),
            CellValue::Empty,
            CellValue::Text("N/A".into()),
            CellValue::Text("12,000,000".into()),
        ];
        let pb = PriceBreakdown::from_values(&cells);
        assert_eq!(pb.valid, 2);
        assert_eq!(pb.bands[0].percent, 50.0);
        assert_eq!(pb.bands[2].percent, 50.0);
    }

    proptest! {
        #[test]
        fn percent_is_nearest_tenth_with_ties_up(whole in 1usize..5000, frac in 0.0f64..=1.0) {
            let part = (whole as f64 * frac) as usize;
            let tenths = (percent(part, whole) * 10.0).round() as i128;
            let (part, whole) = (part as i128, whole as i128);
            // tenths - 0.5 <= part * 1000 / whole < tenths + 0.5
            prop_assert!((2 * tenths - 1) * whole <= part * 2000, "{}/{}", part, whole);
            prop_assert!(part * 2000 < (2 * tenths + 1) * whole, "{}/{}", part, whole);
        }

        #[test]
        fn counts_sum_to_total(names in prop::collection::vec(0u8..20, 0..200)) {
            let labels: Vec<String> = names.iter().map(|n| format!("區{n}")).collect();
            let counts = DistrictCounts::from_labels(&labels);
            let sum: usize = counts.ranked().iter().map(|(_, c)| c).sum();
            prop_assert_eq!(sum, labels.len());

            let slices = counts.top_with_other(10);
            let sliced: usize = slices.iter().map(|(_, c)| c).sum();
            prop_assert_eq!(sliced, labels.len());
            prop_assert_eq!(slices.iter().any(|(n, _)| n == OTHER_LABEL), counts.distinct() > 10);
        }

        #[test]
        fn bands_partition_valid_sample(prices in prop::collection::vec(prop_oneof![
            (1.0f64..5e7).prop_map(CellValue::Float),
            Just(CellValue::Empty),
            Just(CellValue::Text("x".into())),
        ], 1..300)) {
            let pb = PriceBreakdown::from_values(&prices);
            let numeric = prices.iter().filter(|c| c.as_f64().is_some()).count();
            let banded: usize = pb.bands.iter().map(|b| b.count).sum();
            prop_assert_eq!(banded, numeric);
            prop_assert_eq!(pb.valid, numeric);
            if numeric > 0 {
                let total: f64 = pb.bands.iter().map(|b| b.percent).sum();
                prop_assert!((total - 100.0).abs() <= 0.5, "sum {}", total);
            }
        }
    }
}
