//! Chart content shared by the on-screen plots and the PNG exporter.

use std::f64::consts::TAU;

use crate::analysis::Analysis;
use crate::data::aggregate::percent;

/// The four exportable charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    DistrictBar,
    DistrictRing,
    PriceBar,
    PriceRing,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::DistrictBar,
        ChartKind::DistrictRing,
        ChartKind::PriceBar,
        ChartKind::PriceRing,
    ];

    /// Title shown until the user edits it.
    pub fn default_title(self, city: &str) -> String {
        match self {
            ChartKind::DistrictBar => format!("🏆 {city}成交量前十名行政區"),
            ChartKind::DistrictRing => format!("📈 {city}成交比例 (Top 10+其他)"),
            ChartKind::PriceBar => format!("🏘️ {city}成交總價區間"),
            ChartKind::PriceRing => format!("🪙 {city}成交總價比例"),
        }
    }

    /// Label of the title input box.
    pub fn title_prompt(self) -> &'static str {
        match self {
            ChartKind::DistrictBar => "成交排行標題：",
            ChartKind::DistrictRing => "成交比例標題：",
            ChartKind::PriceBar => "價格區間標題：",
            ChartKind::PriceRing => "價格比例標題：",
        }
    }

    pub fn file_name(self, city: &str) -> String {
        let suffix = match self {
            ChartKind::DistrictBar => "成交排行",
            ChartKind::DistrictRing => "成交比例",
            ChartKind::PriceBar => "總價區間",
            ChartKind::PriceRing => "總價比例",
        };
        format!("{city}_{suffix}.png")
    }
}

// ---------------------------------------------------------------------------
// Chart data
// ---------------------------------------------------------------------------

/// One bar: label, count and share of the chart's denominator.
#[derive(Debug, Clone, PartialEq)]
pub struct BarItem {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

impl BarItem {
    /// `123筆 (12.3%)`
    pub fn annotation(&self) -> String {
        format!("{}筆 ({:.1}%)", self.count, self.percent)
    }
}

/// Ring chart content: slices plus the caption printed in the hole.
#[derive(Debug, Clone, PartialEq)]
pub struct RingData {
    pub slices: Vec<(String, usize)>,
    pub center_caption: String,
    pub total: usize,
}

impl RingData {
    /// Slices with non-zero counts, the only ones that get a wedge.
    pub fn wedges(&self) -> Vec<Wedge> {
        ring_wedges(&self.slices.iter().map(|(_, c)| *c).collect::<Vec<_>>(), RING_START_DEG)
    }

    /// Percentage label of one wedge, rounded like the bar annotations.
    pub fn share_label(&self, wedge: &Wedge) -> String {
        let whole: usize = self.slices.iter().map(|(_, c)| c).sum();
        format!("{:.1}%", percent(self.slices[wedge.index].1, whole))
    }
}

/// Top districts as bars, percentages against all rows.
pub fn district_bars(analysis: &Analysis) -> Vec<BarItem> {
    let total = analysis.districts.total();
    analysis
        .top_districts()
        .iter()
        .map(|(name, count)| BarItem {
            label: name.clone(),
            count: *count,
            percent: percent(*count, total),
        })
        .collect()
}

pub fn district_ring(analysis: &Analysis) -> RingData {
    let total = analysis.districts.total();
    RingData {
        slices: analysis.district_slices(),
        center_caption: format!("成交總筆數\n{total}筆"),
        total,
    }
}

/// Price bands as bars, percentages against the valid price sample.
pub fn price_bars(analysis: &Analysis) -> Option<Vec<BarItem>> {
    let prices = analysis.prices.as_ref()?;
    Some(
        prices
            .bands
            .iter()
            .map(|b| BarItem {
                label: b.band.label().to_string(),
                count: b.count,
                percent: b.percent,
            })
            .collect(),
    )
}

pub fn price_ring(analysis: &Analysis) -> Option<RingData> {
    let prices = analysis.prices.as_ref()?;
    Some(RingData {
        slices: prices
            .bands
            .iter()
            .map(|b| (b.band.label().to_string(), b.count))
            .collect(),
        center_caption: format!("有效樣本\n{}筆", prices.valid),
        total: prices.valid,
    })
}

// ---------------------------------------------------------------------------
// Ring geometry
// ---------------------------------------------------------------------------

/// First wedge starts here, measured counter-clockwise from east.
pub const RING_START_DEG: f64 = 140.0;
/// Inner radius as a fraction of the outer radius.
pub const RING_HOLE: f64 = 0.5;

/// Angular extent of one slice, radians, counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wedge {
    /// Index into the slice list.
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl Wedge {
    pub fn mid(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    /// Closed outline of the wedge between `inner` and `outer` radius, in
    /// math orientation (y up), around the origin.
    pub fn outline(&self, inner: f64, outer: f64) -> Vec<(f64, f64)> {
        let steps = ((self.end - self.start) / TAU * 180.0).ceil().max(2.0) as usize;
        let arc = |r: f64, reverse: bool| -> Vec<(f64, f64)> {
            let mut pts: Vec<(f64, f64)> = (0..=steps)
                .map(|i| {
                    let a = self.start + (self.end - self.start) * i as f64 / steps as f64;
                    (r * a.cos(), r * a.sin())
                })
                .collect();
            if reverse {
                pts.reverse();
            }
            pts
        };
        let mut pts = arc(outer, false);
        pts.extend(arc(inner, true));
        pts
    }

    /// The wedge cut into convex quads (outer edge first), for renderers
    /// that only fill convex shapes.
    pub fn quads(&self, inner: f64, outer: f64) -> Vec<[(f64, f64); 4]> {
        let pts = self.outline(inner, outer);
        let half = pts.len() / 2;
        let (outer_arc, inner_arc) = pts.split_at(half);
        (0..half - 1)
            .map(|i| {
                let j = half - 1 - i;
                [outer_arc[i], outer_arc[i + 1], inner_arc[j - 1], inner_arc[j]]
            })
            .collect()
    }
}

/// Lay out slices counter-clockwise from `start_deg`; zero slices are skipped.
pub fn ring_wedges(values: &[usize], start_deg: f64) -> Vec<Wedge> {
    let total: usize = values.iter().sum();
    if total == 0 {
        return Vec::new();
    }
    let mut angle = start_deg.to_radians();
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v > 0)
        .map(|(index, &v)| {
            let start = angle;
            angle += v as f64 / total as f64 * TAU;
            Wedge {
                index,
                start,
                end: angle,
            }
        })
        .collect()
}
