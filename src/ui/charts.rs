use std::collections::HashMap;

use eframe::egui::{Align2, Color32, RichText, Stroke, Ui};
use egui_plot::{Bar, BarChart, GridMark, Line, Plot, PlotPoint, PlotPoints, Polygon, Text};

use crate::chart::{self, BarItem, ChartKind, RING_HOLE, RingData};
use crate::color::{flare, generate_palette, viridis};
use crate::state::Session;

const BAR_PLOT_HEIGHT: f32 = 320.0;
const RING_PLOT_HEIGHT: f32 = 340.0;

// ---------------------------------------------------------------------------
// Chart sections (central panel)
// ---------------------------------------------------------------------------

/// District and price sections. Returns the chart whose download button
/// was clicked, if any.
pub fn chart_sections(ui: &mut Ui, session: &mut Session) -> Option<ChartKind> {
    let Session {
        analysis, titles, ..
    } = session;
    let analysis = analysis.as_ref()?;
    let mut download = None;

    ui.heading("📊 成交量分佈分析");
    let bars = chart::district_bars(analysis);
    let ring = chart::district_ring(analysis);
    ui.columns(2, |cols: &mut [Ui]| {
        if chart_header(&mut cols[0], ChartKind::DistrictBar, titles) {
            download = Some(ChartKind::DistrictBar);
        }
        bar_plot(&mut cols[0], "district_bar", &bars, &viridis(bars.len()));

        if chart_header(&mut cols[1], ChartKind::DistrictRing, titles) {
            download = Some(ChartKind::DistrictRing);
        }
        ring_plot(&mut cols[1], "district_ring", &ring);
    });

    ui.add_space(12.0);
    ui.separator();
    ui.heading("💰 成交總價區間分析");
    match (chart::price_bars(analysis), chart::price_ring(analysis)) {
        (Some(bars), Some(ring)) => {
            ui.columns(2, |cols: &mut [Ui]| {
                if chart_header(&mut cols[0], ChartKind::PriceBar, titles) {
                    download = Some(ChartKind::PriceBar);
                }
                bar_plot(&mut cols[0], "price_bar", &bars, &flare(bars.len()));

                if chart_header(&mut cols[1], ChartKind::PriceRing, titles) {
                    download = Some(ChartKind::PriceRing);
                }
                ring_plot(&mut cols[1], "price_ring", &ring);
            });
        }
        _ => {
            ui.label("找不到「總價元」欄位，略過價格分析。");
        }
    }

    download
}

/// Title editor, rendered title and download button. True when the
/// button was clicked.
fn chart_header(ui: &mut Ui, kind: ChartKind, titles: &mut HashMap<ChartKind, String>) -> bool {
    let title = titles.entry(kind).or_default();
    ui.horizontal(|ui: &mut Ui| {
        ui.label(kind.title_prompt());
        ui.text_edit_singleline(title);
    });
    ui.label(RichText::new(title.as_str()).strong().size(16.0));
    ui.button("📥 下載此圖").clicked()
}

// ---------------------------------------------------------------------------
// Horizontal bar chart
// ---------------------------------------------------------------------------

/// Plot row of the bar at `rank`; rank 0 is drawn at the top.
fn row_y(n: usize, rank: usize) -> f64 {
    (n - 1 - rank) as f64
}

/// Category label for an axis mark, empty between rows.
fn row_label(labels: &[String], value: f64) -> String {
    let rounded = value.round();
    if (value - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    let row = rounded as usize;
    labels
        .len()
        .checked_sub(row + 1)
        .and_then(|rank| labels.get(rank).cloned())
        .unwrap_or_default()
}

fn bar_plot(ui: &mut Ui, id: &str, items: &[BarItem], colors: &[Color32]) {
    let n = items.len();
    if n == 0 {
        ui.label("沒有資料。");
        return;
    }
    let max = items.iter().map(|i| i.count).max().unwrap_or(0).max(1) as f64;
    let labels: Vec<String> = items.iter().map(|i| i.label.clone()).collect();

    let bars: Vec<Bar> = items
        .iter()
        .enumerate()
        .map(|(rank, item)| {
            Bar::new(row_y(n, rank), item.count as f64)
                .width(0.7)
                .name(&item.label)
                .fill(colors.get(rank).copied().unwrap_or(Color32::GRAY))
        })
        .collect();

    Plot::new(id)
        .height(BAR_PLOT_HEIGHT)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show_grid([true, false])
        .include_x(0.0)
        // Room to the right of the longest bar for its annotation.
        .include_x(max * 1.35)
        .include_y(-0.5)
        .include_y(n as f64 - 0.5)
        .y_grid_spacer(egui_plot::uniform_grid_spacer(|_| [1.0, 5.0, 10.0]))
        .y_axis_formatter(move |mark: GridMark, _range| row_label(&labels, mark.value))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal());
            for (rank, item) in items.iter().enumerate() {
                plot_ui.text(
                    Text::new(
                        PlotPoint::new(item.count as f64 + max * 0.02, row_y(n, rank)),
                        item.annotation(),
                    )
                    .anchor(Align2::LEFT_CENTER),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Ring chart
// ---------------------------------------------------------------------------

fn ring_plot(ui: &mut Ui, id: &str, ring: &RingData) {
    let colors = generate_palette(ring.slices.len());
    let wedges = ring.wedges();

    Plot::new(id)
        .height(RING_PLOT_HEIGHT)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .include_x(-1.7)
        .include_x(1.7)
        .include_y(-1.3)
        .include_y(1.3)
        .show(ui, |plot_ui| {
            for wedge in &wedges {
                let color = colors[wedge.index];
                for quad in wedge.quads(RING_HOLE, 1.0) {
                    let pts: PlotPoints = quad.iter().map(|&(x, y)| [x, y]).collect();
                    plot_ui.polygon(
                        Polygon::new(pts)
                            .fill_color(color)
                            .stroke(Stroke::new(0.5, color)),
                    );
                }
                let mut outline: Vec<[f64; 2]> = wedge
                    .outline(RING_HOLE, 1.0)
                    .into_iter()
                    .map(|(x, y)| [x, y])
                    .collect();
                if let Some(&first) = outline.first() {
                    outline.push(first);
                }
                plot_ui.line(Line::new(PlotPoints::from(outline)).color(Color32::WHITE).width(1.5));

                let mid = wedge.mid();
                let (label, _) = &ring.slices[wedge.index];
                let anchor = if mid.cos() >= 0.0 {
                    Align2::LEFT_CENTER
                } else {
                    Align2::RIGHT_CENTER
                };
                plot_ui.text(
                    Text::new(PlotPoint::new(1.08 * mid.cos(), 1.08 * mid.sin()), label.as_str())
                        .anchor(anchor),
                );
                let r = (1.0 + RING_HOLE) / 2.0;
                plot_ui.text(Text::new(
                    PlotPoint::new(r * mid.cos(), r * mid.sin()),
                    RichText::new(ring.share_label(wedge)).size(11.0),
                ));
            }
            plot_ui.text(Text::new(
                PlotPoint::new(0.0, 0.0),
                RichText::new(&ring.center_caption).strong().size(15.0),
            ));
        });
}
