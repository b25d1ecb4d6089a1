use std::io::Cursor;

use eframe::egui::Color32;
use image::{DynamicImage, ImageFormat, RgbImage};
use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::chart::{BarItem, RING_HOLE, RingData};
use crate::color::generate_palette;
use crate::config::RenderConfig;
use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Off-screen chart rendering (plotters → RGB buffer → PNG)
// ---------------------------------------------------------------------------

fn draw_err<E: std::fmt::Display>(e: E) -> AnalysisError {
    AnalysisError::Draw(e.to_string())
}

fn rgb(c: Color32) -> RGBColor {
    RGBColor(c.r(), c.g(), c.b())
}

/// Emoji are dropped: no bundled font carries them.
fn printable(text: &str) -> String {
    text.chars().filter(|c| !is_emoji(*c)).collect::<String>().trim().to_string()
}

fn is_emoji(c: char) -> bool {
    matches!(c as u32, 0x1F000..=0x1FAFF | 0x2600..=0x27BF | 0xFE0F)
}

/// Render a horizontal bar chart, first item at the top, each bar annotated
/// with its count and percentage.
pub fn bar_chart_png(
    title: &str,
    items: &[BarItem],
    colors: &[Color32],
    config: &RenderConfig,
) -> Result<Vec<u8>, AnalysisError> {
    let (w, h) = config.pixels(config.bar_size);
    let family = config.font_family.as_str();
    let n = items.len().max(1);
    let max = items.iter().map(|i| i.count).max().unwrap_or(0).max(1) as f64;
    let labels: Vec<String> = items.iter().map(|i| printable(&i.label)).collect();

    let mut buf = vec![255u8; (w * h * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (w, h)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(printable(title), (family, config.pt(16.0)))
            .margin(config.pt(12.0) as u32)
            .x_label_area_size(config.pt(24.0) as u32)
            .y_label_area_size(config.pt(80.0) as u32)
            // Room to the right of the longest bar for its annotation.
            .build_cartesian_2d(0f64..max * 1.3, (0..n as i32).into_segmented())
            .map_err(draw_err)?;

        let row_label = |v: &SegmentValue<i32>| match v {
            SegmentValue::CenterOf(y) => (n as i32 - 1 - *y)
                .try_into()
                .ok()
                .and_then(|rank: usize| labels.get(rank).cloned())
                .unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(n)
            .y_label_formatter(&row_label)
            .x_label_formatter(&|v: &f64| format!("{v:.0}"))
            .label_style((family, config.pt(11.0)))
            .draw()
            .map_err(draw_err)?;

        let bar_margin = (h as f64 / n as f64 * 0.12) as u32;
        chart
            .draw_series(items.iter().enumerate().map(|(rank, item)| {
                let y = (n - 1 - rank) as i32;
                let color = colors.get(rank).copied().unwrap_or(Color32::GRAY);
                let mut bar = Rectangle::new(
                    [
                        (0.0, SegmentValue::Exact(y)),
                        (item.count as f64, SegmentValue::Exact(y + 1)),
                    ],
                    rgb(color).filled(),
                );
                bar.set_margin(bar_margin, bar_margin, 0, 0);
                bar
            }))
            .map_err(draw_err)?;

        let note_style = TextStyle::from((family, config.pt(11.0)).into_font())
            .pos(Pos::new(HPos::Left, VPos::Center));
        chart
            .draw_series(items.iter().enumerate().map(|(rank, item)| {
                let y = (n - 1 - rank) as i32;
                Text::new(
                    item.annotation(),
                    (item.count as f64 + max * 0.015, SegmentValue::CenterOf(y)),
                    note_style.clone(),
                )
            }))
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
    }

    finish(buf, (w, h), config)
}

/// Render a ring chart with slice labels, percentages and a center caption.
pub fn ring_chart_png(
    title: &str,
    ring: &RingData,
    config: &RenderConfig,
) -> Result<Vec<u8>, AnalysisError> {
    let (w, h) = config.pixels(config.ring_size);
    let family = config.font_family.as_str();
    let colors = generate_palette(ring.slices.len());

    let mut buf = vec![255u8; (w * h * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (w, h)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let title_h = config.pt(40.0) as i32;
        let title_style = TextStyle::from((family, config.pt(16.0)).into_font())
            .pos(Pos::new(HPos::Center, VPos::Top));
        root.draw(&Text::new(printable(title), (w as i32 / 2, config.pt(8.0) as i32), title_style))
            .map_err(draw_err)?;

        let cx = w as f64 / 2.0;
        let cy = (h as f64 + title_h as f64) / 2.0;
        let outer = (w.min(h) as f64 - title_h as f64) * 0.36;
        let inner = outer * RING_HOLE;
        // Math orientation (y up) → pixel orientation (y down).
        let to_px = |(x, y): (f64, f64)| ((cx + x).round() as i32, (cy - y).round() as i32);

        for wedge in ring.wedges() {
            let color = rgb(colors[wedge.index]);
            let pts: Vec<(i32, i32)> = wedge.outline(inner, outer).into_iter().map(to_px).collect();
            root.draw(&Polygon::new(pts.clone(), color.filled()))
                .map_err(draw_err)?;
            root.draw(&PathElement::new(pts, WHITE.stroke_width(config.pt(1.0) as u32)))
                .map_err(draw_err)?;

            let mid = wedge.mid();
            let (label, _) = &ring.slices[wedge.index];
            let label_pos = to_px((outer * 1.12 * mid.cos(), outer * 1.12 * mid.sin()));
            let hpos = if mid.cos() >= 0.0 { HPos::Left } else { HPos::Right };
            let label_style = TextStyle::from((family, config.pt(11.0)).into_font())
                .pos(Pos::new(hpos, VPos::Center));
            root.draw(&Text::new(printable(label), label_pos, label_style))
                .map_err(draw_err)?;

            let pct_r = (inner + outer) / 2.0;
            let pct_style = TextStyle::from((family, config.pt(10.0)).into_font())
                .pos(Pos::new(HPos::Center, VPos::Center));
            root.draw(&Text::new(
                ring.share_label(&wedge),
                to_px((pct_r * mid.cos(), pct_r * mid.sin())),
                pct_style,
            ))
            .map_err(draw_err)?;
        }

        let caption_style = TextStyle::from((family, config.pt(15.0)).into_font())
            .pos(Pos::new(HPos::Center, VPos::Center));
        let line_h = config.pt(20.0);
        let lines: Vec<&str> = ring.center_caption.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            let dy = (i as f64 - (lines.len() as f64 - 1.0) / 2.0) * line_h;
            root.draw(&Text::new(
                printable(line),
                (cx.round() as i32, (cy + dy).round() as i32),
                caption_style.clone(),
            ))
            .map_err(draw_err)?;
        }

        root.present().map_err(draw_err)?;
    }

    finish(buf, (w, h), config)
}

fn finish(buf: Vec<u8>, (w, h): (u32, u32), config: &RenderConfig) -> Result<Vec<u8>, AnalysisError> {
    let img = RgbImage::from_raw(w, h, buf)
        .ok_or_else(|| AnalysisError::Draw("bitmap buffer size mismatch".into()))?;
    let pad = (config.pad_inches * config.dpi as f64).round() as u32;
    encode_png(tight_crop(&img, pad))
}

// ---------------------------------------------------------------------------
// Tight bounding box and encoding
// ---------------------------------------------------------------------------

/// Crop to the non-white content plus `pad` pixels on every side (clamped
/// to the image). A blank image is returned unchanged.
pub fn tight_crop(img: &RgbImage, pad: u32) -> RgbImage {
    let (mut x0, mut y0, mut x1, mut y1) = (u32::MAX, u32::MAX, 0u32, 0u32);
    for (x, y, px) in img.enumerate_pixels() {
        if px.0 != [255, 255, 255] {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
    }
    if x0 == u32::MAX {
        return img.clone();
    }
    let left = x0.saturating_sub(pad);
    let top = y0.saturating_sub(pad);
    let right = (x1 + pad).min(img.width() - 1);
    let bottom = (y1 + pad).min(img.height() - 1);
    image::imageops::crop_imm(img, left, top, right - left + 1, bottom - top + 1).to_image()
}

pub fn encode_png(img: RgbImage) -> Result<Vec<u8>, AnalysisError> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
