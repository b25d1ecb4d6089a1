use eframe::egui::{self, Align2, Color32, RichText, Stroke, TextureOptions, Ui, Vec2};
use egui_plot::{Line, Plot, PlotImage, PlotPoint, PlotPoints, Polygon, Text};

use crate::color::ChoroplethScale;
use crate::map::tiles::{TileProvider, mercator_y};
use crate::state::Session;

const MAP_HEIGHT: f32 = 600.0;
const FILL_OPACITY: f32 = 0.4;

/// Choropleth over the basemap. Returns true when "export map" was clicked.
pub fn map_section(ui: &mut Ui, session: &mut Session, provider: TileProvider) -> bool {
    let Session {
        analysis,
        map_shapes,
        basemap,
        textures,
        ..
    } = session;
    let Some(analysis) = analysis.as_ref() else {
        return false;
    };

    ui.heading(format!("🗺️ {} 行政區成交地理分佈", analysis.city.name()));
    let Some(map) = &analysis.map else {
        ui.label("找不到此縣市的行政區邊界資料，略過地圖。");
        return false;
    };

    let export = ui.button("📥 匯出互動地圖 (HTML)").clicked();
    if basemap.is_empty() {
        ui.small("底圖無法載入，僅顯示行政區。");
    }

    // Tile textures are uploaded once per session.
    for (key, image) in basemap.iter() {
        textures.entry(*key).or_insert_with(|| {
            ui.ctx().load_texture(
                format!("tile-{}-{}-{}", key.z, key.x, key.y),
                egui::ColorImage::clone(image),
                TextureOptions::LINEAR,
            )
        });
    }

    let max = map.stats.iter().map(|s| s.count).max().unwrap_or(0);
    let scale = ChoroplethScale::new(max, FILL_OPACITY);
    let (min_lon, min_lat, max_lon, max_lat) = map.layer.bounds;

    Plot::new("district_map")
        .height(MAP_HEIGHT)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .show_x(false)
        .show_y(false)
        .include_x(min_lon)
        .include_x(max_lon)
        .include_y(mercator_y(min_lat))
        .include_y(mercator_y(max_lat))
        .show(ui, |plot_ui| {
            for (key, _) in basemap.iter() {
                let Some(texture) = textures.get(key) else {
                    continue;
                };
                let (west, east) = key.lon_range();
                let (north, south) = key.merc_range();
                plot_ui.image(PlotImage::new(
                    texture.id(),
                    PlotPoint::new((west + east) / 2.0, (north + south) / 2.0),
                    Vec2::new((east - west) as f32, (north - south) as f32),
                ));
            }

            for (shape, stat) in map_shapes.iter().zip(&map.stats) {
                let fill = scale.fill(stat.count);
                if fill != Color32::TRANSPARENT {
                    for tri in &shape.triangles {
                        plot_ui.polygon(
                            Polygon::new(PlotPoints::from(tri.to_vec()))
                                .fill_color(fill)
                                .stroke(Stroke::NONE),
                        );
                    }
                }
                for ring in &shape.rings {
                    plot_ui.line(
                        Line::new(PlotPoints::from(ring.clone()))
                            .color(Color32::from_black_alpha(80))
                            .width(1.0),
                    );
                }
            }

            for ((feature, shape), stat) in map.layer.features.iter().zip(map_shapes.iter()).zip(&map.stats) {
                let [x, y] = shape.label_at;
                plot_ui.text(
                    Text::new(
                        PlotPoint::new(x, y),
                        RichText::new(format!(
                            "{}\n{}筆 ({:.1}%)",
                            feature.town, stat.count, stat.percent
                        ))
                        .size(11.0)
                        .strong()
                        .color(Color32::BLACK),
                    )
                    .anchor(Align2::CENTER_CENTER),
                );
            }
        });

    ui.small(provider.attribution().replace("&copy;", "©"));
    export
}
