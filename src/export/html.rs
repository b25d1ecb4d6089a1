use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};

use crate::analysis::MapView;
use crate::color::ChoroplethScale;
use crate::map::tiles::{MAX_ZOOM, TileProvider};

const FILL_OPACITY: f64 = 0.4;
const LINE_OPACITY: f64 = 0.2;

/// Standalone Leaflet page: basemap, choropleth and one label per town.
pub fn render_map_html(map: &MapView, provider: TileProvider) -> String {
    let data = feature_collection(map).to_string().replace("</", "<\\/");
    let (lat, lon) = map.layer.center;

    format!(
        r#"<!DOCTYPE html>
<html lang="zh-Hant">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{city} 行政區成交地理分佈</title>
    <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.css" crossorigin="anonymous">
    <script src="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.js" crossorigin="anonymous"></script>
    <style>{css}</style>
</head>
<body>
    <div id="map"></div>
    <script>
    const towns = {data};
    const map = L.map('map', {{ preferCanvas: true }}).setView([{lat}, {lon}], {zoom});
    L.tileLayer('{tiles}', {{ attribution: '{attribution}' }}).addTo(map);
    L.geoJSON(towns, {{
        style: f => ({{
            fillColor: f.properties.fill,
            fillOpacity: f.properties.count > 0 ? {fill_opacity} : 0,
            color: '#000',
            opacity: {line_opacity},
            weight: 1
        }})
    }}).addTo(map);
    for (const f of towns.features) {{
        const [lat, lon] = f.properties.centroid;
        L.marker([lat, lon], {{
            icon: L.divIcon({{ className: 'town-label', iconSize: [120, 40], iconAnchor: [60, 20], html: f.properties.label }})
        }}).addTo(map);
    }}
    </script>
</body>
</html>
"#,
        city = escape(&map.layer.city),
        css = CSS,
        data = data,
        lat = lat,
        lon = lon,
        zoom = MAX_ZOOM,
        tiles = provider.template(),
        attribution = provider.attribution(),
        fill_opacity = FILL_OPACITY,
        line_opacity = LINE_OPACITY,
    )
}

const CSS: &str = "html, body, #map { height: 100%; margin: 0; }
    .town-label { font-family: 'Noto Sans TC', 'Microsoft JhengHei', sans-serif; text-align: center;
        color: black; text-shadow: 1px 1px 2px white; }
    .town-label .name { font-size: 1.1vw; font-weight: 900; }
    .town-label .stat { font-size: 0.9vw; font-weight: bold; }";

fn feature_collection(map: &MapView) -> FeatureCollection {
    let max = map.stats.iter().map(|s| s.count).max().unwrap_or(0);
    let scale = ChoroplethScale::new(max, 1.0);

    let features = map
        .layer
        .features
        .iter()
        .zip(&map.stats)
        .map(|(f, stat)| {
            let mut props = JsonObject::new();
            props.insert("county".into(), JsonValue::from(f.county.clone()));
            props.insert("TOWNNAME".into(), JsonValue::from(f.town_raw.clone()));
            props.insert("town".into(), JsonValue::from(f.town.clone()));
            props.insert("count".into(), JsonValue::from(stat.count));
            props.insert("percent".into(), JsonValue::from(stat.percent));
            props.insert("fill".into(), JsonValue::from(scale.hex(stat.count)));
            props.insert(
                "centroid".into(),
                JsonValue::from(vec![f.centroid.1, f.centroid.0]),
            );
            props.insert(
                "label".into(),
                JsonValue::from(format!(
                    r#"<div class="name">{}</div><div class="stat">{}筆 ({:.1}%)</div>"#,
                    escape(&f.town),
                    stat.count,
                    stat.percent
                )),
            );
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(&f.shape))),
                id: None,
                properties: Some(props),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::DistrictCounts;
    use crate::data::city::{CityMatch, CityOrigin};
    use crate::map::load_layer;
    use std::sync::Arc;

    fn sample_view() -> MapView {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("towns.json");
        std::fs::write(&path, crate::map::tests::sample_geojson()).unwrap();
        let city = CityMatch::new("臺南市", CityOrigin::Detected);
        let layer = Arc::new(load_layer(&path, &city).unwrap().unwrap());
        let counts = DistrictCounts::from_labels(&["東區", "東區", "北區", "安南區"]);
        MapView {
            stats: layer.join(&counts),
            layer,
        }
    }

    #[test]
    fn page_embeds_towns_and_tiles() {
        let html = render_map_html(&sample_view(), TileProvider::Nlsc);
        assert!(html.contains("wmts.nlsc.gov.tw"));
        assert!(html.contains("東區"));
        assert!(html.contains("2筆 (50.0%)"));
        assert!(!html.contains("0筆"));
        assert!(html.contains("setView([23."));
        assert!(html.contains("<title>臺南市 行政區成交地理分佈</title>"));
        // The file's own town names survive next to the cleaned ones.
        assert!(html.contains(r#""TOWNNAME":"台南市北區""#));
    }

    #[test]
    fn zero_count_towns_get_zero_label() {
        let mut view = sample_view();
        view.stats[1].count = 0;
        view.stats[1].percent = 0.0;
        let html = render_map_html(&view, TileProvider::CartoLight);
        assert!(html.contains("0筆 (0.0%)"));
        assert!(html.contains("basemaps.cartocdn.com"));
    }

    #[test]
    fn markup_is_escaped() {
        assert_eq!(escape("<b>&\""), "&lt;b&gt;&amp;&quot;");
    }
}
