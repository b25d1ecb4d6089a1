use geo::{Simplify, TriangulateEarcut};

use super::MapLayer;
use super::tiles::mercator_y;

/// Degrees; drops vertices closer than ~50 m to the simplified outline.
pub const SIMPLIFY_TOLERANCE: f64 = 0.0005;

/// One town ready for the on-screen map, in plot coordinates
/// (x = longitude, y = Mercator degrees).
#[derive(Debug, Clone)]
pub struct TownShape {
    /// Fill as triangles, since the plot only fills convex polygons.
    pub triangles: Vec<[[f64; 2]; 3]>,
    /// Exterior rings for the outline.
    pub rings: Vec<Vec<[f64; 2]>>,
    pub label_at: [f64; 2],
}

fn project(x: f64, y: f64) -> [f64; 2] {
    [x, mercator_y(y)]
}

/// Simplify, triangulate and project every feature, in feature order.
pub fn project_layer(layer: &MapLayer, tolerance: f64) -> Vec<TownShape> {
    layer
        .features
        .iter()
        .map(|f| {
            let shape = f.shape.simplify(&tolerance);
            let triangles = shape
                .iter()
                .flat_map(|poly| poly.earcut_triangles())
                .map(|t| {
                    let [a, b, c] = [t.v1(), t.v2(), t.v3()];
                    [project(a.x, a.y), project(b.x, b.y), project(c.x, c.y)]
                })
                .collect();
            let rings = shape
                .iter()
                .map(|poly| poly.exterior().coords().map(|c| project(c.x, c.y)).collect())
                .collect();
            TownShape {
                triangles,
                rings,
                label_at: project(f.centroid.0, f.centroid.1),
            }
        })
        .collect()
}
