use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Colour palette generators
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.65, 0.62);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

// Anchor stops of the sequential ramps, low → high.
const VIRIDIS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];
const FLARE: [(u8, u8, u8); 4] = [(236, 176, 136), (228, 113, 90), (196, 63, 92), (125, 35, 93)];
const YL_OR_RD: [(u8, u8, u8); 5] = [
    (255, 255, 204),
    (254, 217, 118),
    (253, 141, 60),
    (227, 26, 28),
    (128, 0, 38),
];

/// Sample a multi-stop ramp at `t ∈ [0, 1]`, interpolating in linear RGB.
fn ramp(stops: &[(u8, u8, u8)], t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let scaled = t * (stops.len() - 1) as f32;
    let i = (scaled.floor() as usize).min(stops.len() - 2);
    let local = scaled - i as f32;

    let lin = |(r, g, b): (u8, u8, u8)| -> LinSrgb {
        Srgb::new(r, g, b).into_format::<f32>().into_linear()
    };
    let mixed = lin(stops[i]).mix(lin(stops[i + 1]), local);
    to_color32(Srgb::from_linear(mixed))
}

fn spread(stops: &[(u8, u8, u8)], n: usize) -> Vec<Color32> {
    match n {
        0 => Vec::new(),
        1 => vec![ramp(stops, 0.5)],
        _ => (0..n).map(|i| ramp(stops, i as f32 / (n - 1) as f32)).collect(),
    }
}

/// Dark purple → yellow, for the district ranking bars.
pub fn viridis(n: usize) -> Vec<Color32> {
    spread(&VIRIDIS, n)
}

/// Light orange → plum, for the price band bars.
pub fn flare(n: usize) -> Vec<Color32> {
    spread(&FLARE, n)
}

fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

// ---------------------------------------------------------------------------
// Choropleth scale: count → Color32
// ---------------------------------------------------------------------------

/// Yellow-orange-red scale over `0..=max` transaction counts.
#[derive(Debug, Clone, Copy)]
pub struct ChoroplethScale {
    max: usize,
    opacity: f32,
}

impl ChoroplethScale {
    pub fn new(max: usize, opacity: f32) -> Self {
        ChoroplethScale { max, opacity }
    }

    /// Opaque colour for a count.
    pub fn solid(&self, count: usize) -> Color32 {
        if self.max == 0 {
            return ramp(&YL_OR_RD, 0.0);
        }
        ramp(&YL_OR_RD, count as f32 / self.max as f32)
    }

    /// Fill colour for a count, with the scale's opacity. Zero counts are
    /// left unfilled.
    pub fn fill(&self, count: usize) -> Color32 {
        if count == 0 {
            return Color32::TRANSPARENT;
        }
        let c = self.solid(count);
        Color32::from_rgba_unmultiplied(c.r(), c.g(), c.b(), (self.opacity * 255.0) as u8)
    }

    /// Hex form for HTML output.
    pub fn hex(&self, count: usize) -> String {
        let c = self.solid(count);
        format!("#{:02x}{:02x}{:02x}", c.r(), c.g(), c.b())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palettes_have_requested_length() {
        assert_eq!(generate_palette(11).len(), 11);
        assert_eq!(viridis(10).len(), 10);
        assert_eq!(flare(5).len(), 5);
        assert!(viridis(0).is_empty());
    }

    #[test]
    fn ramp_hits_its_end_stops() {
        let v = viridis(2);
        assert_eq!(v[0], Color32::from_rgb(68, 1, 84));
        assert_eq!(v[1], Color32::from_rgb(253, 231, 37));
    }

    #[test]
    fn choropleth_leaves_zero_unfilled() {
        let scale = ChoroplethScale::new(10, 0.4);
        assert_eq!(scale.fill(0), Color32::TRANSPARENT);
        assert_eq!(scale.hex(10), "#800026");
        assert_eq!(scale.fill(10).a(), 102);
    }
}
