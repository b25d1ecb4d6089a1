//! Writes a synthetic registry CSV for demos.
//!
//! Usage: `generate_sample [output.csv] [rows] [seed]`

use anyhow::{Context, Result};

/// Tainan districts with relative transaction weights and a typical
/// price level (NT$ 萬).
const DISTRICTS: &[(&str, u32, f64)] = &[
    ("東區", 18, 1450.0),
    ("永康區", 22, 1250.0),
    ("安南區", 16, 980.0),
    ("北區", 10, 1150.0),
    ("中西區", 7, 1300.0),
    ("南區", 8, 950.0),
    ("安平區", 9, 1800.0),
    ("仁德區", 6, 1050.0),
    ("歸仁區", 5, 1100.0),
    ("善化區", 5, 1200.0),
    ("新市區", 3, 1150.0),
    ("新營區", 3, 650.0),
    ("佳里區", 2, 700.0),
    ("麻豆區", 2, 680.0),
];

const STREETS: &[&str] = &["中華路", "民族路", "中正路", "永華路", "大同路", "崇學路", "安和路"];
const KINDS: &[&str] = &["房地(土地+建物)", "房地(土地+建物)+車位", "土地", "建物"];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n.max(1)
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn weighted<'a>(&mut self, table: &'a [(&'a str, u32, f64)]) -> &'a (&'a str, u32, f64) {
        let total: u32 = table.iter().map(|(_, w, _)| w).sum();
        let mut pick = (self.next_f64() * total as f64) as u32;
        for entry in table {
            if pick < entry.1 {
                return entry;
            }
            pick -= entry.1;
        }
        &table[table.len() - 1]
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let output_path = args.next().unwrap_or_else(|| "sample_registry.csv".to_string());
    let rows: usize = match args.next() {
        Some(n) => n.parse().context("row count must be a number")?,
        None => 500,
    };
    let seed: u64 = match args.next() {
        Some(s) => s.parse().context("seed must be a number")?,
        None => 42,
    };

    let mut rng = SimpleRng::new(seed);
    let mut writer = csv::Writer::from_path(&output_path)
        .with_context(|| format!("creating {output_path}"))?;
    writer.write_record([
        "鄉鎮市區",
        "交易標的",
        "土地位置建物門牌",
        "交易年月日",
        "總價元",
        "建物移轉總面積平方公尺",
    ])?;

    for _ in 0..rows {
        let (district, _, level) = *rng.weighted(DISTRICTS);
        let kind = KINDS[rng.below(KINDS.len())];
        let address = format!(
            "臺南市{district}{}{}號{}樓",
            STREETS[rng.below(STREETS.len())],
            1 + rng.below(400),
            1 + rng.below(15)
        );
        let date = format!("114{:02}{:02}", 1 + rng.below(12), 1 + rng.below(28));
        // Log-normal around the district's level, in NT$.
        let price = (rng.gauss(level.ln(), 0.45).exp() * 10_000.0).round().max(100_000.0);
        // A few rows carry the blank or malformed prices real exports have.
        let price_cell = match rng.below(50) {
            0 => String::new(),
            1 => "洽談中".to_string(),
            _ => format!("{price:.0}"),
        };
        let area = rng.gauss(95.0, 30.0).max(15.0);

        writer.write_record([
            district.to_string(),
            kind.to_string(),
            address,
            date,
            price_cell,
            format!("{area:.2}"),
        ])?;
    }
    writer.flush().context("flushing CSV")?;

    log::info!("Wrote {rows} rows to {output_path}");
    println!("Wrote {rows} synthetic registry rows to {output_path}");
    Ok(())
}
