use super::columns::ColumnRoles;
use super::model::Dataset;

// ---------------------------------------------------------------------------
// Cities and the 臺/台 spelling pair
// ---------------------------------------------------------------------------

/// All 22 municipalities and counties, in detection priority order.
pub const CITIES: [&str; 22] = [
    "臺北市", "新北市", "桃園市", "臺中市", "臺南市", "高雄市", "基隆市", "新竹市", "嘉義市",
    "新竹縣", "苗栗縣", "彰化縣", "南投縣", "雲林縣", "嘉義縣", "屏東縣", "宜蘭縣", "花蓮縣",
    "臺東縣", "澎湖縣", "金門縣", "連江縣",
];

/// Spelling used for city names in the list above.
const FORMAL_TAI: char = '臺';
/// Everyday spelling, used interchangeably in registry exports.
const COMMON_TAI: char = '台';

/// How the active city was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CityOrigin {
    Detected,
    /// Nothing in the file named a city; the configured default was used.
    Fallback,
}

/// The single active city of a dataset, in both spellings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityMatch {
    canonical: String,
    alternate: String,
    pub origin: CityOrigin,
}

impl CityMatch {
    pub fn new(name: &str, origin: CityOrigin) -> Self {
        CityMatch {
            canonical: name.replace(COMMON_TAI, &FORMAL_TAI.to_string()),
            alternate: name.replace(FORMAL_TAI, &COMMON_TAI.to_string()),
            origin,
        }
    }

    /// The 臺 spelling, used for display and as a cache key.
    pub fn name(&self) -> &str {
        &self.canonical
    }

    /// The 台 spelling (identical to `name()` when the city has no 臺).
    pub fn alternate(&self) -> &str {
        &self.alternate
    }

    /// Both spellings, canonical first.
    pub fn spellings(&self) -> [&str; 2] {
        [&self.canonical, &self.alternate]
    }

    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        name == self.canonical || name == self.alternate
    }
}

// ---------------------------------------------------------------------------
// Detection: an ordered rule list, first hit wins
// ---------------------------------------------------------------------------

type Predicate = Box<dyn Fn(&str) -> bool>;

/// Priority-ordered `(predicate, city)` rules with a fallback result.
pub struct CityDetector {
    rules: Vec<(Predicate, &'static str)>,
    fallback: String,
}

impl CityDetector {
    pub fn new(fallback: &str) -> Self {
        let rules = CITIES
            .iter()
            .map(|&city| {
                let spellings = CityMatch::new(city, CityOrigin::Detected);
                let predicate: Predicate = Box::new(move |text: &str| {
                    spellings.spellings().iter().any(|s| text.contains(s))
                });
                (predicate, city)
            })
            .collect();
        CityDetector {
            rules,
            fallback: fallback.to_string(),
        }
    }

    /// Evaluate the rules in order against `text`.
    pub fn detect_in(&self, text: &str) -> CityMatch {
        self.rules
            .iter()
            .find(|(predicate, _)| predicate(text))
            .map(|(_, city)| CityMatch::new(city, CityOrigin::Detected))
            .unwrap_or_else(|| CityMatch::new(&self.fallback, CityOrigin::Fallback))
    }

    /// Detect the city of a loaded dataset from its address and district
    /// prefixes plus the file name.
    pub fn detect(
        &self,
        dataset: &Dataset,
        roles: &ColumnRoles,
        address_sample: usize,
        district_sample: usize,
    ) -> CityMatch {
        let mut text = String::new();
        if let Some(col) = roles.address {
            push_prefix(&mut text, dataset, col, address_sample);
        }
        if let Some(col) = roles.district {
            push_prefix(&mut text, dataset, col, district_sample);
        }
        text.push_str(&dataset.file_name);

        let city = self.detect_in(&text);
        match city.origin {
            CityOrigin::Detected => log::info!("Detected city {}", city.name()),
            CityOrigin::Fallback => {
                log::warn!("No city name found in data; assuming {}", city.name())
            }
        }
        city
    }
}

/// Append the first `limit` non-empty cells of a column.
fn push_prefix(text: &mut String, dataset: &Dataset, col: usize, limit: usize) {
    for cell in dataset.column(col).filter(|c| !c.is_empty()).take(limit) {
        text.push_str(&cell.to_string());
    }
}

// ---------------------------------------------------------------------------
// District normalization
// ---------------------------------------------------------------------------

/// Remove the city name (either spelling) from the start of a district
/// label. Repeated prefixes are all removed so the result is a fixed point.
pub fn strip_city_prefix(raw: &str, city: &CityMatch) -> String {
    let mut rest = raw.trim();
    while let Some(stripped) = city
        .spellings()
        .iter()
        .find_map(|s| rest.strip_prefix(s))
    {
        rest = stripped.trim();
    }
    rest.to_string()
}
