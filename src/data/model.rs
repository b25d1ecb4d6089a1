use std::fmt;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the registry table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring what CSV and spreadsheet readers yield.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Empty,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            // Spreadsheets store whole prices as floats; print them without ".0".
            CellValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{v:.0}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Empty => Ok(()),
        }
    }
}

impl CellValue {
    /// Guess the type of a raw text field.
    pub fn from_text(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return CellValue::Float(f);
            }
        }
        CellValue::Text(s.to_string())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Coerce the cell to a number. Text is accepted with thousands
    /// separators (`12,500,000`); anything else non-numeric is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            CellValue::Integer(i) => *i as f64,
            CellValue::Float(f) => *f,
            CellValue::Text(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
            CellValue::Empty => return None,
        };
        v.is_finite().then_some(v)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded registry
// ---------------------------------------------------------------------------

/// One loaded registry file. Rows are aligned with `headers`; the only
/// column ever added after loading is the derived clean-district label.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Name of the file the rows came from (used as a city hint).
    pub file_name: String,
    /// Original column headers, in file order.
    pub headers: Vec<String>,
    /// One entry per registry row, each `headers.len()` cells long.
    pub rows: Vec<Vec<CellValue>>,
    clean_districts: Option<Vec<String>>,
}

impl Dataset {
    /// Build a dataset, padding or truncating ragged rows to the header width.
    /// Truncated rows are logged.
    pub fn new(file_name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let file_name = file_name.into();
        let width = headers.len();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, mut row)| {
                let dropped = row.iter().skip(width).filter(|c| !c.is_empty()).count();
                if dropped > 0 {
                    log::warn!(
                        "{file_name}: row {} has {} cells for {width} columns, dropping {dropped} non-empty cells",
                        i + 1,
                        row.len()
                    );
                }
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Dataset {
            file_name,
            headers,
            rows,
            clean_districts: None,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over one column's cells in row order.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    /// Attach the derived clean-district column. Needs one label per row.
    pub fn set_clean_districts(&mut self, labels: Vec<String>) -> Result<(), usize> {
        if labels.len() != self.rows.len() {
            return Err(labels.len());
        }
        self.clean_districts = Some(labels);
        Ok(())
    }

    pub fn clean_districts(&self) -> Option<&[String]> {
        self.clean_districts.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_guesses_types() {
        assert_eq!(CellValue::from_text("42"), CellValue::Integer(42));
        assert_eq!(CellValue::from_text("4.5"), CellValue::Float(4.5));
        assert_eq!(CellValue::from_text("  "), CellValue::Empty);
        assert_eq!(CellValue::from_text("東區"), CellValue::Text("東區".into()));
        assert_eq!(CellValue::from_text("NaN"), CellValue::Text("NaN".into()));
    }

    #[test]
    fn as_f64_accepts_separators_and_rejects_text() {
        assert_eq!(CellValue::Text("12,500,000".into()).as_f64(), Some(12_500_000.0));
        assert_eq!(CellValue::Integer(7).as_f64(), Some(7.0));
        assert_eq!(CellValue::Text("面議".into()).as_f64(), None);
        assert_eq!(CellValue::Float(f64::NAN).as_f64(), None);
        assert_eq!(CellValue::Empty.as_f64(), None);
    }

    #[test]
    fn whole_floats_display_without_fraction() {
        assert_eq!(CellValue::Float(5_000_000.0).to_string(), "5000000");
        assert_eq!(CellValue::Float(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn ragged_rows_are_padded_to_header_width() {
        let ds = Dataset::new(
            "a.csv",
            vec!["x".into(), "y".into()],
            vec![vec![CellValue::Integer(1)]],
        );
        assert_eq!(ds.rows[0], vec![CellValue::Integer(1), CellValue::Empty]);
    }

    #[test]
    fn cells_beyond_the_header_are_dropped() {
        let ds = Dataset::new(
            "a.csv",
            vec!["x".into()],
            vec![
                vec![CellValue::Integer(1), CellValue::Text("extra".into())],
                vec![CellValue::Integer(2), CellValue::Empty],
            ],
        );
        assert_eq!(ds.rows, vec![vec![CellValue::Integer(1)], vec![CellValue::Integer(2)]]);
        assert_eq!(ds.column(0).count(), 2);
    }

    #[test]
    fn clean_districts_must_cover_every_row() {
        let mut ds = Dataset::new("a.csv", vec!["x".into()], vec![vec![CellValue::Empty]; 2]);
        assert_eq!(ds.set_clean_districts(vec!["東區".into()]), Err(1));
        assert!(ds.clean_districts().is_none());
        ds.set_clean_districts(vec!["東區".into(), "北區".into()]).unwrap();
        assert_eq!(ds.clean_districts().unwrap().len(), 2);
    }
}
