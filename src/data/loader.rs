use std::borrow::Cow;
use std::path::Path;

use anyhow::{Context, Result, bail};
use calamine::{Data, Reader, open_workbook_auto};

use super::model::{CellValue, Dataset};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a registry export.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` – header row, then one transaction per line (UTF-8 or Big5)
/// * anything else – spreadsheet (`.xls`, `.xlsx`, `.xlsm`, `.xlsb`, `.ods`);
///   first sheet, physical row 1 (the English machine header) skipped
pub fn load_file(path: &Path) -> Result<Dataset> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    if file_name.to_ascii_lowercase().ends_with(".csv") {
        let bytes = std::fs::read(path).context("reading CSV file")?;
        parse_csv(&bytes, &file_name)
    } else {
        load_spreadsheet(path, &file_name)
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Parse CSV bytes. The first record is the header; rows may be ragged.
pub fn parse_csv(bytes: &[u8], file_name: &str) -> Result<Dataset> {
    let text = decode_text(bytes)?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        bail!("CSV file has no header row");
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(CellValue::from_text).collect());
    }

    Ok(Dataset::new(file_name, headers, rows))
}

/// Registry CSVs are UTF-8 (often with a BOM); older exports are Big5.
fn decode_text(bytes: &[u8]) -> Result<Cow<'_, str>> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(Cow::Borrowed(s.strip_prefix('\u{feff}').unwrap_or(s))),
        Err(_) => {
            let (decoded, _, had_errors) = encoding_rs::BIG5.decode(bytes);
            if had_errors {
                bail!("file is neither valid UTF-8 nor Big5 text");
            }
            log::info!("CSV is not UTF-8, decoded as Big5");
            Ok(decoded)
        }
    }
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

fn load_spreadsheet(path: &Path, file_name: &str) -> Result<Dataset> {
    let mut workbook = open_workbook_auto(path).context("opening spreadsheet")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("spreadsheet has no worksheets")?
        .context("reading first worksheet")?;

    let grid: Vec<Vec<CellValue>> = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    dataset_from_grid(grid, file_name)
}

/// Row 0 is the header; row 1 repeats it in English and is dropped.
fn dataset_from_grid(grid: Vec<Vec<CellValue>>, file_name: &str) -> Result<Dataset> {
    let mut physical_rows = grid.into_iter();
    let headers: Vec<String> = physical_rows
        .next()
        .context("spreadsheet has no header row")?
        .iter()
        .map(|c| c.to_string().trim().to_string())
        .collect();

    let rows: Vec<Vec<CellValue>> = physical_rows.skip(1).collect();
    Ok(Dataset::new(file_name, headers, rows))
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Empty => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}
