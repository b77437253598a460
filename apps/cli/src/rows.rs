//! Reading import files into raw rows.
//!
//! `.csv` files need a header row; blank lines are skipped. `.json` files
//! hold an array of flat objects.

use std::io::Read;
use std::path::Path;

use navigator_core::RawRow;
use navigator_shared::{NavigatorError, Result};

/// Import file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum RowFormat {
    Csv,
    Json,
}

impl RowFormat {
    /// Guess from the file extension.
    pub(crate) fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            _ => Err(NavigatorError::validation(format!(
                "cannot tell the format of {} (expected .csv or .json; use --format)",
                path.display()
            ))),
        }
    }
}

/// Read every row from `path`.
pub(crate) fn read_rows(path: &Path, format: Option<RowFormat>) -> Result<Vec<RawRow>> {
    let format = match format {
        Some(f) => f,
        None => RowFormat::from_path(path)?,
    };
    let file = std::fs::File::open(path).map_err(|e| NavigatorError::io(path, e))?;
    match format {
        RowFormat::Csv => parse_csv(file),
        RowFormat::Json => {
            let mut text = String::new();
            std::io::BufReader::new(file)
                .read_to_string(&mut text)
                .map_err(|e| NavigatorError::io(path, e))?;
            parse_json(&text)
        }
    }
}

pub(crate) fn parse_csv<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| NavigatorError::parse(format!("unreadable CSV header: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record
            .map_err(|e| NavigatorError::parse(format!("CSV record {}: {e}", i + 1)))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

pub(crate) fn parse_json(text: &str) -> Result<Vec<RawRow>> {
    let items: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(text)
        .map_err(|e| NavigatorError::parse(format!("expected a JSON array of objects: {e}")))?;

    items
        .into_iter()
        .enumerate()
        .map(|(i, object)| {
            let mut row = RawRow::new();
            for (key, value) in object {
                let text = match value {
                    serde_json::Value::Null => continue,
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(b) => b.to_string(),
                    _ => {
                        return Err(NavigatorError::parse(format!(
                            "row {}: field '{key}' must be a string",
                            i + 1
                        )));
                    }
                };
                row.insert(key, text);
            }
            Ok(row)
        })
        .collect()
}
