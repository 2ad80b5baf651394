//! CSV table reader.
//!
//! Reads delimited billing exports into a [`Table`] and one-column category
//! lists into ordered code lists.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tarmed_types::ProcedureCode;
use tracing::debug;

use crate::table::Table;
use crate::types::{PackagerError, PackagerResult};

/// Reads a delimited file with a header row into a table.
///
/// # Errors
/// Returns an error if the file cannot be opened or a row has a different
/// field count than the header.
pub fn read_table<P: AsRef<Path>>(path: P, delimiter: u8) -> PackagerResult<Table> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PackagerError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let file = File::open(path)?;
    let table = read_table_from_reader(BufReader::new(file), delimiter)?;
    debug!(
        "Read {} rows with {} columns from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

/// Reads a delimited table from a reader.
pub fn read_table_from_reader<R: Read>(reader: R, delimiter: u8) -> PackagerResult<Table> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let columns: Vec<String> = csv_reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            // Handle UTF-8 BOM at start of file
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while csv_reader.read_record(&mut record)? {
        // Skip empty records
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table::new(columns, rows))
}

/// Reads an ordered category list.
///
/// The file has no header; the first field of every non-empty line is a
/// category code. Order is preserved since it defines priority.
pub fn read_categories<P: AsRef<Path>>(path: P, delimiter: u8) -> PackagerResult<Vec<ProcedureCode>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PackagerError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let file = File::open(path)?;
    read_categories_from_reader(BufReader::new(file), delimiter)
}

/// Reads an ordered category list from a reader.
pub fn read_categories_from_reader<R: Read>(
    reader: R,
    delimiter: u8,
) -> PackagerResult<Vec<ProcedureCode>> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut categories = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let Some(first) = record.get(0) else {
            continue;
        };
        let first = first.trim_start_matches('\u{feff}').trim();
        if first.is_empty() {
            continue;
        }
        categories.push(ProcedureCode::normalize(first));
    }
    Ok(categories)
}

/// Helper functions for parsing field values.
pub mod parse {
    use chrono::{Days, NaiveDate, NaiveDateTime};

    use crate::types::{PackagerError, PackagerResult};

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d.%m.%Y %H:%M:%S", "%d.%m.%Y %H:%M"];

    /// Parses a date in ISO, Swiss or Excel serial notation.
    pub fn date(value: &str) -> PackagerResult<NaiveDate> {
        let value = value.trim();
        let invalid = || PackagerError::InvalidDate {
            value: value.to_string(),
        };

        if let Ok(serial) = value.parse::<f64>() {
            // Excel serial dates count from 1899-12-30
            if !serial.is_finite() || serial < 0.0 {
                return Err(invalid());
            }
            let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).ok_or_else(invalid)?;
            return epoch
                .checked_add_days(Days::new(serial.trunc() as u64))
                .ok_or_else(invalid);
        }

        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(value, format) {
                return Ok(date);
            }
        }
        for format in DATETIME_FORMATS {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
                return Ok(datetime.date());
            }
        }
        Err(invalid())
    }

    /// Parses a date and returns the number of days since 1900-01-01.
    pub fn serial_day(value: &str) -> PackagerResult<i64> {
        let date = date(value)?;
        let base = NaiveDate::from_ymd_opt(1900, 1, 1).ok_or_else(|| PackagerError::InvalidDate {
            value: value.to_string(),
        })?;
        Ok((date - base).num_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_read_table_from_reader() {
        let data = "\u{feff}FallNr,Leistung\n1,00.0010\n\n2,00.0020\n";
        let table = read_table_from_reader(data.as_bytes(), b',').unwrap();
        assert_eq!(table.columns(), &["FallNr".to_string(), "Leistung".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1], vec!["2".to_string(), "00.0020".to_string()]);
    }

    #[test]
    fn test_read_table_semicolon() {
        let data = "FallNr;Leistung\n1;0.01\n";
        let table = read_table_from_reader(data.as_bytes(), b';').unwrap();
        assert_eq!(table.rows()[0][1], "0.01");
    }

    #[test]
    fn test_read_table_rejects_ragged_rows() {
        let data = "a,b\n1,2\n3\n";
        assert!(matches!(
            read_table_from_reader(data.as_bytes(), b','),
            Err(PackagerError::Csv(_))
        ));
    }

    #[test]
    fn test_read_table_missing_file() {
        assert!(matches!(
            read_table("/definitely/not/here.csv", b','),
            Err(PackagerError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_read_categories_keeps_order() {
        let data = "0.03\n\n00.0010;ignored\n 0.002 \n";
        let categories = read_categories_from_reader(data.as_bytes(), b';').unwrap();
        let rendered: Vec<&str> = categories.iter().map(ProcedureCode::as_str).collect();
        assert_eq!(rendered, vec!["00.0300", "00.0010", "00.0020"]);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        assert_eq!(parse::date("2020-01-31").unwrap(), expected);
        assert_eq!(parse::date("31.01.2020").unwrap(), expected);
        assert_eq!(parse::date("2020-01-31 00:00:00").unwrap(), expected);
        assert_eq!(parse::date("43861").unwrap(), expected);
        assert!(parse::date("gestern").is_err());
        assert!(parse::date("-4").is_err());
    }

    #[test]
    fn test_serial_day() {
        assert_eq!(parse::serial_day("1900-01-01").unwrap(), 0);
        assert_eq!(parse::serial_day("1900-01-11").unwrap(), 10);
        assert_eq!(parse::serial_day("02.01.1900").unwrap(), 1);
    }
}
