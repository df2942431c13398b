//! DOI input parsing
//!
//! Values are trimmed and blank cells dropped. Duplicates are kept.

use crate::errors::DispersionError;
use std::io::{BufRead, Read};

/// Default name of the DOI column
pub const DEFAULT_COLUMN: &str = "doi";

/// Read the DOI column of a CSV document with a header row
pub fn read_dois<R: Read>(reader: R, column: &str) -> Result<Vec<String>, DispersionError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let index = csv_reader
        .headers()?
        .iter()
        .position(|header| header.trim_start_matches('\u{feff}') == column)
        .ok_or_else(|| DispersionError::MissingColumn {
            column: column.to_string(),
        })?;

    let mut dois = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if let Some(value) = record.get(index).map(str::trim).filter(|v| !v.is_empty()) {
            dois.push(value.to_string());
        }
    }
    Ok(dois)
}

/// Read one DOI per line
pub fn read_doi_lines<R: BufRead>(reader: R) -> Result<Vec<String>, DispersionError> {
    let mut dois = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let value = line.trim();
        if !value.is_empty() {
            dois.push(value.to_string());
        }
    }
    Ok(dois)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_named_column() {
        let data = "title,doi\nFirst, 10.1000/a \nSecond,\nThird,10.1000/b\nFourth,10.1000/a\n";
        let dois = read_dois(data.as_bytes(), DEFAULT_COLUMN).unwrap();
        assert_eq!(dois, vec!["10.1000/a", "10.1000/b", "10.1000/a"]);
    }

    #[test]
    fn test_missing_column() {
        let data = "title,identifier\nFirst,10.1000/a\n";
        let err = read_dois(data.as_bytes(), DEFAULT_COLUMN).unwrap_err();
        assert!(matches!(err, DispersionError::MissingColumn { column } if column == "doi"));
    }

    #[test]
    fn test_bom_header_and_short_rows() {
        let data = "\u{feff}doi,year\n10.1000/a,2020\n10.1000/b\n";
        let dois = read_dois(data.as_bytes(), DEFAULT_COLUMN).unwrap();
        assert_eq!(dois, vec!["10.1000/a", "10.1000/b"]);
    }

    #[test]
    fn test_plain_lines() {
        let data = "10.1000/a\n\n   \n 10.1000/b\n";
        let dois = read_doi_lines(data.as_bytes()).unwrap();
        assert_eq!(dois, vec!["10.1000/a", "10.1000/b"]);
    }
}
