//! Result export

use crate::calculator::DispersionResult;
use crate::errors::DispersionError;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

/// Write results as CSV with a `doi,refs,links,density,red` header
pub fn write_csv<W: Write>(writer: W, results: &[DispersionResult]) -> Result<(), DispersionError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if results.is_empty() {
        csv_writer.write_record(["doi", "refs", "links", "density", "red"])?;
    }
    for result in results {
        csv_writer.serialize(result)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write results as a pretty-printed JSON array
pub fn write_json<W: Write>(mut writer: W, results: &[DispersionResult]) -> Result<(), DispersionError> {
    serde_json::to_writer_pretty(&mut writer, results)?;
    writeln!(writer)?;
    Ok(())
}

pub fn write_results<W: Write>(
    writer: W,
    results: &[DispersionResult],
    format: OutputFormat,
) -> Result<(), DispersionError> {
    match format {
        OutputFormat::Csv => write_csv(writer, results),
        OutputFormat::Json => write_json(writer, results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::DispersionMetrics;

    fn sample() -> Vec<DispersionResult> {
        vec![
            DispersionResult::computed(
                "10.1000/a",
                DispersionMetrics { refs: 3, links: 2, density: 0.666667, red: 0.1264 },
            ),
            DispersionResult::unavailable("10.1000/b", "status 404"),
        ]
    }

    #[test]
    fn test_csv_output() {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &sample()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "doi,refs,links,density,red");
        assert_eq!(lines[1], "10.1000/a,3,2,0.666667,0.1264");
        assert_eq!(lines[2], "10.1000/b,unavailable,unavailable,unavailable,unavailable");
    }

    #[test]
    fn test_csv_header_without_rows() {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &[]).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "doi,refs,links,density,red\n");
    }

    #[test]
    fn test_json_output() {
        let mut buffer = Vec::new();
        write_results(&mut buffer, &sample(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value[0]["links"], 2);
        assert_eq!(value[1]["red"], "unavailable");
    }
}
