use serde::Serialize;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// One torsion bin of a recorded torsion PMF.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PmfRow {
    pub direction: &'static str,
    pub stage: usize,
    pub atom: usize,
    pub bin: usize,
    pub phi: f64,
    pub logp: f64,
    pub probability: f64,
}

#[derive(Debug, Error)]
#[error("CSV writing error for '{path}': {source}")]
pub struct PmfCsvError {
    pub path: String,
    pub source: csv::Error,
}

pub fn write_pmf_csv<W: Write>(
    writer: W,
    rows: impl IntoIterator<Item = PmfRow>,
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_pmf_csv_to_path(
    path: &Path,
    rows: impl IntoIterator<Item = PmfRow>,
) -> Result<(), PmfCsvError> {
    let to_error = |source: csv::Error| PmfCsvError {
        path: path.to_string_lossy().to_string(),
        source,
    };
    let mut csv_writer = csv::Writer::from_path(path).map_err(to_error)?;
    for row in rows {
        csv_writer.serialize(row).map_err(to_error)?;
    }
    csv_writer.flush().map_err(|e| to_error(e.into()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rows() -> Vec<PmfRow> {
        vec![
            PmfRow {
                direction: "forward",
                stage: 1,
                atom: 4,
                bin: 0,
                phi: -3.0,
                logp: -0.5,
                probability: 0.25,
            },
            PmfRow {
                direction: "forward",
                stage: 1,
                atom: 4,
                bin: 1,
                phi: 0.0,
                logp: f64::NEG_INFINITY,
                probability: 0.0,
            },
        ]
    }

    #[test]
    fn write_pmf_csv_emits_header_and_rows() {
        let mut buffer = Vec::new();
        write_pmf_csv(&mut buffer, rows()).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "direction,stage,atom,bin,phi,logp,probability");
        assert_eq!(lines[1], "forward,1,4,0,-3.0,-0.5,0.25");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn write_pmf_csv_to_path_reports_path_on_failure() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing").join("pmf.csv");
        let err = write_pmf_csv_to_path(&missing, rows()).unwrap_err();
        assert!(err.path.ends_with("pmf.csv"));
    }

    #[test]
    fn write_pmf_csv_to_path_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pmf.csv");
        write_pmf_csv_to_path(&path, rows()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
    }
}
