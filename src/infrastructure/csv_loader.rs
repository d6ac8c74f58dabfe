//! Tabular-file reader for bulk imports
//!
//! Yields one loose `RawAdRow` per CSV record, keyed by the file's own
//! header names; the normalizer resolves column aliases downstream. A
//! malformed line becomes an empty row so the batch still accounts for it
//! as a row error instead of silently shrinking.

use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::domain::error::{IngestError, IngestResult};
use crate::domain::normalizer::RawAdRow;

pub fn load_rows(path: &Path) -> IngestResult<Vec<RawAdRow>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        IngestError::configuration(format!("cannot open CSV {}: {e}", path.display()))
    })?;

    let headers = reader
        .headers()
        .map_err(|e| IngestError::configuration(format!("unreadable CSV header: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        match record {
            Ok(record) => {
                let row: RawAdRow = headers
                    .iter()
                    .zip(record.iter())
                    .map(|(h, v)| (h.to_string(), Value::String(v.to_string())))
                    .collect();
                rows.push(row);
            }
            Err(e) => {
                warn!("Unparseable CSV line {}: {}", index + 2, e);
                rows.push(RawAdRow::default());
            }
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn reads_headered_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ads.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "ID,Página,Info Ads").unwrap();
        writeln!(file, "a1,Marca X,45 ads brasil").unwrap();
        writeln!(file, "a2,Marca Y,3").unwrap();

        let rows = load_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get_str(&["id"]).unwrap(), "a1");
        assert_eq!(rows[1].get_str(&["página"]).unwrap(), "Marca Y");
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = load_rows(Path::new("/nonexistent/ads.csv")).unwrap_err();
        assert!(matches!(err, IngestError::Configuration(_)));
    }
}
