use csv::ReaderBuilder;
use serde::Deserialize;
use serde_json::Value;

use crate::models::{Result, SyncEngineError};

#[derive(Debug, Clone, Deserialize)]
pub struct CsvSettings {
    pub path: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_has_headers")]
    pub has_headers: bool,
}

fn default_delimiter() -> char {
    ','
}

fn default_has_headers() -> bool {
    true
}

pub struct CsvReader;

impl CsvReader {
    pub fn new() -> Self {
        Self
    }

    /// Reads the whole file into untyped records, one JSON object per row.
    /// Either the complete record set is returned or the read fails; there
    /// are no partial results.
    pub fn read_records(&self, settings: &CsvSettings) -> Result<Vec<Value>> {
        let text = std::fs::read_to_string(&settings.path).map_err(|e| {
            SyncEngineError::Read(format!("cannot read file '{}': {}", settings.path, e))
        })?;

        let mut reader = ReaderBuilder::new()
            .delimiter(settings.delimiter as u8)
            .has_headers(settings.has_headers)
            .from_reader(text.as_bytes());

        let headers = if settings.has_headers {
            reader.headers()?.iter().map(|h| h.to_string()).collect::<Vec<_>>()
        } else {
            let first = reader.records().next().transpose()?;
            match first {
                Some(record) => (0..record.len()).map(|i| format!("column_{}", i)).collect(),
                None => return Ok(Vec::new()),
            }
        };

        // Reset the reader if a record was consumed to synthesize headers
        if !settings.has_headers {
            reader = ReaderBuilder::new()
                .delimiter(settings.delimiter as u8)
                .has_headers(false)
                .from_reader(text.as_bytes());
        }

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut json_record = serde_json::Map::new();
            for (i, field) in record.iter().enumerate() {
                if let Some(header) = headers.get(i) {
                    json_record.insert(header.clone(), Value::String(field.to_string()));
                }
            }
            records.push(Value::Object(json_record));
        }

        tracing::debug!(
            path = %settings.path,
            record_count = records.len(),
            "Parsed CSV data"
        );

        Ok(records)
    }
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(format!("datasync-csv-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn reads_headered_file_into_objects() {
        let path = write_temp("headered.csv", "sku,name\na,Widget\nb,Gadget\n");
        let records = CsvReader::new()
            .read_records(&CsvSettings { path: path.clone(), delimiter: ',', has_headers: true })
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["sku"], "a");
        assert_eq!(records[1]["name"], "Gadget");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn synthesizes_column_names_without_headers() {
        let path = write_temp("bare.csv", "a;1\nb;2\n");
        let records = CsvReader::new()
            .read_records(&CsvSettings { path: path.clone(), delimiter: ';', has_headers: false })
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["column_0"], "a");
        assert_eq!(records[0]["column_1"], "1");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = CsvReader::new()
            .read_records(&CsvSettings {
                path: "/nonexistent/input.csv".into(),
                delimiter: ',',
                has_headers: true,
            })
            .unwrap_err();
        assert!(matches!(err, SyncEngineError::Read(_)));
    }
}
