use calamine::{open_workbook_auto, Data, Reader};
use serde::Deserialize;
use serde_json::Value;

use crate::models::{Result, SyncEngineError};

#[derive(Debug, Clone, Deserialize)]
pub struct ExcelSettings {
    pub path: String,
    /// Worksheet name; the first sheet is used when absent.
    #[serde(default)]
    pub sheet: Option<String>,
}

pub struct ExcelReader;

impl ExcelReader {
    pub fn new() -> Self {
        Self
    }

    /// Reads one worksheet into untyped records. The first row supplies the
    /// field names; empty header cells get synthesized column names.
    pub fn read_records(&self, settings: &ExcelSettings) -> Result<Vec<Value>> {
        let mut workbook = open_workbook_auto(&settings.path).map_err(|e| {
            SyncEngineError::Read(format!("cannot open workbook '{}': {}", settings.path, e))
        })?;

        let sheet_name = match &settings.sheet {
            Some(name) => name.clone(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| SyncEngineError::Read(format!("workbook '{}' has no sheets", settings.path)))?,
        };

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| SyncEngineError::Read(format!("cannot read sheet '{}': {}", sheet_name, e)))?;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header_row) => header_row
                .iter()
                .enumerate()
                .map(|(i, cell)| match cell {
                    Data::String(s) if !s.trim().is_empty() => s.trim().to_string(),
                    Data::Empty => format!("column_{}", i),
                    other => cell_to_value(other).as_str().map(str::to_string).unwrap_or_else(|| format!("column_{}", i)),
                })
                .collect(),
            None => return Ok(Vec::new()),
        };

        let mut records = Vec::new();
        for row in rows {
            let mut json_record = serde_json::Map::new();
            for (i, cell) in row.iter().enumerate() {
                if let Some(header) = headers.get(i) {
                    json_record.insert(header.clone(), cell_to_value(cell));
                }
            }
            records.push(Value::Object(json_record));
        }

        tracing::debug!(
            path = %settings.path,
            sheet = %sheet_name,
            record_count = records.len(),
            "Parsed spreadsheet data"
        );

        Ok(records)
    }
}

impl Default for ExcelReader {
    fn default() -> Self {
        Self::new()
    }
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        Data::DateTimeIso(s) => Value::String(s.clone()),
        Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(e) => Value::String(format!("#ERR {:?}", e)),
    }
}
