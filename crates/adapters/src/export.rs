use std::fs;
use std::path::Path;

use quarry_core::SaveFormat;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::result_store::ResultTable;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export file at {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize JSON export: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes `table` to `path` and returns the number of rows written.
pub fn export_table(
    path: &Path,
    format: SaveFormat,
    table: &ResultTable,
) -> Result<usize, ExportError> {
    let content = match format {
        SaveFormat::Csv => render_csv(table),
        SaveFormat::Json => render_json(table)?,
    };

    fs::write(path, content).map_err(|source| ExportError::Write {
        path: path.display().to_string(),
        source,
    })?;
    Ok(table.rows.len())
}

fn render_csv(table: &ResultTable) -> String {
    let mut content = String::new();
    content.push_str(
        &table
            .headers
            .iter()
            .map(|header| csv_escape(header))
            .collect::<Vec<_>>()
            .join(","),
    );
    content.push('\n');

    for row in &table.rows {
        let values = (0..table.headers.len())
            .map(|column| csv_escape(row.get(column).map_or("", String::as_str)))
            .collect::<Vec<_>>();
        content.push_str(&values.join(","));
        content.push('\n');
    }
    content
}

fn render_json(table: &ResultTable) -> Result<String, serde_json::Error> {
    let records = table
        .rows
        .iter()
        .map(|row| {
            let mut object = Map::with_capacity(table.headers.len());
            for (column, header) in table.headers.iter().enumerate() {
                let value = row.get(column).map_or(Value::Null, |value| json!(value));
                object.insert(header.clone(), value);
            }
            Value::Object(object)
        })
        .collect::<Vec<_>>();

    serde_json::to_string_pretty(&records)
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
