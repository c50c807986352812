use anyhow::Result;
use serde_json::{json, Value};
use sqlx::any::AnyRow;
use sqlx::{Column, Row, TypeInfo};

use crate::domain::ports::RowMap;

/// Convert a sqlx `AnyRow` into a `RowMap` keyed by column name.
///
/// Catalog queries only ever return booleans, integers and strings, so the
/// decoding table is small. MySQL/MariaDB return information_schema string
/// columns as BLOB to `AnyRow` — detected at runtime and read as raw UTF-8.
pub fn row_to_map(row: &AnyRow) -> Result<RowMap> {
    let mut map = RowMap::new();
    for col in row.columns() {
        let idx = col.ordinal();
        let value = match col.type_info().name().to_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => row
                .try_get::<Option<bool>, _>(idx)?
                .map_or(Value::Null, Value::Bool),

            "INT2" | "SMALLINT" | "INT4" | "INT" | "INTEGER" | "MEDIUMINT" | "TINYINT" => row
                .try_get::<Option<i32>, _>(idx)?
                .map_or(Value::Null, |v| json!(v)),

            "INT8" | "BIGINT" => row
                .try_get::<Option<i64>, _>(idx)?
                .map_or(Value::Null, |v| json!(v)),

            "BLOB" => {
                let bytes: Option<Vec<u8>> = row.try_get(idx)?;
                bytes.map_or(Value::Null, |b| {
                    Value::String(String::from_utf8(b).unwrap_or_default())
                })
            }

            // TEXT, VARCHAR, NAME, and everything else the catalogs emit
            _ => row
                .try_get::<Option<String>, _>(idx)?
                .map_or(Value::Null, Value::String),
        };
        map.insert(col.name().to_string(), value);
    }
    Ok(map)
}
