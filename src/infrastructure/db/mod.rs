use std::sync::Arc;

use crate::domain::error::SchemaError;
use crate::domain::ports::{CatalogClient, RowMap, SchemaParser};
use crate::domain::schema::{DriverTag, IndexKind, Table};
use crate::domain::types::TypeMap;

pub mod catalog_values;
pub mod client;
pub mod mysql;
pub mod postgres;
pub mod row_mapper;
pub mod sqlite;
pub mod sqlserver;

use self::mysql::MySqlParser;
use self::postgres::PostgresParser;
use self::sqlite::SqliteParser;
use self::sqlserver::SqlServerParser;

/// Select the dialect parser from the client's driver tag.
///
/// The tag is already validated ([`DriverTag::parse`] rejects unknown
/// drivers), so this factory is total over the enum.
pub fn make_parser(client: Arc<dyn CatalogClient>, types: TypeMap) -> Box<dyn SchemaParser> {
    match client.driver() {
        DriverTag::Mysql => Box::new(MySqlParser::new(client, types)),
        DriverTag::Pgsql => Box::new(PostgresParser::new(client, types)),
        DriverTag::Sqlite => Box::new(SqliteParser::new(client, types)),
        DriverTag::Sqlsrv => Box::new(SqlServerParser::new(client, types)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row access helpers shared by the parsers
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn get_str(row: &RowMap, key: &str) -> Option<String> {
    match row.get(key) {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn get_i64(row: &RowMap, key: &str) -> Option<i64> {
    match row.get(key) {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

pub(crate) fn get_u32(row: &RowMap, key: &str) -> Option<u32> {
    get_i64(row, key).and_then(|v| u32::try_from(v).ok())
}

/// Truthiness across the forms catalogs use: native booleans, 0/1 integers,
/// "YES"/"NO", "true"/"t".
pub(crate) fn get_bool(row: &RowMap, key: &str) -> bool {
    match row.get(key) {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::Number(n)) => n.as_i64().map(|v| v != 0).unwrap_or(false),
        Some(serde_json::Value::String(s)) => {
            matches!(s.to_lowercase().as_str(), "1" | "yes" | "true" | "t")
        }
        _ => false,
    }
}

/// Non-empty string or `None` — catalogs report absent metadata as "".
pub(crate) fn get_opt_str(row: &RowMap, key: &str) -> Option<String> {
    get_str(row, key).filter(|s| !s.is_empty())
}

/// Group one-row-per-column catalog output by a name key, preserving the
/// order groups first appear, and sort each group by its ordinal key.
/// Composite indexes and FKs arrive this way from every dialect.
pub(crate) fn group_by_ordinal<'a>(
    rows: &'a [RowMap],
    name_key: &str,
    ordinal_key: &str,
) -> Vec<(String, Vec<&'a RowMap>)> {
    let mut groups: Vec<(String, Vec<&RowMap>)> = Vec::new();
    for row in rows {
        let Some(name) = get_str(row, name_key) else {
            continue;
        };
        match groups.iter_mut().find(|(n, _)| *n == name) {
            Some((_, members)) => members.push(row),
            None => groups.push((name, vec![row])),
        }
    }
    for (_, members) in &mut groups {
        members.sort_by_key(|row| get_i64(row, ordinal_key).unwrap_or(0));
    }
    groups
}

/// Propagate the Primary index onto the column-level `primary` flag once a
/// table is fully composed.
pub(crate) fn mark_primary_columns(table: &mut Table) {
    let pk_cols: Vec<String> = table
        .indexes
        .iter()
        .find(|i| i.kind == IndexKind::Primary)
        .map(|i| i.columns.clone())
        .unwrap_or_default();
    for col in &mut table.columns {
        if pk_cols.contains(&col.name) {
            col.flags.primary = true;
        }
    }
}

/// Standard guard used by every `parse_table`: resolve a missing table to
/// [`SchemaError::TableNotFound`] before composing anything.
pub(crate) fn ensure_exists(exists: bool, name: &str) -> Result<(), SchemaError> {
    if exists {
        Ok(())
    } else {
        Err(SchemaError::TableNotFound(name.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory catalog for parser tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use serde_json::Value;

    use crate::domain::error::SchemaError;
    use crate::domain::ports::{CatalogClient, RowMap};
    use crate::domain::schema::DriverTag;

    /// Canned catalog: responses are matched by an SQL fragment and an
    /// optional bind value, first match wins. Unmatched queries return no
    /// rows, which is what a real catalog does for an empty table.
    pub struct FakeCatalog {
        driver: DriverTag,
        database: String,
        responses: Vec<(String, Option<String>, Vec<RowMap>)>,
    }

    impl FakeCatalog {
        pub fn new(driver: DriverTag) -> Self {
            FakeCatalog {
                driver,
                database: "app".to_string(),
                responses: Vec::new(),
            }
        }

        /// Respond with `rows` to any query containing `fragment`.
        pub fn on(mut self, fragment: &str, rows: Vec<RowMap>) -> Self {
            self.responses.push((fragment.to_string(), None, rows));
            self
        }

        /// Respond only when `bind` is among the bound values.
        pub fn on_bound(mut self, fragment: &str, bind: &str, rows: Vec<RowMap>) -> Self {
            self.responses
                .push((fragment.to_string(), Some(bind.to_string()), rows));
            self
        }
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        async fn query(&self, sql: &str, binds: &[&str]) -> Result<Vec<RowMap>, SchemaError> {
            for (fragment, bind, rows) in &self.responses {
                let fragment_hit = sql.contains(fragment.as_str());
                let bind_hit = match bind {
                    Some(b) => binds.contains(&b.as_str()) || sql.contains(b.as_str()),
                    None => true,
                };
                if fragment_hit && bind_hit {
                    return Ok(rows.clone());
                }
            }
            Ok(Vec::new())
        }

        fn driver(&self) -> DriverTag {
            self.driver
        }

        fn database_name(&self) -> &str {
            &self.database
        }
    }

    /// Row literal helper: `row(&[("column_name", json!("id"))])`.
    pub fn row(pairs: &[(&str, Value)]) -> RowMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}
