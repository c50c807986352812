//! SQLite schema parser.
//!
//! SQLite has no information_schema: columns come from `PRAGMA table_info`,
//! indexes from `PRAGMA index_list` + `PRAGMA index_info`, foreign keys from
//! `PRAGMA foreign_key_list`. PRAGMAs take no bind parameters, so the table
//! name is interpolated as a quoted identifier.
//!
//! Declared types ride the affinity ladder; the primary key is synthesized
//! from the `pk` markers because SQLite's own `sqlite_autoindex_*` entries
//! are discarded.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::error::SchemaError;
use crate::domain::ports::{CatalogClient, RowMap, SchemaParser};
use crate::domain::schema::{
    Column, DriverTag, FkAction, ForeignKey, Index, IndexKind, Table,
};
use crate::domain::types::TypeMap;
use crate::infrastructure::db::catalog_values::{parse_default, type_params};
use crate::infrastructure::db::{
    ensure_exists, get_bool, get_i64, get_str, group_by_ordinal, mark_primary_columns,
};

const LIST_TABLES_SQL: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
     ORDER BY name";

const TABLE_EXISTS_SQL: &str = "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?";

pub struct SqliteParser {
    client: Arc<dyn CatalogClient>,
    types: TypeMap,
}

impl SqliteParser {
    pub fn new(client: Arc<dyn CatalogClient>, types: TypeMap) -> Self {
        SqliteParser { client, types }
    }

    fn quote_ident(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn compose_column(&self, row: &RowMap, single_integer_pk: &Option<String>) -> Column {
        let name = get_str(row, "name").unwrap_or_default();
        let native = get_str(row, "type").unwrap_or_default();
        let column_type = self.types.canonical(DriverTag::Sqlite, &native);

        let mut col = Column::new(name.clone(), column_type, native.clone());
        col.nullable = !get_bool(row, "notnull") && get_i64(row, "pk").unwrap_or(0) == 0;
        // INTEGER PRIMARY KEY on a single-column PK is the rowid alias
        col.auto_increment = single_integer_pk.as_deref() == Some(name.as_str());
        if let Some(raw) = get_str(row, "dflt_value") {
            col.default = parse_default(&raw, DriverTag::Sqlite);
        }
        let (length, scale) = type_params(&native);
        if col.column_type == crate::domain::schema::ColumnType::Decimal {
            col.precision = length;
            col.scale = scale;
        } else if col.column_type.is_textual() {
            col.length = length;
        }
        col
    }

    async fn compose_indexes(
        &self,
        table: &str,
        pk_columns: &[String],
    ) -> Result<Vec<Index>, SchemaError> {
        let list_sql = format!("PRAGMA index_list({})", Self::quote_ident(table));
        let rows = self.client.query(&list_sql, &[]).await?;

        let mut indexes = Vec::new();
        // the rowid PK has no index_list entry; composite PKs only show up as
        // a discarded autoindex — synthesize the Primary either way
        if !pk_columns.is_empty() {
            indexes.push(Index::new("primary", IndexKind::Primary, pk_columns.to_vec()));
        }

        for row in &rows {
            let Some(name) = get_str(row, "name") else {
                continue;
            };
            if name.starts_with("sqlite_autoindex_") {
                continue;
            }
            let info_sql = format!("PRAGMA index_info({})", Self::quote_ident(&name));
            let mut members = self.client.query(&info_sql, &[]).await?;
            members.sort_by_key(|r| get_i64(r, "seqno").unwrap_or(0));
            let columns: Vec<String> = members
                .iter()
                .filter_map(|r| get_str(r, "name"))
                .collect();
            if columns.is_empty() {
                continue;
            }
            let kind = if get_bool(row, "unique") {
                IndexKind::Unique
            } else {
                IndexKind::Index
            };
            indexes.push(Index::new(name, kind, columns));
        }
        Ok(indexes)
    }

    async fn compose_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, SchemaError> {
        let sql = format!("PRAGMA foreign_key_list({})", Self::quote_ident(table));
        let rows = self.client.query(&sql, &[]).await?;

        Ok(group_by_ordinal(&rows, "id", "seq")
            .into_iter()
            .filter_map(|(_, members)| {
                let first = members[0];
                let referenced_table = get_str(first, "table")?;
                let columns: Vec<String> = members
                    .iter()
                    .filter_map(|r| get_str(r, "from"))
                    .collect();
                // `to` is NULL when the FK targets the referenced table's PK
                let referenced_columns: Vec<String> = members
                    .iter()
                    .map(|r| get_str(r, "to").unwrap_or_else(|| "id".to_string()))
                    .collect();
                // SQLite constraints are anonymous; name them by convention
                let name = format!("{}_{}_foreign", table, columns.join("_"));
                let mut fk = ForeignKey::new(name, columns, referenced_table, referenced_columns);
                fk.on_delete =
                    FkAction::from_catalog(&get_str(first, "on_delete").unwrap_or_default());
                fk.on_update =
                    FkAction::from_catalog(&get_str(first, "on_update").unwrap_or_default());
                Some(fk)
            })
            .collect())
    }
}

#[async_trait]
impl SchemaParser for SqliteParser {
    async fn list_tables(&self, exclude: &[String]) -> Result<Vec<String>, SchemaError> {
        let rows = self.client.query(LIST_TABLES_SQL, &[]).await?;
        Ok(rows
            .iter()
            .filter_map(|r| get_str(r, "name"))
            .filter(|name| !exclude.contains(name))
            .collect())
    }

    async fn parse_table(&self, name: &str) -> Result<Table, SchemaError> {
        let info_sql = format!("PRAGMA table_info({})", Self::quote_ident(name));
        let column_rows = self.client.query(&info_sql, &[]).await?;
        ensure_exists(!column_rows.is_empty(), name)?;

        // pk markers are 1-based ordinals of the primary key
        let mut pk_marked: Vec<(i64, String)> = column_rows
            .iter()
            .filter_map(|r| {
                let ord = get_i64(r, "pk").unwrap_or(0);
                (ord > 0).then(|| (ord, get_str(r, "name").unwrap_or_default()))
            })
            .collect();
        pk_marked.sort_by_key(|(ord, _)| *ord);
        let pk_columns: Vec<String> = pk_marked.into_iter().map(|(_, n)| n).collect();

        let single_integer_pk = if pk_columns.len() == 1 {
            column_rows
                .iter()
                .find(|r| get_str(r, "name").as_deref() == Some(pk_columns[0].as_str()))
                .filter(|r| {
                    get_str(r, "type")
                        .unwrap_or_default()
                        .eq_ignore_ascii_case("integer")
                })
                .map(|_| pk_columns[0].clone())
        } else {
            None
        };

        let mut table = Table::new(name);
        table.columns = column_rows
            .iter()
            .map(|r| self.compose_column(r, &single_integer_pk))
            .collect();
        table.indexes = self.compose_indexes(name, &pk_columns).await?;
        table.foreign_keys = self.compose_foreign_keys(name).await?;

        mark_primary_columns(&mut table);
        Ok(table)
    }

    async fn table_exists(&self, name: &str) -> Result<bool, SchemaError> {
        let rows = self.client.query(TABLE_EXISTS_SQL, &[name]).await?;
        Ok(!rows.is_empty())
    }

    fn database_name(&self) -> &str {
        self.client.database_name()
    }

    fn driver_tag(&self) -> DriverTag {
        DriverTag::Sqlite
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{ColumnType, DefaultValue};
    use crate::infrastructure::db::testing::{row, FakeCatalog};
    use serde_json::json;

    fn client() -> Arc<dyn CatalogClient> {
        let table_info = vec![
            row(&[
                ("cid", json!(0)),
                ("name", json!("id")),
                ("type", json!("INTEGER")),
                ("notnull", json!(0)),
                ("dflt_value", json!(null)),
                ("pk", json!(1)),
            ]),
            row(&[
                ("cid", json!(1)),
                ("name", json!("title")),
                ("type", json!("VARCHAR(80)")),
                ("notnull", json!(1)),
                ("dflt_value", json!("'untitled'")),
                ("pk", json!(0)),
            ]),
            row(&[
                ("cid", json!(2)),
                ("name", json!("rating")),
                ("type", json!("REAL")),
                ("notnull", json!(0)),
                ("dflt_value", json!("0.0")),
                ("pk", json!(0)),
            ]),
            row(&[
                ("cid", json!(3)),
                ("name", json!("author_id")),
                ("type", json!("INTEGER")),
                ("notnull", json!(0)),
                ("dflt_value", json!(null)),
                ("pk", json!(0)),
            ]),
        ];
        let index_list = vec![
            row(&[
                ("seq", json!(0)),
                ("name", json!("sqlite_autoindex_books_1")),
                ("unique", json!(1)),
                ("origin", json!("u")),
            ]),
            row(&[
                ("seq", json!(1)),
                ("name", json!("books_title_idx")),
                ("unique", json!(0)),
                ("origin", json!("c")),
            ]),
        ];
        let index_info = vec![row(&[
            ("seqno", json!(0)),
            ("cid", json!(1)),
            ("name", json!("title")),
        ])];
        let fk_list = vec![row(&[
            ("id", json!(0)),
            ("seq", json!(0)),
            ("table", json!("authors")),
            ("from", json!("author_id")),
            ("to", json!(null)),
            ("on_update", json!("NO ACTION")),
            ("on_delete", json!("CASCADE")),
        ])];

        Arc::new(
            FakeCatalog::new(DriverTag::Sqlite)
                .on("PRAGMA table_info", table_info)
                .on("PRAGMA index_list", index_list)
                .on("PRAGMA index_info", index_info)
                .on("PRAGMA foreign_key_list", fk_list),
        )
    }

    fn parser(c: Arc<dyn CatalogClient>) -> SqliteParser {
        SqliteParser::new(c, TypeMap::new())
    }

    #[tokio::test]
    async fn integer_primary_key_is_auto_increment() {
        let table = parser(client()).parse_table("books").await.unwrap();
        let id = table.column("id").unwrap();
        assert_eq!(id.column_type, ColumnType::Integer);
        assert!(id.auto_increment);
        assert!(!id.nullable); // pk column is never nullable
    }

    #[tokio::test]
    async fn affinity_rules_applied() {
        let table = parser(client()).parse_table("books").await.unwrap();
        assert_eq!(table.column("title").unwrap().column_type, ColumnType::Text);
        assert_eq!(table.column("title").unwrap().length, Some(80));
        assert_eq!(table.column("rating").unwrap().column_type, ColumnType::Float);
    }

    #[tokio::test]
    async fn defaults_parsed_from_pragma() {
        let table = parser(client()).parse_table("books").await.unwrap();
        assert_eq!(
            table.column("title").unwrap().default,
            Some(DefaultValue::Str("untitled".into()))
        );
        assert_eq!(
            table.column("rating").unwrap().default,
            Some(DefaultValue::Float(0.0))
        );
    }

    #[tokio::test]
    async fn autoindexes_discarded_and_primary_synthesized() {
        let table = parser(client()).parse_table("books").await.unwrap();
        let names: Vec<&str> = table.indexes.iter().map(|i| i.name.as_str()).collect();
        assert!(!names.iter().any(|n| n.starts_with("sqlite_autoindex_")));
        assert_eq!(table.primary_key().unwrap().columns, vec!["id"]);
        assert!(names.contains(&"books_title_idx"));
    }

    #[tokio::test]
    async fn foreign_keys_named_by_convention() {
        let table = parser(client()).parse_table("books").await.unwrap();
        assert_eq!(table.foreign_keys.len(), 1);
        let fk = &table.foreign_keys[0];
        assert_eq!(fk.name, "books_author_id_foreign");
        assert_eq!(fk.referenced_table, "authors");
        assert_eq!(fk.referenced_columns, vec!["id"]); // NULL `to` → pk alias
        assert_eq!(fk.on_delete, FkAction::Cascade);
        assert_eq!(fk.on_update, FkAction::NoAction);
        assert!(table.validate().is_ok());
    }

    #[tokio::test]
    async fn missing_table_is_table_not_found() {
        let c = Arc::new(FakeCatalog::new(DriverTag::Sqlite));
        let err = parser(c).parse_table("ghost").await.unwrap_err();
        assert!(matches!(err, SchemaError::TableNotFound(_)));
    }

    #[tokio::test]
    async fn composite_pk_not_auto_increment() {
        let table_info = vec![
            row(&[
                ("cid", json!(0)),
                ("name", json!("a")),
                ("type", json!("INTEGER")),
                ("notnull", json!(1)),
                ("pk", json!(1)),
            ]),
            row(&[
                ("cid", json!(1)),
                ("name", json!("b")),
                ("type", json!("INTEGER")),
                ("notnull", json!(1)),
                ("pk", json!(2)),
            ]),
        ];
        let c = Arc::new(FakeCatalog::new(DriverTag::Sqlite).on("PRAGMA table_info", table_info));
        let table = parser(c).parse_table("pairs").await.unwrap();
        assert!(!table.column("a").unwrap().auto_increment);
        assert_eq!(table.primary_key().unwrap().columns, vec!["a", "b"]);
    }
}
