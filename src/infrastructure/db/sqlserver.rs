//! SQL Server schema parser.
//!
//! Reads the `sys` catalog views. sqlx ships no sqlsrv driver, so this
//! parser is only ever driven through a host-supplied [`CatalogClient`];
//! it is factory-selectable like the other three and carries its weight in
//! tests against the in-memory catalog.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::error::SchemaError;
use crate::domain::ports::{CatalogClient, RowMap, SchemaParser};
use crate::domain::schema::{
    Column, ColumnType, DriverTag, FkAction, ForeignKey, Index, IndexKind, Table,
};
use crate::domain::types::TypeMap;
use crate::infrastructure::db::catalog_values::parse_default;
use crate::infrastructure::db::{
    ensure_exists, get_bool, get_opt_str, get_str, get_u32, group_by_ordinal, mark_primary_columns,
};

const LIST_TABLES_SQL: &str = "SELECT t.name AS table_name \
     FROM sys.tables t \
     INNER JOIN sys.schemas s ON s.schema_id = t.schema_id \
     WHERE s.name = @p1 \
     ORDER BY t.name";

const TABLE_META_SQL: &str = "SELECT t.name AS table_name, CAST(ep.value AS nvarchar(max)) AS table_comment \
     FROM sys.tables t \
     INNER JOIN sys.schemas s ON s.schema_id = t.schema_id \
     LEFT JOIN sys.extended_properties ep \
       ON ep.major_id = t.object_id AND ep.minor_id = 0 AND ep.name = 'MS_Description' \
     WHERE s.name = @p1 AND t.name = @p2";

const COLUMNS_SQL: &str = "SELECT c.name AS column_name, ty.name AS type_name, \
            c.max_length, c.precision, c.scale, \
            c.is_nullable, c.is_identity, c.is_computed, c.collation_name, \
            dc.definition AS default_definition, \
            CAST(ep.value AS nvarchar(max)) AS column_comment \
     FROM sys.columns c \
     INNER JOIN sys.types ty ON ty.user_type_id = c.user_type_id \
     INNER JOIN sys.tables t ON t.object_id = c.object_id \
     INNER JOIN sys.schemas s ON s.schema_id = t.schema_id \
     LEFT JOIN sys.default_constraints dc ON dc.object_id = c.default_object_id \
     LEFT JOIN sys.extended_properties ep \
       ON ep.major_id = c.object_id AND ep.minor_id = c.column_id AND ep.name = 'MS_Description' \
     WHERE s.name = @p1 AND t.name = @p2 \
     ORDER BY c.column_id";

const INDEXES_SQL: &str = "SELECT i.name AS index_name, i.is_primary_key, i.is_unique, i.type_desc, \
            col.name AS column_name, ic.key_ordinal \
     FROM sys.indexes i \
     INNER JOIN sys.index_columns ic \
       ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
     INNER JOIN sys.columns col \
       ON col.object_id = ic.object_id AND col.column_id = ic.column_id \
     INNER JOIN sys.tables t ON t.object_id = i.object_id \
     INNER JOIN sys.schemas s ON s.schema_id = t.schema_id \
     WHERE s.name = @p1 AND t.name = @p2 AND i.name IS NOT NULL \
     ORDER BY i.name, ic.key_ordinal";

const FOREIGN_KEYS_SQL: &str = "SELECT fk.name AS constraint_name, pc.name AS column_name, \
            rt.name AS referenced_table, rc.name AS referenced_column, \
            fk.delete_referential_action_desc AS on_delete, \
            fk.update_referential_action_desc AS on_update, \
            fkc.constraint_column_id AS ordinal \
     FROM sys.foreign_keys fk \
     INNER JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id \
     INNER JOIN sys.columns pc \
       ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id \
     INNER JOIN sys.tables rt ON rt.object_id = fkc.referenced_object_id \
     INNER JOIN sys.columns rc \
       ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id \
     INNER JOIN sys.tables pt ON pt.object_id = fkc.parent_object_id \
     INNER JOIN sys.schemas s ON s.schema_id = pt.schema_id \
     WHERE s.name = @p1 AND pt.name = @p2 \
     ORDER BY fk.name, fkc.constraint_column_id";

pub struct SqlServerParser {
    client: Arc<dyn CatalogClient>,
    types: TypeMap,
}

impl SqlServerParser {
    pub fn new(client: Arc<dyn CatalogClient>, types: TypeMap) -> Self {
        SqlServerParser { client, types }
    }

    fn compose_column(&self, row: &RowMap) -> Column {
        let name = get_str(row, "column_name").unwrap_or_default();
        let native = get_str(row, "type_name").unwrap_or_default();
        let column_type = self.types.canonical(DriverTag::Sqlsrv, &native);

        let mut col = Column::new(name, column_type, native.clone());
        col.nullable = get_bool(row, "is_nullable");
        // IsIdentity = 1
        col.auto_increment = get_bool(row, "is_identity");
        col.flags.computed = get_bool(row, "is_computed");

        if let Some(raw) = get_str(row, "default_definition") {
            col.default = parse_default(&raw, DriverTag::Sqlsrv);
        }

        match column_type {
            ColumnType::Decimal => {
                col.precision = get_u32(row, "precision");
                col.scale = get_u32(row, "scale");
            }
            t if t.is_textual() => {
                match get_u32(row, "max_length") {
                    // -1 is the varchar(max)/nvarchar(max) sentinel
                    None => col.flags.max_varchar = true,
                    Some(len) => {
                        // n-types store byte length, two bytes per character
                        let chars = if native.starts_with('n') { len / 2 } else { len };
                        col.length = Some(chars);
                    }
                }
            }
            _ => {}
        }

        col.collation = get_opt_str(row, "collation_name");
        col.comment = get_opt_str(row, "column_comment");
        col
    }

    fn compose_indexes(&self, rows: &[RowMap]) -> Vec<Index> {
        group_by_ordinal(rows, "index_name", "key_ordinal")
            .into_iter()
            .map(|(name, members)| {
                let first = members[0];
                let kind = if get_bool(first, "is_primary_key") {
                    IndexKind::Primary
                } else if get_bool(first, "is_unique") {
                    IndexKind::Unique
                } else if get_str(first, "type_desc").unwrap_or_default().to_uppercase() == "SPATIAL"
                {
                    IndexKind::Spatial
                } else {
                    IndexKind::Index
                };
                let columns = members
                    .iter()
                    .filter_map(|r| get_str(r, "column_name"))
                    .collect();
                Index::new(name, kind, columns)
            })
            .collect()
    }

    fn compose_foreign_keys(&self, rows: &[RowMap]) -> Vec<ForeignKey> {
        group_by_ordinal(rows, "constraint_name", "ordinal")
            .into_iter()
            .filter_map(|(name, members)| {
                let first = members[0];
                let referenced_table = get_str(first, "referenced_table")?;
                let columns = members
                    .iter()
                    .filter_map(|r| get_str(r, "column_name"))
                    .collect();
                let referenced_columns = members
                    .iter()
                    .filter_map(|r| get_str(r, "referenced_column"))
                    .collect();
                let mut fk = ForeignKey::new(name, columns, referenced_table, referenced_columns);
                fk.on_delete =
                    FkAction::from_catalog(&get_str(first, "on_delete").unwrap_or_default());
                fk.on_update =
                    FkAction::from_catalog(&get_str(first, "on_update").unwrap_or_default());
                Some(fk)
            })
            .collect()
    }
}

#[async_trait]
impl SchemaParser for SqlServerParser {
    async fn list_tables(&self, exclude: &[String]) -> Result<Vec<String>, SchemaError> {
        let schema = self.client.database_name().to_string();
        let rows = self.client.query(LIST_TABLES_SQL, &[&schema]).await?;
        Ok(rows
            .iter()
            .filter_map(|r| get_str(r, "table_name"))
            .filter(|name| !exclude.contains(name))
            .collect())
    }

    async fn parse_table(&self, name: &str) -> Result<Table, SchemaError> {
        let schema = self.client.database_name().to_string();

        let meta = self.client.query(TABLE_META_SQL, &[&schema, name]).await?;
        ensure_exists(!meta.is_empty(), name)?;

        let column_rows = self.client.query(COLUMNS_SQL, &[&schema, name]).await?;
        let index_rows = self.client.query(INDEXES_SQL, &[&schema, name]).await?;
        let fk_rows = self.client.query(FOREIGN_KEYS_SQL, &[&schema, name]).await?;

        let mut table = Table::new(name);
        table.columns = column_rows.iter().map(|r| self.compose_column(r)).collect();
        table.indexes = self.compose_indexes(&index_rows);
        table.foreign_keys = self.compose_foreign_keys(&fk_rows);
        table.comment = get_opt_str(&meta[0], "table_comment");
        table
            .attributes
            .insert("schema".to_string(), schema.clone());

        mark_primary_columns(&mut table);
        Ok(table)
    }

    async fn table_exists(&self, name: &str) -> Result<bool, SchemaError> {
        let schema = self.client.database_name().to_string();
        let rows = self.client.query(TABLE_META_SQL, &[&schema, name]).await?;
        Ok(!rows.is_empty())
    }

    fn database_name(&self) -> &str {
        self.client.database_name()
    }

    fn driver_tag(&self) -> DriverTag {
        DriverTag::Sqlsrv
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::DefaultValue;
    use crate::infrastructure::db::testing::{row, FakeCatalog};
    use serde_json::json;

    fn client() -> Arc<dyn CatalogClient> {
        let columns = vec![
            row(&[
                ("column_name", json!("id")),
                ("type_name", json!("int")),
                ("is_nullable", json!(false)),
                ("is_identity", json!(true)),
                ("is_computed", json!(false)),
            ]),
            row(&[
                ("column_name", json!("label")),
                ("type_name", json!("nvarchar")),
                ("max_length", json!(200)),
                ("is_nullable", json!(false)),
                ("is_identity", json!(false)),
                ("is_computed", json!(false)),
                ("default_definition", json!("('untitled')")),
                ("collation_name", json!("SQL_Latin1_General_CP1_CI_AS")),
            ]),
            row(&[
                ("column_name", json!("body")),
                ("type_name", json!("nvarchar")),
                ("max_length", json!(-1)),
                ("is_nullable", json!(true)),
                ("is_identity", json!(false)),
                ("is_computed", json!(false)),
            ]),
            row(&[
                ("column_name", json!("amount")),
                ("type_name", json!("decimal")),
                ("precision", json!(18)),
                ("scale", json!(4)),
                ("is_nullable", json!(false)),
                ("is_identity", json!(false)),
                ("is_computed", json!(false)),
                ("default_definition", json!("((0))")),
            ]),
            row(&[
                ("column_name", json!("owner_id")),
                ("type_name", json!("int")),
                ("is_nullable", json!(true)),
                ("is_identity", json!(false)),
                ("is_computed", json!(false)),
            ]),
        ];
        let indexes = vec![
            row(&[
                ("index_name", json!("PK_invoices")),
                ("is_primary_key", json!(true)),
                ("is_unique", json!(true)),
                ("type_desc", json!("CLUSTERED")),
                ("column_name", json!("id")),
                ("key_ordinal", json!(1)),
            ]),
            row(&[
                ("index_name", json!("IX_invoices_label")),
                ("is_primary_key", json!(false)),
                ("is_unique", json!(false)),
                ("type_desc", json!("NONCLUSTERED")),
                ("column_name", json!("label")),
                ("key_ordinal", json!(1)),
            ]),
        ];
        let fks = vec![row(&[
            ("constraint_name", json!("FK_invoices_owner")),
            ("column_name", json!("owner_id")),
            ("referenced_table", json!("owners")),
            ("referenced_column", json!("id")),
            ("on_delete", json!("SET_NULL")),
            ("on_update", json!("NO_ACTION")),
            ("ordinal", json!(1)),
        ])];
        let meta = vec![row(&[
            ("table_name", json!("invoices")),
            ("table_comment", json!("billing")),
        ])];

        Arc::new(
            FakeCatalog::new(DriverTag::Sqlsrv)
                .on("sys.default_constraints", columns)
                .on("sys.index_columns", indexes)
                .on("sys.foreign_key_columns", fks)
                .on("ep.minor_id = 0", meta),
        )
    }

    fn parser(c: Arc<dyn CatalogClient>) -> SqlServerParser {
        SqlServerParser::new(c, TypeMap::new())
    }

    #[tokio::test]
    async fn identity_column_is_auto_increment() {
        let table = parser(client()).parse_table("invoices").await.unwrap();
        assert!(table.column("id").unwrap().auto_increment);
        assert_eq!(table.column("id").unwrap().column_type, ColumnType::Integer);
    }

    #[tokio::test]
    async fn nvarchar_length_halved_and_max_flagged() {
        let table = parser(client()).parse_table("invoices").await.unwrap();
        let label = table.column("label").unwrap();
        assert_eq!(label.length, Some(100));
        assert!(!label.flags.max_varchar);
        let body = table.column("body").unwrap();
        assert_eq!(body.length, None);
        assert!(body.flags.max_varchar);
    }

    #[tokio::test]
    async fn parenthesised_defaults_unwrapped() {
        let table = parser(client()).parse_table("invoices").await.unwrap();
        assert_eq!(
            table.column("label").unwrap().default,
            Some(DefaultValue::Str("untitled".into()))
        );
        assert_eq!(
            table.column("amount").unwrap().default,
            Some(DefaultValue::Int(0))
        );
    }

    #[tokio::test]
    async fn decimal_precision_scale() {
        let table = parser(client()).parse_table("invoices").await.unwrap();
        let amount = table.column("amount").unwrap();
        assert_eq!(amount.precision, Some(18));
        assert_eq!(amount.scale, Some(4));
    }

    #[tokio::test]
    async fn descriptive_fk_actions_mapped() {
        let table = parser(client()).parse_table("invoices").await.unwrap();
        let fk = &table.foreign_keys[0];
        assert_eq!(fk.on_delete, FkAction::SetNull);
        assert_eq!(fk.on_update, FkAction::NoAction);
        assert!(table.validate().is_ok());
    }

    #[tokio::test]
    async fn primary_and_plain_indexes() {
        let table = parser(client()).parse_table("invoices").await.unwrap();
        assert_eq!(table.primary_key().unwrap().name, "PK_invoices");
        assert_eq!(table.indexes[1].kind, IndexKind::Index);
        assert_eq!(table.comment.as_deref(), Some("billing"));
    }

    #[tokio::test]
    async fn missing_table_is_table_not_found() {
        let c = Arc::new(FakeCatalog::new(DriverTag::Sqlsrv));
        let err = parser(c).parse_table("ghost").await.unwrap_err();
        assert!(matches!(err, SchemaError::TableNotFound(_)));
    }
}
