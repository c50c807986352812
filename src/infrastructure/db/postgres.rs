//! PostgreSQL schema parser.
//!
//! Columns come from `information_schema.columns` (with `udt_name` as the
//! native token), indexes and foreign keys from the `pg_catalog` tables —
//! information_schema hides the FK referential-action codes and the index
//! access method. The namespace schema scopes every query.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::error::SchemaError;
use crate::domain::ports::{CatalogClient, RowMap, SchemaParser};
use crate::domain::schema::{
    Column, ColumnType, DriverTag, FkAction, ForeignKey, Index, IndexAlgorithm, IndexKind, Table,
};
use crate::domain::types::TypeMap;
use crate::infrastructure::db::catalog_values::parse_default;
use crate::infrastructure::db::{
    ensure_exists, get_bool, get_opt_str, get_str, get_u32, group_by_ordinal, mark_primary_columns,
};

const LIST_TABLES_SQL: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
     ORDER BY table_name";

const TABLE_META_SQL: &str = "SELECT c.relname AS table_name, obj_description(c.oid) AS table_comment \
     FROM pg_catalog.pg_class c \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     WHERE n.nspname = $1 AND c.relname = $2 AND c.relkind = 'r'";

const COLUMNS_SQL: &str = "SELECT column_name, udt_name, data_type, is_nullable, column_default, is_identity, \
            character_maximum_length, numeric_precision, numeric_scale \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 \
     ORDER BY ordinal_position";

const INDEXES_SQL: &str = "SELECT i.relname AS index_name, ix.indisprimary AS is_primary, \
            ix.indisunique AS is_unique, am.amname AS algorithm, \
            a.attname AS column_name, \
            array_position(ix.indkey, a.attnum) AS ordinal \
     FROM pg_catalog.pg_class t \
     JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace \
     JOIN pg_catalog.pg_index ix ON ix.indrelid = t.oid \
     JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid \
     JOIN pg_catalog.pg_am am ON am.oid = i.relam \
     JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
     WHERE n.nspname = $1 AND t.relname = $2 \
     ORDER BY i.relname, ordinal";

const FOREIGN_KEYS_SQL: &str = "SELECT con.conname AS constraint_name, \
            src.attname AS column_name, \
            ref_cl.relname AS referenced_table, \
            ref_att.attname AS referenced_column, \
            con.confdeltype::text AS on_delete, \
            con.confupdtype::text AS on_update, \
            k.ord AS ordinal \
     FROM pg_catalog.pg_constraint con \
     JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(conkey, confkey, ord) ON true \
     JOIN pg_catalog.pg_class cl ON cl.oid = con.conrelid \
     JOIN pg_catalog.pg_namespace n ON n.oid = cl.relnamespace \
     JOIN pg_catalog.pg_attribute src ON src.attrelid = con.conrelid AND src.attnum = k.conkey \
     JOIN pg_catalog.pg_class ref_cl ON ref_cl.oid = con.confrelid \
     JOIN pg_catalog.pg_attribute ref_att ON ref_att.attrelid = con.confrelid AND ref_att.attnum = k.confkey \
     WHERE con.contype = 'f' AND n.nspname = $1 AND cl.relname = $2 \
     ORDER BY con.conname, k.ord";

const ENUM_LABELS_SQL: &str = "SELECT e.enumlabel FROM pg_catalog.pg_type t \
     JOIN pg_catalog.pg_enum e ON e.enumtypid = t.oid \
     WHERE t.typname = $1 \
     ORDER BY e.enumsortorder";

pub struct PostgresParser {
    client: Arc<dyn CatalogClient>,
    types: TypeMap,
}

impl PostgresParser {
    pub fn new(client: Arc<dyn CatalogClient>, types: TypeMap) -> Self {
        PostgresParser { client, types }
    }

    async fn compose_column(&self, row: &RowMap) -> Result<Column, SchemaError> {
        let name = get_str(row, "column_name").unwrap_or_default();
        let udt = get_str(row, "udt_name").unwrap_or_default();
        let data_type = get_str(row, "data_type").unwrap_or_default();

        let user_defined = data_type.eq_ignore_ascii_case("USER-DEFINED");
        let mut column_type = self.types.canonical(DriverTag::Pgsql, &udt);
        let mut labels = Vec::new();
        if user_defined {
            // user-defined types are enums when pg_enum knows labels for them
            labels = self
                .client
                .query(ENUM_LABELS_SQL, &[&udt])
                .await?
                .iter()
                .filter_map(|r| get_str(r, "enumlabel"))
                .collect();
            if !labels.is_empty() {
                column_type = ColumnType::Enum;
            }
        }

        let mut col = Column::new(name, column_type, udt);
        col.flags.enum_values = labels;
        col.nullable = get_bool(row, "is_nullable");

        let raw_default = get_str(row, "column_default").unwrap_or_default();
        // serial columns surface as a nextval() default on the sequence
        if raw_default.starts_with("nextval(") || get_bool(row, "is_identity") {
            col.auto_increment = true;
        } else if !raw_default.is_empty() {
            col.default = parse_default(&raw_default, DriverTag::Pgsql);
        }

        match col.column_type {
            ColumnType::Decimal => {
                col.precision = get_u32(row, "numeric_precision");
                col.scale = get_u32(row, "numeric_scale");
            }
            t if t.is_textual() => {
                col.length = get_u32(row, "character_maximum_length");
            }
            _ => {}
        }
        Ok(col)
    }

    fn compose_indexes(&self, rows: &[RowMap]) -> Vec<Index> {
        group_by_ordinal(rows, "index_name", "ordinal")
            .into_iter()
            .map(|(name, members)| {
                let first = members[0];
                let kind = if get_bool(first, "is_primary") {
                    IndexKind::Primary
                } else if get_bool(first, "is_unique") {
                    IndexKind::Unique
                } else if get_str(first, "algorithm").as_deref() == Some("gist") {
                    IndexKind::Spatial
                } else {
                    IndexKind::Index
                };
                let columns = members
                    .iter()
                    .filter_map(|r| get_str(r, "column_name"))
                    .collect();
                let mut index = Index::new(name, kind, columns);
                index.algorithm = match get_str(first, "algorithm").unwrap_or_default().as_str() {
                    "btree" => Some(IndexAlgorithm::Btree),
                    "hash" => Some(IndexAlgorithm::Hash),
                    _ => None,
                };
                index
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
impl SchemaParser for PostgresParser {
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
        for row in &column_rows {
            table.columns.push(self.compose_column(row).await?);
        }
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
        DriverTag::Pgsql
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
