//! MySQL / MariaDB schema parser.
//!
//! Everything comes from `information_schema`, scoped by the connected
//! database. `COLUMN_TYPE` (not `DATA_TYPE`) is kept as the native string —
//! it carries the display width, the unsigned marker and the enum value
//! list.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::error::SchemaError;
use crate::domain::ports::{CatalogClient, RowMap, SchemaParser};
use crate::domain::schema::{
    Column, ColumnType, DriverTag, FkAction, ForeignKey, Index, IndexAlgorithm, IndexKind, Table,
};
use crate::domain::types::TypeMap;
use crate::infrastructure::db::catalog_values::{enum_values, is_unsigned, parse_default, type_params};
use crate::infrastructure::db::{
    ensure_exists, get_bool, get_opt_str, get_str, get_u32, group_by_ordinal, mark_primary_columns,
};

const LIST_TABLES_SQL: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_schema = ? AND table_type = 'BASE TABLE' \
     ORDER BY table_name";

const TABLE_META_SQL: &str = "SELECT engine, table_collation, table_comment \
     FROM information_schema.tables \
     WHERE table_schema = ? AND table_name = ? AND table_type = 'BASE TABLE'";

const COLUMNS_SQL: &str = "SELECT column_name, column_type, data_type, is_nullable, column_default, extra, \
            character_maximum_length, numeric_precision, numeric_scale, \
            character_set_name, collation_name, column_comment \
     FROM information_schema.columns \
     WHERE table_schema = ? AND table_name = ? \
     ORDER BY ordinal_position";

const INDEXES_SQL: &str = "SELECT index_name, non_unique, seq_in_index, column_name, index_type \
     FROM information_schema.statistics \
     WHERE table_schema = ? AND table_name = ? \
     ORDER BY index_name, seq_in_index";

const FOREIGN_KEYS_SQL: &str = "SELECT kcu.constraint_name, kcu.column_name, kcu.ordinal_position, \
            kcu.referenced_table_name, kcu.referenced_column_name, \
            rc.delete_rule, rc.update_rule \
     FROM information_schema.key_column_usage kcu \
     JOIN information_schema.referential_constraints rc \
       ON rc.constraint_schema = kcu.constraint_schema \
      AND rc.constraint_name = kcu.constraint_name \
     WHERE kcu.table_schema = ? AND kcu.table_name = ? \
       AND kcu.referenced_table_name IS NOT NULL \
     ORDER BY kcu.constraint_name, kcu.ordinal_position";

pub struct MySqlParser {
    client: Arc<dyn CatalogClient>,
    types: TypeMap,
}

impl MySqlParser {
    pub fn new(client: Arc<dyn CatalogClient>, types: TypeMap) -> Self {
        MySqlParser { client, types }
    }

    fn compose_column(&self, row: &RowMap) -> Column {
        let name = get_str(row, "column_name").unwrap_or_default();
        let native = get_str(row, "column_type").unwrap_or_default();
        let column_type = self.types.canonical(DriverTag::Mysql, &native);

        let mut col = Column::new(name, column_type, native.clone());
        col.nullable = get_bool(row, "is_nullable");
        col.unsigned = is_unsigned(&native);

        let extra = get_str(row, "extra").unwrap_or_default().to_lowercase();
        col.auto_increment = extra.contains("auto_increment");
        col.flags.computed = extra.contains("generated");

        if let Some(raw) = get_str(row, "column_default") {
            col.default = parse_default(&raw, DriverTag::Mysql);
        }

        match column_type {
            ColumnType::Enum | ColumnType::Set => {
                col.flags.enum_values = enum_values(&native);
            }
            ColumnType::Decimal => {
                col.precision = get_u32(row, "numeric_precision");
                col.scale = get_u32(row, "numeric_scale");
            }
            t if t.is_textual() => {
                col.length = get_u32(row, "character_maximum_length")
                    .or_else(|| type_params(&native).0);
            }
            _ => {}
        }

        col.charset = get_opt_str(row, "character_set_name");
        col.collation = get_opt_str(row, "collation_name");
        col.comment = get_opt_str(row, "column_comment");
        col
    }

    fn compose_indexes(&self, rows: &[RowMap]) -> Vec<Index> {
        group_by_ordinal(rows, "index_name", "seq_in_index")
            .into_iter()
            .map(|(name, members)| {
                let first = members[0];
                let kind = if name == "PRIMARY" {
                    IndexKind::Primary
                } else {
                    match get_str(first, "index_type").unwrap_or_default().to_uppercase().as_str() {
                        "FULLTEXT" => IndexKind::Fulltext,
                        "SPATIAL" => IndexKind::Spatial,
                        _ if !get_bool(first, "non_unique") => IndexKind::Unique,
                        _ => IndexKind::Index,
                    }
                };
                let columns = members
                    .iter()
                    .filter_map(|r| get_str(r, "column_name"))
                    .collect();
                let mut index = Index::new(name, kind, columns);
                index.algorithm = match get_str(first, "index_type").unwrap_or_default().to_uppercase().as_str() {
                    "BTREE" => Some(IndexAlgorithm::Btree),
                    "HASH" => Some(IndexAlgorithm::Hash),
                    _ => None,
                };
                index
            })
            .collect()
    }

    fn compose_foreign_keys(&self, rows: &[RowMap]) -> Vec<ForeignKey> {
        group_by_ordinal(rows, "constraint_name", "ordinal_position")
            .into_iter()
            .filter_map(|(name, members)| {
                let first = members[0];
                let referenced_table = get_str(first, "referenced_table_name")?;
                let columns = members
                    .iter()
                    .filter_map(|r| get_str(r, "column_name"))
                    .collect();
                let referenced_columns = members
                    .iter()
                    .filter_map(|r| get_str(r, "referenced_column_name"))
                    .collect();
                let mut fk = ForeignKey::new(name, columns, referenced_table, referenced_columns);
                fk.on_delete =
                    FkAction::from_catalog(&get_str(first, "delete_rule").unwrap_or_default());
                fk.on_update =
                    FkAction::from_catalog(&get_str(first, "update_rule").unwrap_or_default());
                Some(fk)
            })
            .collect()
    }
}

#[async_trait]
impl SchemaParser for MySqlParser {
    async fn list_tables(&self, exclude: &[String]) -> Result<Vec<String>, SchemaError> {
        let db = self.client.database_name().to_string();
        let rows = self.client.query(LIST_TABLES_SQL, &[&db]).await?;
        Ok(rows
            .iter()
            .filter_map(|r| get_str(r, "table_name"))
            .filter(|name| !exclude.contains(name))
            .collect())
    }

    async fn parse_table(&self, name: &str) -> Result<Table, SchemaError> {
        let db = self.client.database_name().to_string();

        let meta = self.client.query(TABLE_META_SQL, &[&db, name]).await?;
        ensure_exists(!meta.is_empty(), name)?;

        let column_rows = self.client.query(COLUMNS_SQL, &[&db, name]).await?;
        let index_rows = self.client.query(INDEXES_SQL, &[&db, name]).await?;
        let fk_rows = self.client.query(FOREIGN_KEYS_SQL, &[&db, name]).await?;

        let mut table = Table::new(name);
        table.columns = column_rows.iter().map(|r| self.compose_column(r)).collect();
        table.indexes = self.compose_indexes(&index_rows);
        table.foreign_keys = self.compose_foreign_keys(&fk_rows);

        let meta_row = &meta[0];
        table.engine = get_opt_str(meta_row, "engine");
        table.collation = get_opt_str(meta_row, "table_collation");
        // charset is the collation prefix: utf8mb4_unicode_ci → utf8mb4
        table.charset = table
            .collation
            .as_ref()
            .and_then(|c| c.split('_').next())
            .map(|s| s.to_string());
        table.comment = get_opt_str(meta_row, "table_comment");

        mark_primary_columns(&mut table);
        Ok(table)
    }

    async fn table_exists(&self, name: &str) -> Result<bool, SchemaError> {
        let db = self.client.database_name().to_string();
        let rows = self.client.query(TABLE_META_SQL, &[&db, name]).await?;
        Ok(!rows.is_empty())
    }

    fn database_name(&self) -> &str {
        self.client.database_name()
    }

    fn driver_tag(&self) -> DriverTag {
        DriverTag::Mysql
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
