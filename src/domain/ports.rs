use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::error::SchemaError;
use crate::domain::schema::{DriverTag, Table};

/// One catalog row as a sorted map of column name → JSON value.
pub type RowMap = BTreeMap<String, Value>;

/// Port: raw access to the database catalog (implemented by SqlxCatalog).
///
/// The dialect parsers are pure consumers of this trait, so they can be
/// exercised against an in-memory fake, and the SQL Server parser works with
/// any host-supplied client even though sqlx ships no sqlsrv driver.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Run a catalog query with positional string bindings.
    async fn query(&self, sql: &str, binds: &[&str]) -> Result<Vec<RowMap>, SchemaError>;

    fn driver(&self) -> DriverTag;

    /// The connected database (MySQL/SQL Server) or namespace schema
    /// (PostgreSQL). SQLite reports `main`.
    fn database_name(&self) -> &str;
}

/// Port: dialect parser (one implementation per driver tag).
#[async_trait]
pub trait SchemaParser: Send + Sync {
    /// All base-table names except `exclude`, in catalog order.
    async fn list_tables(&self, exclude: &[String]) -> Result<Vec<String>, SchemaError>;

    /// Compose a full [`Table`] from the catalog: columns, indexes, foreign
    /// keys and table-level metadata.
    async fn parse_table(&self, name: &str) -> Result<Table, SchemaError>;

    async fn table_exists(&self, name: &str) -> Result<bool, SchemaError>;

    fn database_name(&self) -> &str;

    fn driver_tag(&self) -> DriverTag;
}

/// Port: extraction of table/column names from the existing script archive
/// (implemented by FileMigrationScanner; optional collaborator, used only
/// for drift reporting against legacy scripts).
pub trait MigrationScanner: Send + Sync {
    /// table name → column names the archive declares for it.
    fn scan(&self) -> Result<BTreeMap<String, Vec<String>>, SchemaError>;
}
