use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tracing::debug;

use crate::domain::error::SchemaError;
use crate::domain::ports::{CatalogClient, RowMap};
use crate::domain::schema::DriverTag;
use crate::infrastructure::config::ConnectionConfig;
use crate::infrastructure::db::row_mapper::row_to_map;

/// sqlx-backed [`CatalogClient`] for the drivers sqlx ships (MySQL/MariaDB,
/// PostgreSQL, SQLite). SQL Server hosts plug in their own client — the
/// parser only sees the trait.
pub struct SqlxCatalog {
    pool: AnyPool,
    driver: DriverTag,
    database: String,
}

/// Connect to the database described in `cfg` and return a `SqlxCatalog`.
pub async fn connect(cfg: &ConnectionConfig) -> Result<SqlxCatalog> {
    sqlx::any::install_default_drivers();

    let driver = DriverTag::parse(&cfg.driver)?;

    let pool = AnyPoolOptions::new()
        .max_connections(5)
        .connect(&cfg.url())
        .await
        .with_context(|| {
            format!(
                "Failed to connect to {} (driver: {})",
                cfg.dbname, cfg.driver
            )
        })?;

    debug!(
        "Connected to {}/{} via {} driver",
        cfg.host, cfg.dbname, cfg.driver
    );

    // PostgreSQL parsers scope catalog queries by namespace schema, the
    // others by database name.
    let database = match driver {
        DriverTag::Pgsql => cfg.schema.clone(),
        DriverTag::Sqlite => "main".to_string(),
        _ => cfg.dbname.clone(),
    };

    Ok(SqlxCatalog {
        pool,
        driver,
        database,
    })
}

#[async_trait]
impl CatalogClient for SqlxCatalog {
    async fn query(&self, sql: &str, binds: &[&str]) -> Result<Vec<RowMap>, SchemaError> {
        debug!("Executing catalog query: {}", sql);

        let mut query = sqlx::query(sql);
        for bind in binds {
            query = query.bind(*bind);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SchemaError::query_failed(sql, e))?;

        let mut result = Vec::with_capacity(rows.len());
        for row in &rows {
            let map = row_to_map(row).map_err(|e| SchemaError::query_failed(sql, e))?;
            result.push(map);
        }
        Ok(result)
    }

    fn driver(&self) -> DriverTag {
        self.driver
    }

    fn database_name(&self) -> &str {
        &self.database
    }
}
