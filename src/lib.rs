use std::sync::Arc;

use anyhow::Result;
use chrono::Local;

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// ─── Log level ────────────────────────────────────────────────────────────────

/// Controls the verbosity of schemly's internal tracing output.
///
/// Pass to [`init_tracing`] before calling any async entry point.
///
/// | Variant | `tracing` level | When to use                           |
/// |---------|-----------------|---------------------------------------|
/// | `Error` | `error`         | `--quiet` / CI scripting              |
/// | `Info`  | `info`          | Default — shows per-table progress    |
/// | `Debug` | `debug`         | `--verbose` — shows catalog SQL too   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    #[default]
    Info,
    Debug,
}

/// Initialise the global `tracing` subscriber for schemly.
///
/// This is a convenience wrapper around `tracing_subscriber`. It respects
/// `RUST_LOG` when set, falling back to `level` otherwise.
///
/// Call this **once** at application startup, before any schemly async
/// function. Library consumers who manage their own subscriber should skip
/// this and configure tracing themselves.
///
/// Only available when the `cli` feature is enabled (pulls in
/// `tracing-subscriber`).
#[cfg(feature = "cli")]
pub fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;

    let default_filter = match level {
        LogLevel::Error => "schemly=error",
        LogLevel::Info  => "schemly=info",
        LogLevel::Debug => "schemly=debug",
    };

    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

// ─── Public API Facade ───

pub use application::drift::{DriftReport, DriftService};
pub use application::generate::{GenerationService, MigrationOutput};
pub use domain::comparator::{compare, compare_table, MigrationDrift, SchemaDiff};
pub use domain::dependency::DependencyGraph;
pub use domain::error::SchemaError;
pub use domain::ports::{CatalogClient, MigrationScanner, SchemaParser};
pub use domain::relationships::{detect, Relationship, RelationshipKind};
pub use domain::schema::{
    Column, ColumnType, DefaultValue, DriverTag, FkAction, ForeignKey, GeneratedFile, Index,
    IndexKind, Table,
};
pub use domain::types::TypeMap;
pub use infrastructure::config::{AppConfig, ConnectionConfig, ModelsConfig};
pub use presentation::{write_files, WriteOutcome};

use crate::domain::schema::Table as SchemaTable;
use crate::infrastructure::db::client::connect;
use crate::infrastructure::db::make_parser;
use crate::infrastructure::migration_scanner::FileMigrationScanner;
use crate::presentation::migrations::{MigrationOptions, MigrationWriter};
use crate::presentation::models::{ModelOptions, ModelWriter};

// ─── Public entry points ───

/// Parse the live schema without emitting anything.
///
/// `connection` overrides the configured default; `only` restricts the
/// table set while keeping catalog order.
pub async fn preview_tables(
    cfg: &AppConfig,
    connection: Option<&str>,
    only: Option<&[String]>,
) -> Result<Vec<SchemaTable>> {
    let (service, _) = build_service(cfg, connection).await?;
    service.load_tables(&cfg.exclude_tables, only).await
}

/// Emit creation scripts for the live schema.
///
/// Unless `fresh` is set, tables the existing migration archive already
/// covers are left alone — only the new ones get files.
pub async fn generate_migrations(
    cfg: &AppConfig,
    connection: Option<&str>,
    only: Option<&[String]>,
    fresh: bool,
) -> Result<MigrationOutput> {
    let (service, _) = build_service(cfg, connection).await?;
    let mut tables = service.load_tables(&cfg.exclude_tables, only).await?;

    if !fresh {
        let scanner = FileMigrationScanner::new(&cfg.migrations_path);
        let known = domain::ports::MigrationScanner::scan(&scanner)?;
        tables.retain(|t| !known.contains_key(&t.name));
    }

    let writer = migration_writer(cfg);
    service.emit_migrations(&tables, &writer)
}

/// Emit one model stub per table.
pub async fn generate_models(
    cfg: &AppConfig,
    connection: Option<&str>,
    only: Option<&[String]>,
) -> Result<Vec<GeneratedFile>> {
    let (service, _) = build_service(cfg, connection).await?;
    let tables = service.load_tables(&cfg.exclude_tables, only).await?;
    let writer = model_writer(cfg);
    service.emit_models(&tables, &writer, cfg.features.detect_polymorphic)
}

/// Full generation: migrations plus model stubs in one pass over the schema.
pub async fn generate(
    cfg: &AppConfig,
    connection: Option<&str>,
) -> Result<(MigrationOutput, Vec<GeneratedFile>)> {
    let (service, _) = build_service(cfg, connection).await?;
    let tables = service.load_tables(&cfg.exclude_tables, None).await?;

    let migrations = service.emit_migrations(&tables, &migration_writer(cfg))?;
    let models = service.emit_models(
        &tables,
        &model_writer(cfg),
        cfg.features.detect_polymorphic,
    )?;
    Ok((migrations, models))
}

/// Compare the live schema against the existing migration archive.
pub async fn drift(cfg: &AppConfig, connection: Option<&str>) -> Result<DriftReport> {
    let (service, driver) = build_service(cfg, connection).await?;
    let tables = service.load_tables(&cfg.exclude_tables, None).await?;
    let scanner = FileMigrationScanner::new(&cfg.migrations_path);
    DriftService::new().against_migrations(&tables, &scanner, driver)
}

// ─── Private helpers ───────────────────────────────────────────────────────────

/// Connect, pick the dialect parser by driver tag, wrap in the service.
async fn build_service(
    cfg: &AppConfig,
    connection: Option<&str>,
) -> Result<(GenerationService, DriverTag)> {
    let conn = cfg.active_connection(connection)?;
    let client = connect(conn).await?;
    let driver = CatalogClient::driver(&client);
    let parser = make_parser(Arc::new(client), cfg.type_map());
    Ok((GenerationService::new(Arc::from(parser)), driver))
}

fn migration_writer(cfg: &AppConfig) -> MigrationWriter {
    MigrationWriter::new(
        cfg.type_map(),
        MigrationOptions {
            separate_foreign_keys: cfg.features.separate_foreign_keys,
            indent: cfg.formatting.indent_str(),
            sort_imports: cfg.formatting.sort_imports,
        },
        Local::now().naive_local(),
    )
}

fn model_writer(cfg: &AppConfig) -> ModelWriter {
    ModelWriter::new(
        cfg.type_map(),
        ModelOptions {
            namespace: cfg.models.namespace.clone(),
            base_class: cfg.models.base_class.clone(),
            generate_relationships: cfg.models.generate_relationships,
            generate_scopes: cfg.models.generate_scopes,
            use_fillable: cfg.models.use_fillable,
            guarded_columns: cfg.models.guarded_columns.clone(),
            indent: cfg.formatting.indent_str(),
        },
    )
}
