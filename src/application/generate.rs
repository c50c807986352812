use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::dependency::DependencyGraph;
use crate::domain::ports::SchemaParser;
use crate::domain::relationships::detect;
use crate::domain::schema::{GeneratedFile, Table};
use crate::presentation::migrations::MigrationWriter;
use crate::presentation::models::ModelWriter;

// ─── Generation Service ───

pub struct GenerationService {
    parser: Arc<dyn SchemaParser>,
}

/// Result of a migration emission, with any FK cycles that were degraded to
/// FK-only files so the caller can report them.
#[derive(Debug, Serialize)]
pub struct MigrationOutput {
    pub files: Vec<GeneratedFile>,
    pub cycles: Vec<Vec<String>>,
}

impl GenerationService {
    pub fn new(parser: Arc<dyn SchemaParser>) -> Self {
        Self { parser }
    }

    /// List and parse every table, in catalog order.
    ///
    /// `parse_table` calls are independent reads, so they fan out on the
    /// runtime; results are collected in spawn order, which restores the
    /// catalog order before anything downstream runs.
    pub async fn load_tables(
        &self,
        exclude: &[String],
        only: Option<&[String]>,
    ) -> Result<Vec<Table>> {
        let names = self.parser.list_tables(exclude).await?;
        let names: Vec<String> = match only {
            Some(wanted) => names
                .into_iter()
                .filter(|n| wanted.iter().any(|w| w == n))
                .collect(),
            None => names,
        };
        debug!("Parsing {} tables", names.len());

        let mut handles = Vec::with_capacity(names.len());
        for name in names {
            let parser = Arc::clone(&self.parser);
            handles.push(tokio::spawn(async move {
                parser.parse_table(&name).await
            }));
        }

        let mut tables = Vec::with_capacity(handles.len());
        for h in handles {
            tables.push(h.await??);
        }
        Ok(tables)
    }

    /// Order the tables and emit creation scripts.
    ///
    /// A cyclic FK graph is not fatal here: the writer receives the cycle
    /// membership and defers every in-cycle edge to an FK-only file, so
    /// table creation succeeds and the ring closes afterwards.
    pub fn emit_migrations(
        &self,
        tables: &[Table],
        writer: &MigrationWriter,
    ) -> Result<MigrationOutput> {
        let graph = DependencyGraph::new(tables);
        let cycles = graph.detect_cycles();
        if !cycles.is_empty() {
            warn!(
                "Detected {} FK cycle(s); deferring in-cycle edges to FK-only files",
                cycles.len()
            );
        }
        let cycle_members: HashSet<String> = cycles.iter().flatten().cloned().collect();
        let ordered = graph.sorted_best_effort();
        let files = writer.generate(&ordered, &cycle_members)?;
        Ok(MigrationOutput { files, cycles })
    }

    /// Emit one model stub per table, relationships from the detector.
    pub fn emit_models(
        &self,
        tables: &[Table],
        writer: &ModelWriter,
        detect_polymorphic: bool,
    ) -> Result<Vec<GeneratedFile>> {
        let mut files = Vec::with_capacity(tables.len());
        for table in tables {
            let relationships = detect(table, tables, detect_polymorphic);
            files.push(writer.generate(table, &relationships)?);
        }
        Ok(files)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
