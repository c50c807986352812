//! Lexical scanner for the existing migration archive.
//!
//! Walks `migrations_path` and extracts, per `Schema::create('…')` block,
//! the column names passed as the first string argument of a builder call.
//! This is a text scan, not a parser: columns introduced by argument-less
//! helper directives (`timestamps()`, `softDeletes()`, `rememberToken()`,
//! `id()`) are invisible to it — a known limitation of the drift check,
//! kept as-is.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::error::SchemaError;
use crate::domain::ports::MigrationScanner;

static CREATE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"Schema::create\(\s*'([A-Za-z0-9_]+)'"#).unwrap()
});

static COLUMN_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\$table->[A-Za-z]+\(\s*'([A-Za-z0-9_]+)'"#).unwrap()
});

pub struct FileMigrationScanner {
    path: PathBuf,
}

impl FileMigrationScanner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileMigrationScanner { path: path.into() }
    }

    /// Extract tables and columns from a single migration source.
    fn scan_source(source: &str, into: &mut BTreeMap<String, Vec<String>>) {
        // Split on create calls so each block's column calls attach to the
        // right table; multiple creates per file are rare but legal.
        let mut creates: Vec<(usize, String)> = CREATE_BLOCK
            .captures_iter(source)
            .filter_map(|cap| {
                let m = cap.get(0)?;
                Some((m.start(), cap[1].to_string()))
            })
            .collect();
        creates.sort_by_key(|(pos, _)| *pos);

        for (i, (start, table)) in creates.iter().enumerate() {
            let end = creates
                .get(i + 1)
                .map(|(pos, _)| *pos)
                .unwrap_or(source.len());
            let block = &source[*start..end];

            let columns = into.entry(table.clone()).or_default();
            for cap in COLUMN_CALL.captures_iter(block) {
                let column = cap[1].to_string();
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }
    }
}

impl MigrationScanner for FileMigrationScanner {
    fn scan(&self) -> Result<BTreeMap<String, Vec<String>>, SchemaError> {
        let mut result = BTreeMap::new();
        if !self.path.exists() {
            debug!("Migration path {} does not exist; nothing to scan", self.path.display());
            return Ok(result);
        }

        let entries = fs::read_dir(&self.path).map_err(|e| {
            SchemaError::query_failed(format!("read_dir {}", self.path.display()), e)
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|e| e == "php").unwrap_or(false))
            .collect();
        // lexical order = emission order, so later files win on duplicates
        files.sort();

        for file in files {
            let source = fs::read_to_string(&file).map_err(|e| {
                SchemaError::query_failed(format!("read {}", file.display()), e)
            })?;
            Self::scan_source(&source, &mut result);
        }
        Ok(result)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
