//! Structural diff between schema sets.
//!
//! Direct mode compares two in-memory schemas table by table. The
//! migration-aware mode is deliberately coarser: it only knows the table and
//! column names the migration scanner could extract from the script archive.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::schema::{Column, Table};

// ─────────────────────────────────────────────────────────────────────────────
// Result types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SchemaDiff {
    /// Tables present in the source set only (would be created on the target).
    pub created: Vec<String>,
    /// Tables present in the target set only.
    pub dropped: Vec<String>,
    /// Tables present in both but structurally different.
    pub modified: Vec<TableChanges>,
}

impl SchemaDiff {
    pub fn is_in_sync(&self) -> bool {
        self.created.is_empty() && self.dropped.is_empty() && self.modified.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableChanges {
    pub table: String,
    pub columns: ColumnChanges,
    pub indexes: NamedChanges,
    pub foreign_keys: NamedChanges,
}

impl TableChanges {
    pub fn is_empty(&self) -> bool {
        self.columns.added.is_empty()
            && self.columns.dropped.is_empty()
            && self.columns.modified.is_empty()
            && self.indexes.added.is_empty()
            && self.indexes.dropped.is_empty()
            && self.foreign_keys.added.is_empty()
            && self.foreign_keys.dropped.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ColumnChanges {
    pub added: Vec<String>,
    pub dropped: Vec<String>,
    pub modified: Vec<ColumnChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnChange {
    pub column: String,
    /// field name → before/after pair. Fields compared: type, nullable,
    /// default, length, precision, scale.
    pub changes: BTreeMap<String, ChangePair>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangePair {
    pub before: Value,
    pub after: Value,
}

/// Index/FK drift is matched by name only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NamedChanges {
    pub added: Vec<String>,
    pub dropped: Vec<String>,
}

/// Migration-aware drift: the scanner extraction only carries names, so the
/// comparison is name-presence, nothing structural.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationDrift {
    pub new: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

impl MigrationDrift {
    pub fn is_in_sync(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Direct mode
// ─────────────────────────────────────────────────────────────────────────────

/// Diff two schema sets. `created` lists tables only in `source`, `dropped`
/// tables only in `target`; the intersection goes through [`compare_table`].
pub fn compare(source: &[Table], target: &[Table]) -> SchemaDiff {
    let created = source
        .iter()
        .filter(|t| !target.iter().any(|o| o.name == t.name))
        .map(|t| t.name.clone())
        .collect();
    let dropped = target
        .iter()
        .filter(|t| !source.iter().any(|o| o.name == t.name))
        .map(|t| t.name.clone())
        .collect();

    let mut modified = Vec::new();
    for t in source {
        if let Some(other) = target.iter().find(|o| o.name == t.name) {
            let changes = compare_table(t, other);
            if !changes.is_empty() {
                modified.push(changes);
            }
        }
    }

    SchemaDiff {
        created,
        dropped,
        modified,
    }
}

/// Per-table diff: column add/drop/modify plus index and FK add/drop by name.
pub fn compare_table(source: &Table, target: &Table) -> TableChanges {
    let mut columns = ColumnChanges::default();
    for col in &source.columns {
        match target.column(&col.name) {
            None => columns.added.push(col.name.clone()),
            Some(other) => {
                let changes = column_field_changes(col, other);
                if !changes.is_empty() {
                    columns.modified.push(ColumnChange {
                        column: col.name.clone(),
                        changes,
                    });
                }
            }
        }
    }
    for col in &target.columns {
        if source.column(&col.name).is_none() {
            columns.dropped.push(col.name.clone());
        }
    }

    let indexes = NamedChanges {
        added: source
            .indexes
            .iter()
            .filter(|i| !target.indexes.iter().any(|o| o.name == i.name))
            .map(|i| i.name.clone())
            .collect(),
        dropped: target
            .indexes
            .iter()
            .filter(|i| !source.indexes.iter().any(|o| o.name == i.name))
            .map(|i| i.name.clone())
            .collect(),
    };

    let foreign_keys = NamedChanges {
        added: source
            .foreign_keys
            .iter()
            .filter(|f| !target.foreign_keys.iter().any(|o| o.name == f.name))
            .map(|f| f.name.clone())
            .collect(),
        dropped: target
            .foreign_keys
            .iter()
            .filter(|f| !source.foreign_keys.iter().any(|o| o.name == f.name))
            .map(|f| f.name.clone())
            .collect(),
    };

    TableChanges {
        table: source.name.clone(),
        columns,
        indexes,
        foreign_keys,
    }
}

fn column_field_changes(source: &Column, target: &Column) -> BTreeMap<String, ChangePair> {
    let mut changes = BTreeMap::new();
    let mut record = |field: &str, before: Value, after: Value| {
        if before != after {
            changes.insert(field.to_string(), ChangePair { before, after });
        }
    };

    record(
        "type",
        json!(target.column_type),
        json!(source.column_type),
    );
    record("nullable", json!(target.nullable), json!(source.nullable));
    record("default", json!(target.default), json!(source.default));
    record("length", json!(target.length), json!(source.length));
    record("precision", json!(target.precision), json!(source.precision));
    record("scale", json!(target.scale), json!(source.scale));
    changes
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration-aware mode
// ─────────────────────────────────────────────────────────────────────────────

/// Compare the live schema with the scanner's extraction of the script
/// archive. A table counts as modified when any live column is missing from
/// the extraction or vice versa.
pub fn compare_with_migrations(
    tables: &[Table],
    scanned: &BTreeMap<String, Vec<String>>,
) -> MigrationDrift {
    let new = tables
        .iter()
        .filter(|t| !scanned.contains_key(&t.name))
        .map(|t| t.name.clone())
        .collect();

    let removed = scanned
        .keys()
        .filter(|name| !tables.iter().any(|t| &t.name == *name))
        .cloned()
        .collect();

    let mut modified = Vec::new();
    for table in tables {
        let Some(known_cols) = scanned.get(&table.name) else {
            continue;
        };
        let live_missing = table
            .columns
            .iter()
            .any(|c| !known_cols.contains(&c.name));
        let scanned_missing = known_cols
            .iter()
            .any(|name| !table.has_column(name));
        if live_missing || scanned_missing {
            modified.push(table.name.clone());
        }
    }

    MigrationDrift {
        new,
        modified,
        removed,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
