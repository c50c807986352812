//! Relationship inference from the FK graph plus column-name conventions.
//!
//! For a table T the detector emits, in this fixed order: owns-one
//! (belongsTo) for T's own FKs; referred-to (hasOne/hasMany) for FKs in
//! other tables targeting T; many-to-many (belongsToMany) through pivot
//! tables; polymorphic (morphTo) from `X_type`/`X_id` column pairs. Within
//! each group the order follows the input order of FKs and tables.

use serde::Serialize;

use crate::domain::dependency::DependencyGraph;
use crate::domain::naming;
use crate::domain::schema::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipKind {
    BelongsTo,
    HasOne,
    HasMany,
    BelongsToMany,
    MorphTo,
}

/// One inferred relationship. Key fields are `Some` only when they deviate
/// from convention, so the stub emitter can omit redundant arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    pub kind: RelationshipKind,
    /// Method-name hint (camel-cased).
    pub method: String,
    /// Referenced-entity hint — the related class name. Empty for morphTo.
    pub related: String,
    /// Local/foreign key when it deviates from `<related_singular>_id`.
    pub foreign_key: Option<String>,
    /// Referenced column when it deviates from `id`.
    pub owner_key: Option<String>,
    pub pivot_table: Option<String>,
    /// Pivot payload columns (pivot columns minus keys, id and timestamps).
    pub pivot_columns: Vec<String>,
    pub morph_type_column: Option<String>,
    pub morph_id_column: Option<String>,
    pub self_referencing: bool,
}

impl Relationship {
    fn new(kind: RelationshipKind, method: impl Into<String>, related: impl Into<String>) -> Self {
        Relationship {
            kind,
            method: method.into(),
            related: related.into(),
            foreign_key: None,
            owner_key: None,
            pivot_table: None,
            pivot_columns: Vec::new(),
            morph_type_column: None,
            morph_id_column: None,
            self_referencing: false,
        }
    }
}

/// Detect every relationship of `table` against the full set.
///
/// `detect_polymorphic` gates the `X_type`/`X_id` convention scan
/// (`features.detect_polymorphic`).
pub fn detect(table: &Table, all: &[Table], detect_polymorphic: bool) -> Vec<Relationship> {
    let graph = DependencyGraph::new(all);
    let mut rels = Vec::new();

    // ── owns-one: every FK of T whose target exists in the set ──
    for fk in &table.foreign_keys {
        let Some(target) = all.iter().find(|t| t.name == fk.referenced_table) else {
            continue;
        };
        let local = &fk.columns[0];
        let mut rel = Relationship::new(
            RelationshipKind::BelongsTo,
            naming::relation_name_from_fk(local),
            naming::table_to_model(&target.name),
        );
        if *local != naming::conventional_fk(&target.name) {
            rel.foreign_key = Some(local.clone());
        }
        if fk.referenced_columns[0] != "id" {
            rel.owner_key = Some(fk.referenced_columns[0].clone());
        }
        rel.self_referencing = fk.is_self_referencing(&table.name);
        rels.push(rel);
    }

    // ── referred-to: FKs elsewhere that target T ──
    for other in all {
        if other.name == table.name {
            continue;
        }
        // A pivot joining T to some other table subsumes the plain hasMany.
        if graph.is_pivot(other) && pivot_partner(other, table).is_some() {
            continue;
        }
        for fk in &other.foreign_keys {
            if fk.referenced_table != table.name {
                continue;
            }
            let local = &fk.columns[0];
            let singular = other.has_unique_on(local);
            let (kind, method) = if singular {
                (
                    RelationshipKind::HasOne,
                    naming::camel_case(&naming::singularize(&other.name)),
                )
            } else {
                (
                    RelationshipKind::HasMany,
                    naming::camel_case(&naming::pluralize(&other.name)),
                )
            };
            let mut rel = Relationship::new(kind, method, naming::table_to_model(&other.name));
            if *local != naming::conventional_fk(&table.name) {
                rel.foreign_key = Some(local.clone());
            }
            if fk.referenced_columns[0] != "id" {
                rel.owner_key = Some(fk.referenced_columns[0].clone());
            }
            rels.push(rel);
        }
    }

    // ── many-to-many: pivots with one FK at T and the other at R ≠ T ──
    for pivot in all {
        if !graph.is_pivot(pivot) {
            continue;
        }
        let Some((to_self, to_other)) = pivot_partner(pivot, table) else {
            continue;
        };
        let Some(related) = all.iter().find(|t| t.name == to_other.referenced_table) else {
            continue;
        };
        let mut rel = Relationship::new(
            RelationshipKind::BelongsToMany,
            naming::camel_case(&naming::pluralize(&related.name)),
            naming::table_to_model(&related.name),
        );
        rel.pivot_table = Some(pivot.name.clone());
        if to_self.columns[0] != naming::conventional_fk(&table.name) {
            rel.foreign_key = Some(to_self.columns[0].clone());
        }
        if to_other.columns[0] != naming::conventional_fk(&related.name) {
            rel.owner_key = Some(to_other.columns[0].clone());
        }
        let key_columns: Vec<&str> = pivot
            .foreign_keys
            .iter()
            .flat_map(|fk| fk.columns.iter().map(|c| c.as_str()))
            .collect();
        rel.pivot_columns = pivot
            .columns
            .iter()
            .map(|c| c.name.clone())
            .filter(|name| {
                !key_columns.contains(&name.as_str())
                    && !matches!(name.as_str(), "id" | "created_at" | "updated_at")
            })
            .collect();
        rels.push(rel);
    }

    // ── polymorphic: X_type + X_id column pairs ──
    if detect_polymorphic {
        for col in &table.columns {
            let Some(base) = col.name.strip_suffix("_type") else {
                continue;
            };
            let id_name = format!("{base}_id");
            if !table.has_column(&id_name) {
                continue;
            }
            let mut rel =
                Relationship::new(RelationshipKind::MorphTo, naming::camel_case(base), "");
            rel.morph_type_column = Some(col.name.clone());
            rel.morph_id_column = Some(id_name);
            rels.push(rel);
        }
    }

    rels
}

/// When `pivot` has exactly one FK targeting `table` and another targeting a
/// different table, return `(fk_to_table, fk_to_other)`.
fn pivot_partner<'a>(
    pivot: &'a Table,
    table: &Table,
) -> Option<(&'a crate::domain::schema::ForeignKey, &'a crate::domain::schema::ForeignKey)> {
    if pivot.foreign_keys.len() != 2 {
        return None;
    }
    let (a, b) = (&pivot.foreign_keys[0], &pivot.foreign_keys[1]);
    if a.referenced_table == table.name && b.referenced_table != table.name {
        Some((a, b))
    } else if b.referenced_table == table.name && a.referenced_table != table.name {
        Some((b, a))
    } else {
        None
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
