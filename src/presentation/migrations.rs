//! Creation-script emitter.
//!
//! Produces one timestamped migration file per table in the order the
//! dependency engine decided, plus optional FK-only files placed after all
//! creation files. The filename clock starts at the injected timestamp and
//! advances one second per file, so lexical order equals emission order and
//! the output is byte-identical for identical inputs and start time.

use std::collections::HashSet;
use std::fmt::Write as FmtWrite;

use anyhow::Result;
use chrono::{Duration, NaiveDateTime};

use crate::domain::schema::{
    Column, ColumnType, DefaultValue, ForeignKey, GeneratedFile, Index, IndexKind, Table,
};
use crate::domain::types::TypeMap;

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub separate_foreign_keys: bool,
    pub indent: String,
    pub sort_imports: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        MigrationOptions {
            separate_foreign_keys: false,
            indent: "    ".to_string(),
            sort_imports: true,
        }
    }
}

pub struct MigrationWriter {
    types: TypeMap,
    options: MigrationOptions,
    start: NaiveDateTime,
}

impl MigrationWriter {
    pub fn new(types: TypeMap, options: MigrationOptions, start: NaiveDateTime) -> Self {
        MigrationWriter {
            types,
            options,
            start,
        }
    }

    /// Emit creation files for `ordered` (already topologically sorted) and
    /// FK-only files afterwards. `cycle_members` holds tables caught in an
    /// FK cycle: edges between two of them are always deferred to FK-only
    /// files so the creation scripts stay runnable and the ring closes after
    /// every table exists.
    pub fn generate(
        &self,
        ordered: &[&Table],
        cycle_members: &HashSet<String>,
    ) -> Result<Vec<GeneratedFile>> {
        let mut files = Vec::new();
        let mut clock = self.start;

        let mut deferred: Vec<(&Table, Vec<&ForeignKey>)> = Vec::new();

        for &table in ordered {
            let (inline, defer): (Vec<&ForeignKey>, Vec<&ForeignKey>) =
                table.foreign_keys.iter().partition(|fk| {
                    !self.options.separate_foreign_keys
                        && !(cycle_members.contains(&table.name)
                            && cycle_members.contains(&fk.referenced_table))
                });
            if !defer.is_empty() {
                deferred.push((table, defer));
            }

            let filename = format!(
                "{}_create_{}_table.php",
                clock.format("%Y_%m_%d_%H%M%S"),
                table.name
            );
            files.push(GeneratedFile::new(filename, self.create_body(table, &inline)?));
            clock += Duration::seconds(1);
        }

        for (table, fks) in deferred {
            let filename = format!(
                "{}_add_foreign_keys_to_{}_table.php",
                clock.format("%Y_%m_%d_%H%M%S"),
                table.name
            );
            files.push(GeneratedFile::new(filename, self.fk_body(table, &fks)?));
            clock += Duration::seconds(1);
        }

        Ok(files)
    }

    // ── File bodies ─────────────────────────────────────────────────────────

    fn create_body(&self, table: &Table, inline_fks: &[&ForeignKey]) -> Result<String> {
        let i = &self.options.indent;
        let mut lines: Vec<String> = Vec::new();

        if let Some(comment) = &table.comment {
            lines.push(format!("$table->comment('{}');", escape(comment)));
        }

        for col in &table.columns {
            if self.is_condensed_column(table, col) {
                continue;
            }
            lines.push(self.column_definition(col));
        }

        if table.has_timestamps() {
            lines.push("$table->timestamps();".to_string());
        }
        if table.has_soft_deletes() {
            lines.push("$table->softDeletes();".to_string());
        }

        // explicit primary directive when the identity short-form does not
        // already cover it
        if let Some(pk) = table.primary_key() {
            let covered = pk.columns.len() == 1
                && table
                    .column(&pk.columns[0])
                    .map(|c| c.auto_increment)
                    .unwrap_or(false);
            if !covered {
                lines.push(format!("$table->primary({});", column_list(&pk.columns)));
            }
        }

        for index in &table.indexes {
            if index.kind == IndexKind::Primary {
                continue;
            }
            lines.push(self.index_definition(table, index));
        }

        for fk in inline_fks {
            lines.push(self.foreign_definition(table, fk));
        }

        let mut up = String::new();
        writeln!(
            up,
            "{i}{i}Schema::create('{}', function (Blueprint $table) {{",
            table.name
        )?;
        for line in &lines {
            writeln!(up, "{i}{i}{i}{line}")?;
        }
        writeln!(up, "{i}{i}}});")?;

        let down = format!("{i}{i}Schema::dropIfExists('{}');\n", table.name);

        let needs_db = up.contains("DB::raw(");
        Ok(self.wrap_migration(&up, &down, needs_db))
    }

    fn fk_body(&self, table: &Table, fks: &[&ForeignKey]) -> Result<String> {
        let i = &self.options.indent;

        let mut up = String::new();
        writeln!(
            up,
            "{i}{i}Schema::table('{}', function (Blueprint $table) {{",
            table.name
        )?;
        for fk in fks {
            writeln!(up, "{i}{i}{i}{}", self.foreign_definition(table, fk))?;
        }
        writeln!(up, "{i}{i}}});")?;

        let mut down = String::new();
        writeln!(
            down,
            "{i}{i}Schema::table('{}', function (Blueprint $table) {{",
            table.name
        )?;
        for fk in fks {
            // dropped by local columns, not by constraint name
            writeln!(
                down,
                "{i}{i}{i}$table->dropForeign([{}]);",
                fk.columns
                    .iter()
                    .map(|c| format!("'{c}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
        }
        writeln!(down, "{i}{i}}});")?;

        Ok(self.wrap_migration(&up, &down, false))
    }

    fn wrap_migration(&self, up: &str, down: &str, needs_db: bool) -> String {
        let i = &self.options.indent;

        let mut imports = vec![
            "Illuminate\\Database\\Migrations\\Migration",
            "Illuminate\\Database\\Schema\\Blueprint",
            "Illuminate\\Support\\Facades\\Schema",
        ];
        if needs_db {
            imports.push("Illuminate\\Support\\Facades\\DB");
        }
        if self.options.sort_imports {
            imports.sort();
        }

        let mut out = String::new();
        out.push_str("<?php\n\n");
        for import in imports {
            out.push_str(&format!("use {import};\n"));
        }
        out.push_str("\nreturn new class extends Migration\n{\n");
        out.push_str(&format!("{i}public function up(): void\n{i}{{\n"));
        out.push_str(up);
        out.push_str(&format!("{i}}}\n\n"));
        out.push_str(&format!("{i}public function down(): void\n{i}{{\n"));
        out.push_str(down);
        out.push_str(&format!("{i}}}\n}};\n"));
        out
    }

    // ── Column definitions ──────────────────────────────────────────────────

    /// created_at/updated_at collapse into `timestamps()` only when both are
    /// present; deleted_at collapses into `softDeletes()`.
    fn is_condensed_column(&self, table: &Table, col: &Column) -> bool {
        match col.name.as_str() {
            "created_at" | "updated_at" => table.has_timestamps(),
            "deleted_at" => table.has_soft_deletes(),
            _ => false,
        }
    }

    fn column_definition(&self, col: &Column) -> String {
        // integer + auto-increment collapses to the identity short-form,
        // which carries no modifiers
        if col.auto_increment && col.column_type.is_integer() {
            if col.column_type == ColumnType::BigInteger && col.unsigned {
                return if col.name == "id" {
                    "$table->id();".to_string()
                } else {
                    format!("$table->id('{}');", col.name)
                };
            }
            if let Some(method) = self.types.increments_method(col.column_type) {
                return format!("$table->{method}('{}');", col.name);
            }
        }

        let mut method = self.types.blueprint_method(col.column_type).to_string();
        if col.unsigned && col.column_type.is_integer() {
            method = format!(
                "unsigned{}{}",
                method[..1].to_uppercase(),
                &method[1..]
            );
        }

        let mut args = vec![format!("'{}'", col.name)];
        match col.column_type {
            ColumnType::Decimal => {
                if let Some(p) = col.precision {
                    args.push(p.to_string());
                    args.push(col.scale.unwrap_or(0).to_string());
                }
            }
            ColumnType::String | ColumnType::Char => {
                if let Some(len) = col.length {
                    args.push(len.to_string());
                }
            }
            ColumnType::Enum | ColumnType::Set => {
                args.push(format!(
                    "[{}]",
                    col.flags
                        .enum_values
                        .iter()
                        .map(|v| format!("'{}'", escape(v)))
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
            _ => {}
        }

        let mut def = format!("$table->{method}({})", args.join(", "));

        if col.nullable {
            def.push_str("->nullable()");
        }
        if let Some(default) = &col.default {
            if let Some(rendered) = render_default(default) {
                def.push_str(&format!("->default({rendered})"));
            }
        }
        if let Some(comment) = &col.comment {
            def.push_str(&format!("->comment('{}')", escape(comment)));
        }
        if let Some(charset) = &col.charset {
            def.push_str(&format!("->charset('{charset}')"));
        }
        if let Some(collation) = &col.collation {
            def.push_str(&format!("->collation('{collation}')"));
        }

        def.push(';');
        def
    }

    // ── Index and FK definitions ────────────────────────────────────────────

    fn index_definition(&self, table: &Table, index: &Index) -> String {
        let (method, suffix) = match index.kind {
            IndexKind::Unique => ("unique", "unique"),
            IndexKind::Fulltext => ("fullText", "fulltext"),
            IndexKind::Spatial => ("spatialIndex", "spatialindex"),
            _ => ("index", "index"),
        };
        let conventional = format!("{}_{}_{}", table.name, index.columns.join("_"), suffix);
        if index.name == conventional {
            format!("$table->{method}({});", column_list(&index.columns))
        } else {
            format!(
                "$table->{method}({}, '{}');",
                column_list(&index.columns),
                index.name
            )
        }
    }

    fn foreign_definition(&self, table: &Table, fk: &ForeignKey) -> String {
        let conventional = format!("{}_{}_foreign", table.name, fk.columns.join("_"));
        let mut def = if fk.name == conventional {
            format!("$table->foreign({})", column_list(&fk.columns))
        } else {
            format!("$table->foreign({}, '{}')", column_list(&fk.columns), fk.name)
        };
        def.push_str(&format!(
            "->references({})->on('{}')",
            column_list(&fk.referenced_columns),
            fk.referenced_table
        ));
        // only deviations from the dialect defaults are spelled out
        if !fk.on_delete.is_default() {
            def.push_str(&format!("->onDelete('{}')", fk.on_delete.as_sql()));
        }
        if !fk.on_update.is_default() {
            def.push_str(&format!("->onUpdate('{}')", fk.on_update.as_sql()));
        }
        def.push(';');
        def
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering helpers
// ─────────────────────────────────────────────────────────────────────────────

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// `'col'` for one column, `['a', 'b']` for several.
fn column_list(columns: &[String]) -> String {
    if columns.len() == 1 {
        format!("'{}'", columns[0])
    } else {
        format!(
            "[{}]",
            columns
                .iter()
                .map(|c| format!("'{c}'"))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

/// `None` when the default should not be emitted (explicit NULL adds nothing
/// beyond `nullable()`).
fn render_default(default: &DefaultValue) -> Option<String> {
    match default {
        DefaultValue::Null => None,
        DefaultValue::Int(v) => Some(v.to_string()),
        DefaultValue::Float(v) => Some(v.to_string()),
        DefaultValue::Bool(v) => Some(v.to_string()),
        DefaultValue::Str(v) => Some(format!("'{}'", escape(v))),
        DefaultValue::Expression(expr) => Some(format!("DB::raw('{}')", escape(expr))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
