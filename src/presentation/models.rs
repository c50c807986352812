//! Class-stub emitter.
//!
//! One file per table: a model class whose members are inferred from the
//! schema. Properties are emitted only when they would change behaviour
//! from convention; relationship methods come from the detector, in its
//! order (polymorphic last).

use std::fmt::Write as FmtWrite;

use anyhow::Result;

use crate::domain::naming;
use crate::domain::relationships::{Relationship, RelationshipKind};
use crate::domain::schema::{Column, ColumnType, GeneratedFile, Table};
use crate::domain::types::TypeMap;

#[derive(Debug, Clone)]
pub struct ModelOptions {
    pub namespace: String,
    /// Fully-qualified base class.
    pub base_class: String,
    pub generate_relationships: bool,
    pub generate_scopes: bool,
    /// `true` emits `$fillable`, `false` emits `$guarded`.
    pub use_fillable: bool,
    pub guarded_columns: Vec<String>,
    pub indent: String,
}

impl Default for ModelOptions {
    fn default() -> Self {
        ModelOptions {
            namespace: "App\\Models".to_string(),
            base_class: "Illuminate\\Database\\Eloquent\\Model".to_string(),
            generate_relationships: true,
            generate_scopes: true,
            use_fillable: true,
            guarded_columns: vec![
                "created_at".to_string(),
                "updated_at".to_string(),
                "deleted_at".to_string(),
            ],
            indent: "    ".to_string(),
        }
    }
}

pub struct ModelWriter {
    types: TypeMap,
    options: ModelOptions,
}

impl ModelWriter {
    pub fn new(types: TypeMap, options: ModelOptions) -> Self {
        ModelWriter { types, options }
    }

    /// Emit the stub for `table`. `relationships` comes from the detector
    /// and is already in emission order.
    pub fn generate(
        &self,
        table: &Table,
        relationships: &[Relationship],
    ) -> Result<GeneratedFile> {
        let model = naming::table_to_model(&table.name);
        let base_short = self
            .options
            .base_class
            .rsplit('\\')
            .next()
            .unwrap_or("Model");

        let mut out = String::new();
        writeln!(out, "<?php\n")?;
        writeln!(out, "namespace {};\n", self.options.namespace)?;
        writeln!(out, "use {};\n", self.options.base_class)?;

        self.write_docblock(&mut out, table)?;
        writeln!(out, "class {model} extends {base_short}")?;
        writeln!(out, "{{")?;

        let mut sections: Vec<String> = Vec::new();

        if let Some(props) = self.convention_overrides(table)? {
            sections.push(props);
        }
        sections.push(self.mass_assignment(table)?);
        if let Some(casts) = self.casts(table)? {
            sections.push(casts);
        }
        if self.options.generate_relationships {
            for rel in relationships {
                sections.push(self.relationship_method(table, rel)?);
            }
        }
        if self.options.generate_scopes {
            for col in &table.columns {
                if let Some(scope) = self.scope_method(col)? {
                    sections.push(scope);
                }
            }
        }

        out.push_str(&sections.join("\n"));
        writeln!(out, "}}")?;

        Ok(GeneratedFile::new(format!("{model}.php"), out))
    }

    // ── Docblock ────────────────────────────────────────────────────────────

    fn write_docblock(&self, out: &mut String, table: &Table) -> Result<()> {
        writeln!(out, "/**")?;
        for col in &table.columns {
            let base = self.types.php_doc_type(col.column_type);
            let marker = if col.nullable { "?" } else { "" };
            writeln!(out, " * @property {marker}{base} ${}", col.name)?;
        }
        writeln!(out, " */")?;
        Ok(())
    }

    // ── Convention-deviation properties ─────────────────────────────────────

    fn convention_overrides(&self, table: &Table) -> Result<Option<String>> {
        let i = &self.options.indent;
        let mut lines: Vec<String> = Vec::new();

        // table name that the conventional round-trip would not produce
        let model = naming::table_to_model(&table.name);
        if naming::model_to_table(&model) != table.name {
            lines.push(format!("protected $table = '{}';", table.name));
        }

        let pk = table.primary_key();
        let single_pk = pk.filter(|p| p.columns.len() == 1).map(|p| &p.columns[0]);
        if let Some(pk_name) = single_pk {
            if pk_name != "id" {
                lines.push(format!("protected $primaryKey = '{pk_name}';"));
            }
            if let Some(col) = table.column(pk_name) {
                if !col.auto_increment {
                    lines.push("public $incrementing = false;".to_string());
                }
                if matches!(
                    col.column_type,
                    ColumnType::Uuid | ColumnType::Ulid | ColumnType::String | ColumnType::Char
                ) {
                    lines.push("protected $keyType = 'string';".to_string());
                }
            }
        }

        if !table.has_timestamps() {
            lines.push("public $timestamps = false;".to_string());
        }

        if lines.is_empty() {
            return Ok(None);
        }
        let mut section = String::new();
        for line in lines {
            writeln!(section, "{i}{line}")?;
        }
        Ok(Some(section))
    }

    // ── Mass assignment ─────────────────────────────────────────────────────

    fn mass_assignment(&self, table: &Table) -> Result<String> {
        let i = &self.options.indent;
        let mut section = String::new();

        if self.options.use_fillable {
            let fillable: Vec<&str> = table
                .columns
                .iter()
                .filter(|c| !c.auto_increment)
                .filter(|c| !self.options.guarded_columns.contains(&c.name))
                .map(|c| c.name.as_str())
                .collect();
            writeln!(section, "{i}protected $fillable = [")?;
            for name in fillable {
                writeln!(section, "{i}{i}'{name}',")?;
            }
            writeln!(section, "{i}];")?;
        } else {
            let mut guarded: Vec<&str> = table
                .columns
                .iter()
                .filter(|c| c.auto_increment)
                .map(|c| c.name.as_str())
                .collect();
            for name in &self.options.guarded_columns {
                if table.has_column(name) && !guarded.contains(&name.as_str()) {
                    guarded.push(name);
                }
            }
            writeln!(section, "{i}protected $guarded = [")?;
            for name in guarded {
                writeln!(section, "{i}{i}'{name}',")?;
            }
            writeln!(section, "{i}];")?;
        }
        Ok(section)
    }

    // ── Casts ───────────────────────────────────────────────────────────────

    /// Column order is preserved; the three convention timestamp columns are
    /// handled by the framework and never cast explicitly.
    fn casts(&self, table: &Table) -> Result<Option<String>> {
        let i = &self.options.indent;
        let mut entries: Vec<(String, String)> = Vec::new();

        for col in &table.columns {
            if matches!(col.name.as_str(), "created_at" | "updated_at" | "deleted_at") {
                continue;
            }
            let cast = self.cast_for(col);
            if let Some(cast) = cast {
                entries.push((col.name.clone(), cast));
            }
        }

        if entries.is_empty() {
            return Ok(None);
        }
        let mut section = String::new();
        writeln!(section, "{i}protected $casts = [")?;
        for (name, cast) in entries {
            writeln!(section, "{i}{i}'{name}' => '{cast}',")?;
        }
        writeln!(section, "{i}];")?;
        Ok(Some(section))
    }

    fn cast_for(&self, col: &Column) -> Option<String> {
        match col.column_type {
            ColumnType::Boolean => Some("boolean".to_string()),
            ColumnType::Json | ColumnType::Jsonb => Some("array".to_string()),
            t if t.is_temporal() && col.name.ends_with("_at") => Some("datetime".to_string()),
            ColumnType::Date if col.name.ends_with("_date") => Some("date".to_string()),
            ColumnType::Decimal => Some(format!("decimal:{}", col.scale.unwrap_or(2))),
            t => self.types.default_cast(t).map(|c| c.to_string()),
        }
    }

    // ── Relationships ───────────────────────────────────────────────────────

    fn relationship_method(&self, table: &Table, rel: &Relationship) -> Result<String> {
        let i = &self.options.indent;
        let body = match rel.kind {
            RelationshipKind::BelongsTo => {
                let mut args = vec![format!("{}::class", rel.related)];
                if rel.foreign_key.is_some() || rel.owner_key.is_some() {
                    let fk = rel
                        .foreign_key
                        .clone()
                        .unwrap_or_else(|| format!("{}_id", naming::snake_case(&rel.related)));
                    args.push(format!("'{fk}'"));
                }
                if let Some(owner) = &rel.owner_key {
                    args.push(format!("'{owner}'"));
                }
                format!("$this->belongsTo({})", args.join(", "))
            }
            RelationshipKind::HasOne | RelationshipKind::HasMany => {
                let method = if rel.kind == RelationshipKind::HasOne {
                    "hasOne"
                } else {
                    "hasMany"
                };
                let mut args = vec![format!("{}::class", rel.related)];
                if rel.foreign_key.is_some() || rel.owner_key.is_some() {
                    // the conventional key the other table would use for us
                    let fk = rel
                        .foreign_key
                        .clone()
                        .unwrap_or_else(|| naming::conventional_fk(&table.name));
                    args.push(format!("'{fk}'"));
                }
                if let Some(owner) = &rel.owner_key {
                    args.push(format!("'{owner}'"));
                }
                format!("$this->{method}({})", args.join(", "))
            }
            RelationshipKind::BelongsToMany => {
                let mut args = vec![format!("{}::class", rel.related)];
                if let Some(pivot) = &rel.pivot_table {
                    args.push(format!("'{pivot}'"));
                }
                if rel.foreign_key.is_some() || rel.owner_key.is_some() {
                    // both pivot keys are spelled out as soon as either deviates
                    let fk = rel
                        .foreign_key
                        .clone()
                        .unwrap_or_else(|| naming::conventional_fk(&table.name));
                    let rk = rel
                        .owner_key
                        .clone()
                        .unwrap_or_else(|| format!("{}_id", naming::snake_case(&rel.related)));
                    args.push(format!("'{fk}'"));
                    args.push(format!("'{rk}'"));
                }
                let mut call = format!("$this->belongsToMany({})", args.join(", "));
                if !rel.pivot_columns.is_empty() {
                    let cols = rel
                        .pivot_columns
                        .iter()
                        .map(|c| format!("'{c}'"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    call.push_str(&format!("->withPivot({cols})"));
                }
                call
            }
            RelationshipKind::MorphTo => "$this->morphTo()".to_string(),
        };

        let mut section = String::new();
        writeln!(section, "{i}public function {}()", rel.method)?;
        writeln!(section, "{i}{{")?;
        writeln!(section, "{i}{i}return {body};")?;
        writeln!(section, "{i}}}")?;
        Ok(section)
    }

    // ── Scopes ──────────────────────────────────────────────────────────────

    /// One local scope per boolean flag column (`is_*` / `has_*`).
    fn scope_method(&self, col: &Column) -> Result<Option<String>> {
        if col.column_type != ColumnType::Boolean {
            return Ok(None);
        }
        let Some(rest) = col
            .name
            .strip_prefix("is_")
            .or_else(|| col.name.strip_prefix("has_"))
        else {
            return Ok(None);
        };

        let i = &self.options.indent;
        let mut section = String::new();
        writeln!(section, "{i}public function scope{}($query)", naming::studly_case(rest))?;
        writeln!(section, "{i}{{")?;
        writeln!(section, "{i}{i}return $query->where('{}', true);", col.name)?;
        writeln!(section, "{i}}}")?;
        Ok(Some(section))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::relationships::detect;
    use crate::domain::schema::{ForeignKey, Index, IndexKind};

    fn writer() -> ModelWriter {
        ModelWriter::new(
            TypeMap::new(),
            ModelOptions {
                indent: "    ".to_string(),
                ..ModelOptions::default()
            },
        )
    }

    fn id_column() -> Column {
        let mut id = Column::new("id", ColumnType::BigInteger, "bigint unsigned");
        id.auto_increment = true;
        id.unsigned = true;
        id
    }

    fn users() -> Table {
        let mut t = Table::new("users");
        t.columns.push(id_column());
        t.columns
            .push(Column::new("email", ColumnType::String, "varchar(255)"));
        let mut active = Column::new("is_active", ColumnType::Boolean, "tinyint(1)");
        active.nullable = false;
        t.columns.push(active);
        t.columns
            .push(Column::new("settings", ColumnType::Json, "json"));
        t.columns
            .push(Column::new("created_at", ColumnType::Timestamp, "timestamp"));
        t.columns
            .push(Column::new("updated_at", ColumnType::Timestamp, "timestamp"));
        t.indexes
            .push(Index::new("PRIMARY", IndexKind::Primary, vec!["id".into()]));
        t
    }

    fn stub(table: &Table, all: &[Table]) -> String {
        let rels = detect(table, all, true);
        writer().generate(table, &rels).unwrap().contents
    }

    #[test]
    fn filename_is_studly_singular() {
        let t = users();
        let file = writer().generate(&t, &[]).unwrap();
        assert_eq!(file.filename, "User.php");
    }

    #[test]
    fn conventional_table_omits_overrides() {
        let body = stub(&users(), &[users()]);
        assert!(!body.contains("$table ="));
        assert!(!body.contains("$primaryKey"));
        assert!(!body.contains("$incrementing"));
        assert!(!body.contains("$keyType"));
        assert!(!body.contains("$timestamps"));
        assert!(body.contains("class User extends Model"));
        assert!(body.contains("namespace App\\Models;"));
    }

    #[test]
    fn unconventional_table_name_is_declared() {
        let mut t = users();
        t.name = "user_accounts_tbl".to_string();
        let body = stub(&t, &[]);
        assert!(body.contains("protected $table = 'user_accounts_tbl';"));
    }

    #[test]
    fn uuid_primary_key_overrides() {
        let mut t = Table::new("devices");
        t.columns.push(Column::new("uuid", ColumnType::Uuid, "uuid"));
        t.columns
            .push(Column::new("label", ColumnType::String, "varchar(100)"));
        t.indexes
            .push(Index::new("PRIMARY", IndexKind::Primary, vec!["uuid".into()]));
        let body = stub(&t, &[]);
        assert!(body.contains("protected $primaryKey = 'uuid';"));
        assert!(body.contains("public $incrementing = false;"));
        assert!(body.contains("protected $keyType = 'string';"));
        assert!(body.contains("public $timestamps = false;"));
    }

    #[test]
    fn fillable_excludes_auto_increment_and_guard_set() {
        let body = stub(&users(), &[users()]);
        assert!(body.contains("protected $fillable = ["));
        assert!(body.contains("'email',"));
        assert!(body.contains("'is_active',"));
        assert!(!body.contains("'id',"));
        assert!(!body.contains("'created_at',"));
    }

    #[test]
    fn guarded_mode_lists_ai_and_guard_columns() {
        let mut options = ModelOptions::default();
        options.indent = "    ".to_string();
        options.use_fillable = false;
        let w = ModelWriter::new(TypeMap::new(), options);
        let body = w.generate(&users(), &[]).unwrap().contents;
        assert!(body.contains("protected $guarded = ["));
        assert!(body.contains("'id',"));
        assert!(body.contains("'created_at',"));
        assert!(!body.contains("$fillable"));
    }

    #[test]
    fn casts_follow_type_and_name_conventions() {
        let mut t = users();
        let mut price = Column::new("price", ColumnType::Decimal, "decimal(8,3)");
        price.scale = Some(3);
        t.columns.push(price);
        t.columns
            .push(Column::new("published_at", ColumnType::DateTime, "datetime"));
        t.columns
            .push(Column::new("birth_date", ColumnType::Date, "date"));

        let body = stub(&t, &[]);
        assert!(body.contains("'is_active' => 'boolean',"));
        assert!(body.contains("'settings' => 'array',"));
        assert!(body.contains("'price' => 'decimal:3',"));
        assert!(body.contains("'published_at' => 'datetime',"));
        assert!(body.contains("'birth_date' => 'date',"));
        // framework-managed timestamps never appear in casts
        assert!(!body.contains("'created_at' =>"));
    }

    // S6 — enum column has no cast
    #[test]
    fn enum_column_not_cast() {
        let mut t = users();
        let mut status = Column::new("status", ColumnType::Enum, "enum('draft','published')");
        status.flags.enum_values = vec!["draft".into(), "published".into()];
        t.columns.push(status);
        let body = stub(&t, &[]);
        assert!(body.contains("'status',")); // fillable
        assert!(!body.contains("'status' =>")); // no cast
    }

    #[test]
    fn relationship_methods_rendered() {
        let users_t = users();
        let mut posts = Table::new("posts");
        posts.columns.push(id_column());
        posts
            .columns
            .push(Column::new("user_id", ColumnType::BigInteger, "bigint unsigned"));
        posts.foreign_keys.push(ForeignKey::new(
            "posts_user_id_foreign",
            vec!["user_id".into()],
            "users",
            vec!["id".into()],
        ));
        posts
            .indexes
            .push(Index::new("PRIMARY", IndexKind::Primary, vec!["id".into()]));
        let all = vec![users_t.clone(), posts.clone()];

        let post_body = stub(&posts, &all);
        assert!(post_body.contains("public function user()"));
        assert!(post_body.contains("return $this->belongsTo(User::class);"));

        let user_body = stub(&users_t, &all);
        assert!(user_body.contains("public function posts()"));
        assert!(user_body.contains("return $this->hasMany(Post::class);"));
    }

    #[test]
    fn deviating_fk_spelled_out() {
        let users_t = users();
        let mut posts = Table::new("posts");
        posts.columns.push(id_column());
        posts
            .columns
            .push(Column::new("author_id", ColumnType::BigInteger, "bigint unsigned"));
        posts.foreign_keys.push(ForeignKey::new(
            "posts_author_id_foreign",
            vec!["author_id".into()],
            "users",
            vec!["id".into()],
        ));
        let all = vec![users_t, posts.clone()];
        let body = stub(&posts, &all);
        assert!(body.contains("return $this->belongsTo(User::class, 'author_id');"));
    }

    #[test]
    fn belongs_to_many_with_pivot_payload() {
        let posts = {
            let mut t = Table::new("posts");
            t.columns.push(id_column());
            t.indexes
                .push(Index::new("PRIMARY", IndexKind::Primary, vec!["id".into()]));
            t
        };
        let tags = {
            let mut t = Table::new("tags");
            t.columns.push(id_column());
            t.indexes
                .push(Index::new("PRIMARY", IndexKind::Primary, vec!["id".into()]));
            t
        };
        let mut pivot = Table::new("post_tag");
        for (col, target) in [("post_id", "posts"), ("tag_id", "tags")] {
            pivot
                .columns
                .push(Column::new(col, ColumnType::BigInteger, "bigint unsigned"));
            pivot.foreign_keys.push(ForeignKey::new(
                format!("post_tag_{col}_foreign"),
                vec![col.to_string()],
                target,
                vec!["id".into()],
            ));
        }
        pivot
            .columns
            .push(Column::new("sort_order", ColumnType::Integer, "int"));
        let all = vec![posts.clone(), tags, pivot];

        let body = stub(&posts, &all);
        assert!(body.contains(
            "return $this->belongsToMany(Tag::class, 'post_tag')->withPivot('sort_order');"
        ));
    }

    #[test]
    fn morph_to_method_comes_last() {
        let mut images = Table::new("images");
        images.columns.push(id_column());
        images
            .columns
            .push(Column::new("imageable_type", ColumnType::String, "varchar(255)"));
        images
            .columns
            .push(Column::new("imageable_id", ColumnType::BigInteger, "bigint unsigned"));
        let all = vec![images.clone()];
        let body = stub(&images, &all);
        assert!(body.contains("public function imageable()"));
        assert!(body.contains("return $this->morphTo();"));
    }

    #[test]
    fn scope_generated_for_flag_columns() {
        let body = stub(&users(), &[]);
        assert!(body.contains("public function scopeActive($query)"));
        assert!(body.contains("return $query->where('is_active', true);"));
    }

    #[test]
    fn scopes_suppressed_by_option() {
        let mut options = ModelOptions::default();
        options.indent = "    ".to_string();
        options.generate_scopes = false;
        let w = ModelWriter::new(TypeMap::new(), options);
        let body = w.generate(&users(), &[]).unwrap().contents;
        assert!(!body.contains("scopeActive"));
    }

    #[test]
    fn relationships_suppressed_by_option() {
        let mut options = ModelOptions::default();
        options.indent = "    ".to_string();
        options.generate_relationships = false;
        let w = ModelWriter::new(TypeMap::new(), options);
        let users_t = users();
        let rels = detect(&users_t, &[users_t.clone()], true);
        let body = w.generate(&users_t, &rels).unwrap().contents;
        assert!(!body.contains("public function posts"));
    }

    #[test]
    fn docblock_lists_every_column_with_nullability() {
        let mut t = users();
        t.columns[1].nullable = true; // email
        let body = stub(&t, &[]);
        assert!(body.contains(" * @property int $id"));
        assert!(body.contains(" * @property ?string $email"));
        assert!(body.contains(" * @property bool $is_active"));
        assert!(body.contains(" * @property array $settings"));
        assert!(body.contains(" * @property \\Illuminate\\Support\\Carbon $created_at"));
    }

    #[test]
    fn meta_data_open_case_class_name() {
        let mut t = Table::new("meta_data");
        t.columns.push(id_column());
        let file = writer().generate(&t, &[]).unwrap();
        assert_eq!(file.filename, "MetaDatum.php");
        assert!(file.contents.contains("class MetaDatum extends Model"));
        // round-trip holds, so no explicit table override
        assert!(!file.contents.contains("$table ="));
    }
}
