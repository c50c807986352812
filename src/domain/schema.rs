use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::error::SchemaError;

// ─────────────────────────────────────────────────────────────────────────────
// Driver tags
// ─────────────────────────────────────────────────────────────────────────────

/// The four supported dialect families, keyed by driver tag.
///
/// MariaDB shares MySQL's catalog layout and wire behaviour, so its tag folds
/// into [`DriverTag::Mysql`]. Any other tag is an [`SchemaError::UnsupportedDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverTag {
    Mysql,
    Pgsql,
    Sqlite,
    Sqlsrv,
}

impl DriverTag {
    pub fn parse(tag: &str) -> Result<Self, SchemaError> {
        match tag.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DriverTag::Mysql),
            "pgsql" | "postgres" | "postgresql" => Ok(DriverTag::Pgsql),
            "sqlite" => Ok(DriverTag::Sqlite),
            "sqlsrv" | "mssql" => Ok(DriverTag::Sqlsrv),
            other => Err(SchemaError::UnsupportedDriver(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriverTag::Mysql => "mysql",
            DriverTag::Pgsql => "pgsql",
            DriverTag::Sqlite => "sqlite",
            DriverTag::Sqlsrv => "sqlsrv",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Canonical column types
// ─────────────────────────────────────────────────────────────────────────────

/// The closed, dialect-neutral type vocabulary.
///
/// Every parser reduces its native catalog tokens to one of these; the
/// emitters and the comparator never see a raw dialect string (that one is
/// preserved separately in [`Column::native_type`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    // integer family
    TinyInteger,
    SmallInteger,
    MediumInteger,
    Integer,
    BigInteger,
    // floating / fixed
    Float,
    Double,
    Decimal,
    // textual
    Char,
    String,
    TinyText,
    Text,
    MediumText,
    LongText,
    // binary
    Binary,
    Blob,
    // temporal
    Date,
    Time,
    DateTime,
    Timestamp,
    TimestampTz,
    Year,
    // structured
    Json,
    Jsonb,
    // logical
    Boolean,
    // identity
    Uuid,
    Ulid,
    // enumerable (value list carried in ColumnFlags::enum_values)
    Enum,
    Set,
    // spatial
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl ColumnType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::TinyInteger
                | ColumnType::SmallInteger
                | ColumnType::MediumInteger
                | ColumnType::Integer
                | ColumnType::BigInteger
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            ColumnType::Date
                | ColumnType::Time
                | ColumnType::DateTime
                | ColumnType::Timestamp
                | ColumnType::TimestampTz
                | ColumnType::Year
        )
    }

    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            ColumnType::Char
                | ColumnType::String
                | ColumnType::TinyText
                | ColumnType::Text
                | ColumnType::MediumText
                | ColumnType::LongText
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Default values
// ─────────────────────────────────────────────────────────────────────────────

/// A column default, parsed from its textual catalog form into a typed value.
///
/// `Expression` preserves a bare SQL expression (`CURRENT_TIMESTAMP`,
/// `NOW()`, `UUID()`, …) verbatim; the emitters must wrap it in a raw-SQL
/// marker rather than quoting it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum DefaultValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Expression(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Column
// ─────────────────────────────────────────────────────────────────────────────

/// Well-known column attributes as a discriminated struct, with a free-form
/// string map kept as the dialect escape hatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnFlags {
    /// The column is part of the primary key (set from the catalog's
    /// column-level marker; the authoritative PK is the Primary index).
    pub primary: bool,
    /// Value list for `enum` / `set` columns. Non-empty iff the type is one of those.
    pub enum_values: Vec<String>,
    /// Generated / computed column.
    pub computed: bool,
    /// The dialect's maximum varchar length, when the catalog reports
    /// the sentinel "max" form (SQL Server `varchar(max)`).
    pub max_varchar: bool,
    /// Dialect-specific extras that have no well-known slot.
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    /// Canonical type from the closed vocabulary.
    pub column_type: ColumnType,
    /// The raw dialect string as read from the catalog, preserved for reports.
    pub native_type: String,
    pub nullable: bool,
    pub auto_increment: bool,
    /// MySQL-only; every other dialect always reports `false`.
    pub unsigned: bool,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub default: Option<DefaultValue>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub comment: Option<String>,
    pub flags: ColumnFlags,
}

impl Column {
    /// Minimal constructor used by parsers and tests; everything optional
    /// starts empty.
    pub fn new(name: impl Into<String>, column_type: ColumnType, native_type: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            column_type,
            native_type: native_type.into(),
            nullable: false,
            auto_increment: false,
            unsigned: false,
            length: None,
            precision: None,
            scale: None,
            default: None,
            charset: None,
            collation: None,
            comment: None,
            flags: ColumnFlags::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Index
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Primary,
    Unique,
    Index,
    Fulltext,
    Spatial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexAlgorithm {
    Btree,
    Hash,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Index {
    pub name: String,
    pub kind: IndexKind,
    /// Non-empty, in ordinal order.
    pub columns: Vec<String>,
    pub algorithm: Option<IndexAlgorithm>,
}

impl Index {
    pub fn new(name: impl Into<String>, kind: IndexKind, columns: Vec<String>) -> Self {
        Index {
            name: name.into(),
            kind,
            columns,
            algorithm: None,
        }
    }

    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Foreign keys
// ─────────────────────────────────────────────────────────────────────────────

/// Referential action, mapped from dialect codes to the canonical vocabulary.
///
/// Unknown catalog values degrade to `NoAction` rather than aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FkAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    #[default]
    NoAction,
}

impl FkAction {
    /// Map a catalog token to the canonical action. Accepts the PostgreSQL
    /// single-letter codes {a,r,c,n,d}, the SQL Server descriptive tokens
    /// (`CASCADE`, `SET_NULL`, …) and the textual forms MySQL/SQLite report.
    pub fn from_catalog(raw: &str) -> Self {
        match raw.trim().to_uppercase().replace('_', " ").as_str() {
            "C" | "CASCADE" => FkAction::Cascade,
            "N" | "SET NULL" => FkAction::SetNull,
            "D" | "SET DEFAULT" => FkAction::SetDefault,
            "R" | "RESTRICT" => FkAction::Restrict,
            // "A", "NO ACTION" and anything unrecognized
            _ => FkAction::NoAction,
        }
    }

    /// The token the migration emitter writes (`->onDelete('set null')`).
    pub fn as_sql(&self) -> &'static str {
        match self {
            FkAction::Cascade => "cascade",
            FkAction::SetNull => "set null",
            FkAction::SetDefault => "set default",
            FkAction::Restrict => "restrict",
            FkAction::NoAction => "no action",
        }
    }

    /// `Restrict` and `NoAction` are the dialect defaults; the emitter only
    /// writes the modifier when the action deviates from them.
    pub fn is_default(&self) -> bool {
        matches!(self, FkAction::Restrict | FkAction::NoAction)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKey {
    pub name: String,
    /// Local columns, in ordinal order. Non-empty, same length as `referenced_columns`.
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_delete: FkAction,
    pub on_update: FkAction,
}

impl ForeignKey {
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        referenced_table: impl Into<String>,
        referenced_columns: Vec<String>,
    ) -> Self {
        ForeignKey {
            name: name.into(),
            columns,
            referenced_table: referenced_table.into(),
            referenced_columns,
            on_delete: FkAction::NoAction,
            on_update: FkAction::NoAction,
        }
    }

    /// A FK whose target is its own table. Never blocks ordering and never
    /// counts toward cycles.
    pub fn is_self_referencing(&self, table: &str) -> bool {
        self.referenced_table == table
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Table
// ─────────────────────────────────────────────────────────────────────────────

/// One table, as composed by a dialect parser.
///
/// Immutable once produced: the dependency engine, the detector and the
/// emitters borrow it and never mutate. Column order is catalog order and
/// must be preserved through emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub engine: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub comment: Option<String>,
    /// Dialect-specific extras (e.g. the PostgreSQL schema namespace).
    pub attributes: BTreeMap<String, String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            engine: None,
            charset: None,
            collation: None,
            comment: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// The table's Primary index, if any. The invariant allows at most one.
    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|i| i.kind == IndexKind::Primary)
    }

    /// True when a single-column Unique index covers `column`. Drives the
    /// hasOne-vs-hasMany decision in the relationship detector.
    pub fn has_unique_on(&self, column: &str) -> bool {
        self.indexes.iter().any(|i| {
            matches!(i.kind, IndexKind::Unique | IndexKind::Primary)
                && i.columns.len() == 1
                && i.columns[0] == column
        })
    }

    /// Both convention timestamp columns present.
    pub fn has_timestamps(&self) -> bool {
        self.has_column("created_at") && self.has_column("updated_at")
    }

    /// The soft-delete convention column present (and temporal).
    pub fn has_soft_deletes(&self) -> bool {
        self.column("deleted_at")
            .map(|c| c.column_type.is_temporal())
            .unwrap_or(false)
    }

    /// Check the structural invariants. Parsers compose tables that satisfy
    /// these by construction; tests and debug builds call this explicitly.
    ///
    /// - every column referenced by an index or by the local side of a FK exists;
    /// - at most one Primary index;
    /// - index names unique within the table;
    /// - FK column lists non-empty and of matching lengths;
    /// - enum/set columns carry a non-empty value list;
    /// - `scale <= precision` when both set;
    /// - auto-increment only on integer-family columns.
    pub fn validate(&self) -> Result<(), String> {
        let mut primaries = 0;
        let mut seen_index_names = Vec::new();
        for idx in &self.indexes {
            if idx.kind == IndexKind::Primary {
                primaries += 1;
            }
            if idx.columns.is_empty() {
                return Err(format!("index '{}' has no columns", idx.name));
            }
            if seen_index_names.contains(&&idx.name) {
                return Err(format!("duplicate index name '{}'", idx.name));
            }
            seen_index_names.push(&idx.name);
            for col in &idx.columns {
                if !self.has_column(col) {
                    return Err(format!(
                        "index '{}' references missing column '{}'",
                        idx.name, col
                    ));
                }
            }
        }
        if primaries > 1 {
            return Err(format!("table '{}' has {} primary indexes", self.name, primaries));
        }

        for fk in &self.foreign_keys {
            if fk.columns.is_empty() {
                return Err(format!("foreign key '{}' has no columns", fk.name));
            }
            if fk.columns.len() != fk.referenced_columns.len() {
                return Err(format!(
                    "foreign key '{}' column count mismatch ({} local, {} referenced)",
                    fk.name,
                    fk.columns.len(),
                    fk.referenced_columns.len()
                ));
            }
            for col in &fk.columns {
                if !self.has_column(col) {
                    return Err(format!(
                        "foreign key '{}' references missing local column '{}'",
                        fk.name, col
                    ));
                }
            }
        }

        for col in &self.columns {
            if let (Some(p), Some(s)) = (col.precision, col.scale) {
                if s > p {
                    return Err(format!(
                        "column '{}' has scale {} > precision {}",
                        col.name, s, p
                    ));
                }
            }
            if col.auto_increment && !col.column_type.is_integer() {
                return Err(format!(
                    "column '{}' is auto-increment but not integer-typed",
                    col.name
                ));
            }
            if matches!(col.column_type, ColumnType::Enum | ColumnType::Set)
                && col.flags.enum_values.is_empty()
            {
                return Err(format!("column '{}' is enum/set without values", col.name));
            }
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Generated output
// ─────────────────────────────────────────────────────────────────────────────

/// One emitted artifact. The core produces these; the host persists them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedFile {
    pub filename: String,
    pub contents: String,
}

impl GeneratedFile {
    pub fn new(filename: impl Into<String>, contents: impl Into<String>) -> Self {
        GeneratedFile {
            filename: filename.into(),
            contents: contents.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn users_table() -> Table {
        let mut t = Table::new("users");
        let mut id = Column::new("id", ColumnType::BigInteger, "bigint unsigned");
        id.auto_increment = true;
        id.unsigned = true;
        t.columns.push(id);
        t.columns.push(Column::new("email", ColumnType::String, "varchar(255)"));
        t.indexes.push(Index::new("PRIMARY", IndexKind::Primary, vec!["id".into()]));
        t.indexes.push(Index::new(
            "users_email_unique",
            IndexKind::Unique,
            vec!["email".into()],
        ));
        t
    }

    // ── DriverTag ──

    #[test]
    fn driver_tag_accepts_known_tags() {
        assert_eq!(DriverTag::parse("mysql").unwrap(), DriverTag::Mysql);
        assert_eq!(DriverTag::parse("mariadb").unwrap(), DriverTag::Mysql);
        assert_eq!(DriverTag::parse("pgsql").unwrap(), DriverTag::Pgsql);
        assert_eq!(DriverTag::parse("postgres").unwrap(), DriverTag::Pgsql);
        assert_eq!(DriverTag::parse("sqlite").unwrap(), DriverTag::Sqlite);
        assert_eq!(DriverTag::parse("sqlsrv").unwrap(), DriverTag::Sqlsrv);
    }

    #[test]
    fn driver_tag_rejects_unknown() {
        let err = DriverTag::parse("oracle").unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedDriver(_)));
    }

    // ── FkAction ──

    #[test]
    fn fk_action_maps_postgres_letters() {
        assert_eq!(FkAction::from_catalog("c"), FkAction::Cascade);
        assert_eq!(FkAction::from_catalog("n"), FkAction::SetNull);
        assert_eq!(FkAction::from_catalog("d"), FkAction::SetDefault);
        assert_eq!(FkAction::from_catalog("r"), FkAction::Restrict);
        assert_eq!(FkAction::from_catalog("a"), FkAction::NoAction);
    }

    #[test]
    fn fk_action_maps_sqlserver_tokens() {
        assert_eq!(FkAction::from_catalog("CASCADE"), FkAction::Cascade);
        assert_eq!(FkAction::from_catalog("SET_NULL"), FkAction::SetNull);
        assert_eq!(FkAction::from_catalog("SET_DEFAULT"), FkAction::SetDefault);
        assert_eq!(FkAction::from_catalog("NO_ACTION"), FkAction::NoAction);
    }

    #[test]
    fn fk_action_maps_textual_forms() {
        assert_eq!(FkAction::from_catalog("SET NULL"), FkAction::SetNull);
        assert_eq!(FkAction::from_catalog("restrict"), FkAction::Restrict);
    }

    #[test]
    fn fk_action_unknown_degrades_to_no_action() {
        assert_eq!(FkAction::from_catalog("WHATEVER"), FkAction::NoAction);
        assert_eq!(FkAction::from_catalog(""), FkAction::NoAction);
    }

    #[test]
    fn fk_action_default_detection() {
        assert!(FkAction::Restrict.is_default());
        assert!(FkAction::NoAction.is_default());
        assert!(!FkAction::Cascade.is_default());
        assert!(!FkAction::SetNull.is_default());
    }

    // ── Table helpers ──

    #[test]
    fn primary_key_found() {
        let t = users_table();
        assert_eq!(t.primary_key().unwrap().columns, vec!["id"]);
    }

    #[test]
    fn unique_detection_single_column_only() {
        let t = users_table();
        assert!(t.has_unique_on("email"));
        assert!(t.has_unique_on("id")); // primary counts
        assert!(!t.has_unique_on("name"));
    }

    #[test]
    fn timestamps_require_both_columns() {
        let mut t = users_table();
        assert!(!t.has_timestamps());
        t.columns.push(Column::new("created_at", ColumnType::Timestamp, "timestamp"));
        assert!(!t.has_timestamps());
        t.columns.push(Column::new("updated_at", ColumnType::Timestamp, "timestamp"));
        assert!(t.has_timestamps());
    }

    #[test]
    fn soft_deletes_require_temporal_type() {
        let mut t = users_table();
        t.columns.push(Column::new("deleted_at", ColumnType::String, "varchar"));
        assert!(!t.has_soft_deletes());
        t.columns.pop();
        t.columns.push(Column::new("deleted_at", ColumnType::Timestamp, "timestamp"));
        assert!(t.has_soft_deletes());
    }

    // ── validate ──

    #[test]
    fn validate_accepts_well_formed_table() {
        assert!(users_table().validate().is_ok());
    }

    #[test]
    fn validate_rejects_two_primaries() {
        let mut t = users_table();
        t.indexes.push(Index::new("other_pk", IndexKind::Primary, vec!["email".into()]));
        assert!(t.validate().is_err());
    }

    #[test]
    fn validate_rejects_index_on_missing_column() {
        let mut t = users_table();
        t.indexes.push(Index::new("ghost", IndexKind::Index, vec!["nope".into()]));
        let err = t.validate().unwrap_err();
        assert!(err.contains("missing column"));
    }

    #[test]
    fn validate_rejects_fk_arity_mismatch() {
        let mut t = users_table();
        t.foreign_keys.push(ForeignKey::new(
            "bad_fk",
            vec!["email".into()],
            "teams",
            vec!["id".into(), "extra".into()],
        ));
        assert!(t.validate().unwrap_err().contains("mismatch"));
    }

    #[test]
    fn validate_rejects_scale_above_precision() {
        let mut t = users_table();
        let mut price = Column::new("price", ColumnType::Decimal, "decimal(4,8)");
        price.precision = Some(4);
        price.scale = Some(8);
        t.columns.push(price);
        assert!(t.validate().unwrap_err().contains("scale"));
    }

    #[test]
    fn validate_rejects_enum_without_values() {
        let mut t = users_table();
        t.columns.push(Column::new("status", ColumnType::Enum, "enum"));
        assert!(t.validate().unwrap_err().contains("enum"));
    }

    #[test]
    fn validate_rejects_textual_auto_increment() {
        let mut t = users_table();
        let mut c = Column::new("code", ColumnType::String, "varchar");
        c.auto_increment = true;
        t.columns.push(c);
        assert!(t.validate().unwrap_err().contains("auto-increment"));
    }

    #[test]
    fn self_reference_detection() {
        let fk = ForeignKey::new("fk", vec!["parent_id".into()], "categories", vec!["id".into()]);
        assert!(fk.is_self_referencing("categories"));
        assert!(!fk.is_self_referencing("posts"));
    }
}
