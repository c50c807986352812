//! Per-dialect type normalization and the emitted type tokens.
//!
//! The map is a plain value passed into parsers and emitters — custom
//! mappings are applied through [`TypeMapBuilder`], never through global
//! state. Native tokens arrive as the catalog reports them (possibly with a
//! parameter list, `varchar(255)`); normalization works on the lowercased
//! base token.

use std::collections::BTreeMap;

use crate::domain::schema::{ColumnType, DriverTag};

// ─────────────────────────────────────────────────────────────────────────────
// TypeMap
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    /// (driver, lowercased native token) → canonical override.
    overrides: BTreeMap<(DriverTag, String), ColumnType>,
}

impl TypeMap {
    pub fn new() -> Self {
        TypeMap::default()
    }

    pub fn builder() -> TypeMapBuilder {
        TypeMapBuilder::default()
    }

    /// Reduce a native catalog token to the canonical vocabulary.
    ///
    /// Overrides win; otherwise the dialect rules apply. Unknown tokens fall
    /// back to `String` (MySQL/PostgreSQL/SQL Server) or ride the SQLite
    /// affinity ladder.
    pub fn canonical(&self, driver: DriverTag, native: &str) -> ColumnType {
        let base = base_token(native);
        if let Some(ty) = self.overrides.get(&(driver, base.clone())) {
            return *ty;
        }
        match driver {
            DriverTag::Mysql => mysql_canonical(&base, native),
            DriverTag::Pgsql => pgsql_canonical(&base),
            DriverTag::Sqlite => sqlite_affinity(&base),
            DriverTag::Sqlsrv => sqlsrv_canonical(&base),
        }
    }

    /// The schema-builder method the migration emitter writes for a type.
    pub fn blueprint_method(&self, ty: ColumnType) -> &'static str {
        match ty {
            ColumnType::TinyInteger => "tinyInteger",
            ColumnType::SmallInteger => "smallInteger",
            ColumnType::MediumInteger => "mediumInteger",
            ColumnType::Integer => "integer",
            ColumnType::BigInteger => "bigInteger",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Decimal => "decimal",
            ColumnType::Char => "char",
            ColumnType::String => "string",
            ColumnType::TinyText => "tinyText",
            ColumnType::Text => "text",
            ColumnType::MediumText => "mediumText",
            ColumnType::LongText => "longText",
            ColumnType::Binary | ColumnType::Blob => "binary",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::DateTime => "dateTime",
            ColumnType::Timestamp => "timestamp",
            ColumnType::TimestampTz => "timestampTz",
            ColumnType::Year => "year",
            ColumnType::Json => "json",
            ColumnType::Jsonb => "jsonb",
            ColumnType::Boolean => "boolean",
            ColumnType::Uuid => "uuid",
            ColumnType::Ulid => "ulid",
            ColumnType::Enum => "enum",
            ColumnType::Set => "set",
            ColumnType::Geometry => "geometry",
            ColumnType::Point => "point",
            ColumnType::LineString => "lineString",
            ColumnType::Polygon => "polygon",
            ColumnType::MultiPoint => "multiPoint",
            ColumnType::MultiLineString => "multiLineString",
            ColumnType::MultiPolygon => "multiPolygon",
            ColumnType::GeometryCollection => "geometryCollection",
        }
    }

    /// The identity short-form for an auto-increment integer column.
    /// Returns `None` for non-integer types.
    pub fn increments_method(&self, ty: ColumnType) -> Option<&'static str> {
        match ty {
            ColumnType::TinyInteger => Some("tinyIncrements"),
            ColumnType::SmallInteger => Some("smallIncrements"),
            ColumnType::MediumInteger => Some("mediumIncrements"),
            ColumnType::Integer => Some("increments"),
            ColumnType::BigInteger => Some("bigIncrements"),
            _ => None,
        }
    }

    /// The scalar type written in the class docblock.
    pub fn php_doc_type(&self, ty: ColumnType) -> &'static str {
        match ty {
            t if t.is_integer() => "int",
            ColumnType::Float | ColumnType::Double | ColumnType::Decimal => "float",
            ColumnType::Boolean => "bool",
            ColumnType::Json | ColumnType::Jsonb => "array",
            t if t.is_temporal() => "\\Illuminate\\Support\\Carbon",
            _ => "string",
        }
    }

    /// The base cast the stub emitter declares for a type, before the
    /// name-convention rules (`*_at`, `*_date`) refine it.
    pub fn default_cast(&self, ty: ColumnType) -> Option<&'static str> {
        match ty {
            ColumnType::Boolean => Some("boolean"),
            ColumnType::Json | ColumnType::Jsonb => Some("array"),
            ColumnType::Decimal => Some("decimal"),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Collects per-dialect native→canonical overrides (the `type_mappings`
/// configuration block) and produces an immutable [`TypeMap`].
#[derive(Debug, Default)]
pub struct TypeMapBuilder {
    overrides: BTreeMap<(DriverTag, String), ColumnType>,
}

impl TypeMapBuilder {
    pub fn with_mapping(mut self, driver: DriverTag, native: &str, canonical: ColumnType) -> Self {
        self.overrides
            .insert((driver, native.to_lowercase()), canonical);
        self
    }

    pub fn build(self) -> TypeMap {
        TypeMap {
            overrides: self.overrides,
        }
    }
}

/// Resolve a canonical type from its configuration spelling.
/// Accepts `bigInteger`, `big_integer`, `timestamp-tz` and friends.
pub fn canonical_from_name(name: &str) -> Option<ColumnType> {
    let key: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    let ty = match key.as_str() {
        "tinyinteger" => ColumnType::TinyInteger,
        "smallinteger" => ColumnType::SmallInteger,
        "mediuminteger" => ColumnType::MediumInteger,
        "integer" | "int" => ColumnType::Integer,
        "biginteger" => ColumnType::BigInteger,
        "float" => ColumnType::Float,
        "double" => ColumnType::Double,
        "decimal" => ColumnType::Decimal,
        "char" => ColumnType::Char,
        "string" => ColumnType::String,
        "tinytext" => ColumnType::TinyText,
        "text" => ColumnType::Text,
        "mediumtext" => ColumnType::MediumText,
        "longtext" => ColumnType::LongText,
        "binary" => ColumnType::Binary,
        "blob" => ColumnType::Blob,
        "date" => ColumnType::Date,
        "time" => ColumnType::Time,
        "datetime" => ColumnType::DateTime,
        "timestamp" => ColumnType::Timestamp,
        "timestamptz" => ColumnType::TimestampTz,
        "year" => ColumnType::Year,
        "json" => ColumnType::Json,
        "jsonb" => ColumnType::Jsonb,
        "boolean" | "bool" => ColumnType::Boolean,
        "uuid" => ColumnType::Uuid,
        "ulid" => ColumnType::Ulid,
        "enum" => ColumnType::Enum,
        "set" => ColumnType::Set,
        "geometry" => ColumnType::Geometry,
        "point" => ColumnType::Point,
        "linestring" => ColumnType::LineString,
        "polygon" => ColumnType::Polygon,
        "multipoint" => ColumnType::MultiPoint,
        "multilinestring" => ColumnType::MultiLineString,
        "multipolygon" => ColumnType::MultiPolygon,
        "geometrycollection" => ColumnType::GeometryCollection,
        _ => return None,
    };
    Some(ty)
}

// ─────────────────────────────────────────────────────────────────────────────
// Dialect rules
// ─────────────────────────────────────────────────────────────────────────────

/// Lowercased token with any parameter list and modifiers stripped:
/// `varchar(255)` → `varchar`, `bigint unsigned` → `bigint`.
fn base_token(native: &str) -> String {
    let lower = native.trim().to_lowercase();
    let no_params = match lower.find('(') {
        // keep anything after the parens out entirely (`int(11) unsigned`)
        Some(pos) => lower[..pos].trim().to_string(),
        None => lower,
    };
    // `bigint unsigned`, `timestamp without time zone` — multi-word tokens
    // are matched whole below, so only strip the unsigned/zerofill suffixes.
    no_params
        .replace(" unsigned", "")
        .replace(" zerofill", "")
        .trim()
        .to_string()
}

fn mysql_canonical(base: &str, native: &str) -> ColumnType {
    // tinyint(1) is the MySQL boolean convention
    if base == "tinyint" && native.to_lowercase().starts_with("tinyint(1)") {
        return ColumnType::Boolean;
    }
    match base {
        "tinyint" => ColumnType::TinyInteger,
        "smallint" => ColumnType::SmallInteger,
        "mediumint" => ColumnType::MediumInteger,
        "int" | "integer" => ColumnType::Integer,
        "bigint" => ColumnType::BigInteger,
        "float" => ColumnType::Float,
        "double" | "real" => ColumnType::Double,
        "decimal" | "numeric" => ColumnType::Decimal,
        "bit" => ColumnType::Boolean,
        "char" => ColumnType::Char,
        "varchar" => ColumnType::String,
        "tinytext" => ColumnType::TinyText,
        "text" => ColumnType::Text,
        "mediumtext" => ColumnType::MediumText,
        "longtext" => ColumnType::LongText,
        "binary" | "varbinary" => ColumnType::Binary,
        "tinyblob" | "blob" | "mediumblob" | "longblob" => ColumnType::Blob,
        "date" => ColumnType::Date,
        "time" => ColumnType::Time,
        "datetime" => ColumnType::DateTime,
        "timestamp" => ColumnType::Timestamp,
        "year" => ColumnType::Year,
        "json" => ColumnType::Json,
        "enum" => ColumnType::Enum,
        "set" => ColumnType::Set,
        "geometry" => ColumnType::Geometry,
        "point" => ColumnType::Point,
        "linestring" => ColumnType::LineString,
        "polygon" => ColumnType::Polygon,
        "multipoint" => ColumnType::MultiPoint,
        "multilinestring" => ColumnType::MultiLineString,
        "multipolygon" => ColumnType::MultiPolygon,
        "geometrycollection" => ColumnType::GeometryCollection,
        _ => ColumnType::String,
    }
}

fn pgsql_canonical(base: &str) -> ColumnType {
    match base {
        "int2" | "smallint" | "smallserial" => ColumnType::SmallInteger,
        "int4" | "int" | "integer" | "serial" => ColumnType::Integer,
        "int8" | "bigint" | "bigserial" => ColumnType::BigInteger,
        "float4" | "real" => ColumnType::Float,
        "float8" | "double precision" => ColumnType::Double,
        "numeric" | "decimal" | "money" => ColumnType::Decimal,
        "bpchar" | "char" | "character" => ColumnType::Char,
        "varchar" | "character varying" => ColumnType::String,
        "text" => ColumnType::Text,
        "bytea" => ColumnType::Binary,
        "date" => ColumnType::Date,
        "time" | "timetz" | "time without time zone" | "time with time zone" => ColumnType::Time,
        "timestamp" | "timestamp without time zone" => ColumnType::Timestamp,
        "timestamptz" | "timestamp with time zone" => ColumnType::TimestampTz,
        "json" => ColumnType::Json,
        "jsonb" => ColumnType::Jsonb,
        "bool" | "boolean" => ColumnType::Boolean,
        "uuid" => ColumnType::Uuid,
        // interval loses its range semantics in the canonical vocabulary;
        // flagged here and documented, not silently extended.
        "interval" => ColumnType::String,
        "point" => ColumnType::Point,
        "polygon" => ColumnType::Polygon,
        "geometry" | "geography" => ColumnType::Geometry,
        _ => ColumnType::String,
    }
}

/// The SQLite affinity ladder. Declared types are free-form, so matching is
/// by substring, checked in this order:
/// `int` → integer; `char|clob|text` → text; empty or `blob` → blob;
/// `real|floa|doub` → real; `bool` → integer; `date|time` → text;
/// anything else → numeric.
fn sqlite_affinity(base: &str) -> ColumnType {
    if base.contains("int") {
        return ColumnType::Integer;
    }
    if base.contains("char") || base.contains("clob") || base.contains("text") {
        return ColumnType::Text;
    }
    if base.is_empty() || base.contains("blob") {
        return ColumnType::Blob;
    }
    if base.contains("real") || base.contains("floa") || base.contains("doub") {
        return ColumnType::Float;
    }
    if base.contains("bool") {
        return ColumnType::Integer;
    }
    if base.contains("date") || base.contains("time") {
        return ColumnType::Text;
    }
    ColumnType::Decimal
}

fn sqlsrv_canonical(base: &str) -> ColumnType {
    match base {
        "tinyint" => ColumnType::TinyInteger,
        "smallint" => ColumnType::SmallInteger,
        "int" => ColumnType::Integer,
        "bigint" => ColumnType::BigInteger,
        "real" => ColumnType::Float,
        "float" => ColumnType::Double,
        "decimal" | "numeric" | "money" | "smallmoney" => ColumnType::Decimal,
        "char" | "nchar" => ColumnType::Char,
        "varchar" | "nvarchar" => ColumnType::String,
        "text" | "ntext" | "xml" => ColumnType::Text,
        "binary" | "varbinary" => ColumnType::Binary,
        "image" => ColumnType::Blob,
        "date" => ColumnType::Date,
        "time" => ColumnType::Time,
        "datetime" | "datetime2" | "smalldatetime" => ColumnType::DateTime,
        "datetimeoffset" => ColumnType::TimestampTz,
        "bit" => ColumnType::Boolean,
        "uniqueidentifier" => ColumnType::Uuid,
        "geometry" | "geography" => ColumnType::Geometry,
        _ => ColumnType::String,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
