//! Shared helpers for reducing textual catalog values to typed ones.
//!
//! Every dialect parser leans on these: default-literal classification,
//! enum value-list extraction, `type(len[,scale])` splitting and unsigned
//! detection. Plain functions, no trait role.

use crate::domain::schema::{DefaultValue, DriverTag};

// ─────────────────────────────────────────────────────────────────────────────
// Default values
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a column default from its textual catalog form.
///
/// Strips the wrappers catalogs append before classifying: PostgreSQL
/// `::type` casts, SQL Server surrounding parentheses, MySQL/SQLite `b'…'`
/// bit literals. A bare upper-case token or anything with a call syntax is
/// preserved verbatim as an expression — the emitter wraps those in a
/// raw-SQL marker instead of quoting them.
pub fn parse_default(raw: &str, driver: DriverTag) -> Option<DefaultValue> {
    let mut s = raw.trim().to_string();
    if s.is_empty() {
        return None;
    }

    // SQL Server wraps every default in at least one pair of parentheses.
    if driver == DriverTag::Sqlsrv {
        while s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
            s = s[1..s.len() - 1].trim().to_string();
        }
    }

    // Bit literals: b'1' → 1
    if (s.starts_with("b'") || s.starts_with("B'")) && s.ends_with('\'') && s.len() > 3 {
        s = s[2..s.len() - 1].to_string();
    }

    // PostgreSQL appends a cast to the literal: 'draft'::character varying
    if let Some(stripped) = strip_pg_cast(&s) {
        s = stripped;
    }

    if s.eq_ignore_ascii_case("null") {
        return Some(DefaultValue::Null);
    }

    if let Some(inner) = unquote(&s) {
        return Some(DefaultValue::Str(inner));
    }

    if s.eq_ignore_ascii_case("true") {
        return Some(DefaultValue::Bool(true));
    }
    if s.eq_ignore_ascii_case("false") {
        return Some(DefaultValue::Bool(false));
    }

    if let Ok(i) = s.parse::<i64>() {
        return Some(DefaultValue::Int(i));
    }
    if s.contains('.') {
        if let Ok(f) = s.parse::<f64>() {
            return Some(DefaultValue::Float(f));
        }
    }

    if looks_like_expression(&s) {
        return Some(DefaultValue::Expression(s));
    }

    // MySQL reports plain string defaults without quotes.
    Some(DefaultValue::Str(s))
}

/// Cut a trailing `::cast` off a literal. Quoted literals keep everything up
/// to the closing quote; bare ones are cut at the first `::`.
fn strip_pg_cast(s: &str) -> Option<String> {
    if !s.contains("::") {
        return None;
    }
    if s.starts_with('\'') {
        // find the closing quote of the literal ('' is an escaped quote)
        let bytes = s.as_bytes();
        let mut i = 1;
        while i < bytes.len() {
            if bytes[i] == b'\'' {
                if i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                    i += 2;
                    continue;
                }
                return Some(s[..=i].to_string());
            }
            i += 1;
        }
        None
    } else {
        s.split("::").next().map(|p| p.trim().to_string())
    }
}

/// `'it''s'` → `it's`; returns `None` when not a quoted literal.
fn unquote(s: &str) -> Option<String> {
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        return Some(s[1..s.len() - 1].replace("''", "'"));
    }
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        return Some(s[1..s.len() - 1].replace("\"\"", "\""));
    }
    None
}

/// `CURRENT_TIMESTAMP`, `NOW()`, `getdate()`, `uuid_generate_v4()` — call
/// syntax or an all-caps bare keyword.
fn looks_like_expression(s: &str) -> bool {
    if s.contains('(') {
        return true;
    }
    s.len() > 1
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit())
        && s.chars().any(|c| c.is_ascii_uppercase())
}

// ─────────────────────────────────────────────────────────────────────────────
// Native type parameters
// ─────────────────────────────────────────────────────────────────────────────

/// First and second numeric parameters of a native type:
/// `varchar(255)` → (Some(255), None), `decimal(10,2)` → (Some(10), Some(2)).
pub fn type_params(native: &str) -> (Option<u32>, Option<u32>) {
    let Some(open) = native.find('(') else {
        return (None, None);
    };
    let Some(close) = native[open..].find(')') else {
        return (None, None);
    };
    let inner = &native[open + 1..open + close];
    let mut parts = inner.split(',').map(|p| p.trim().parse::<u32>().ok());
    let first = parts.next().flatten();
    let second = parts.next().flatten();
    (first, second)
}

/// Extract the quoted members of `enum('a','b')` / `set('x','y')`.
pub fn enum_values(native: &str) -> Vec<String> {
    let Some(open) = native.find('(') else {
        return Vec::new();
    };
    let Some(close) = native.rfind(')') else {
        return Vec::new();
    };
    let inner = &native[open + 1..close];

    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if in_quotes => {
                // '' inside a quoted value is an escaped quote
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    current.push('\'');
                } else {
                    in_quotes = false;
                    values.push(std::mem::take(&mut current));
                }
            }
            '\'' => in_quotes = true,
            _ if in_quotes => current.push(c),
            _ => {}
        }
    }
    values
}

/// MySQL marks unsigned columns in the native token; every other dialect
/// reports `false`.
pub fn is_unsigned(native: &str) -> bool {
    native.to_lowercase().contains("unsigned")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── parse_default ──

    #[test]
    fn default_quoted_string() {
        assert_eq!(
            parse_default("'draft'", DriverTag::Mysql),
            Some(DefaultValue::Str("draft".into()))
        );
        assert_eq!(
            parse_default("'it''s'", DriverTag::Pgsql),
            Some(DefaultValue::Str("it's".into()))
        );
    }

    #[test]
    fn default_null_literal() {
        assert_eq!(parse_default("NULL", DriverTag::Pgsql), Some(DefaultValue::Null));
        assert_eq!(parse_default("null", DriverTag::Sqlite), Some(DefaultValue::Null));
    }

    #[test]
    fn default_numeric_literals() {
        assert_eq!(parse_default("42", DriverTag::Mysql), Some(DefaultValue::Int(42)));
        assert_eq!(parse_default("-1", DriverTag::Mysql), Some(DefaultValue::Int(-1)));
        assert_eq!(
            parse_default("0.5", DriverTag::Pgsql),
            Some(DefaultValue::Float(0.5))
        );
    }

    #[test]
    fn default_boolean_literals() {
        assert_eq!(
            parse_default("true", DriverTag::Pgsql),
            Some(DefaultValue::Bool(true))
        );
        assert_eq!(
            parse_default("FALSE", DriverTag::Pgsql),
            Some(DefaultValue::Bool(false))
        );
    }

    #[test]
    fn default_expressions_preserved_verbatim() {
        assert_eq!(
            parse_default("CURRENT_TIMESTAMP", DriverTag::Mysql),
            Some(DefaultValue::Expression("CURRENT_TIMESTAMP".into()))
        );
        assert_eq!(
            parse_default("now()", DriverTag::Pgsql),
            Some(DefaultValue::Expression("now()".into()))
        );
        assert_eq!(
            parse_default("UUID()", DriverTag::Mysql),
            Some(DefaultValue::Expression("UUID()".into()))
        );
    }

    #[test]
    fn default_postgres_cast_stripped() {
        assert_eq!(
            parse_default("'draft'::character varying", DriverTag::Pgsql),
            Some(DefaultValue::Str("draft".into()))
        );
        assert_eq!(
            parse_default("NULL::text", DriverTag::Pgsql),
            Some(DefaultValue::Null)
        );
        assert_eq!(
            parse_default("0::smallint", DriverTag::Pgsql),
            Some(DefaultValue::Int(0))
        );
    }

    #[test]
    fn default_sqlserver_parens_stripped() {
        assert_eq!(
            parse_default("((0))", DriverTag::Sqlsrv),
            Some(DefaultValue::Int(0))
        );
        assert_eq!(
            parse_default("('draft')", DriverTag::Sqlsrv),
            Some(DefaultValue::Str("draft".into()))
        );
        assert_eq!(
            parse_default("(getdate())", DriverTag::Sqlsrv),
            Some(DefaultValue::Expression("getdate()".into()))
        );
    }

    #[test]
    fn default_bit_literal_stripped() {
        assert_eq!(
            parse_default("b'1'", DriverTag::Mysql),
            Some(DefaultValue::Int(1))
        );
        assert_eq!(
            parse_default("b'0'", DriverTag::Mysql),
            Some(DefaultValue::Int(0))
        );
    }

    #[test]
    fn default_bare_mysql_string() {
        // MySQL information_schema reports string defaults unquoted
        assert_eq!(
            parse_default("draft", DriverTag::Mysql),
            Some(DefaultValue::Str("draft".into()))
        );
    }

    #[test]
    fn default_empty_is_none() {
        assert_eq!(parse_default("", DriverTag::Mysql), None);
        assert_eq!(parse_default("   ", DriverTag::Mysql), None);
    }

    // ── type_params ──

    #[test]
    fn type_params_extraction() {
        assert_eq!(type_params("varchar(255)"), (Some(255), None));
        assert_eq!(type_params("decimal(10,2)"), (Some(10), Some(2)));
        assert_eq!(type_params("char(36)"), (Some(36), None));
        assert_eq!(type_params("text"), (None, None));
        assert_eq!(type_params("enum('a','b')"), (None, None));
    }

    // ── enum_values ──

    #[test]
    fn enum_values_extraction() {
        assert_eq!(
            enum_values("enum('draft','published')"),
            vec!["draft", "published"]
        );
        assert_eq!(enum_values("set('a','b','c')"), vec!["a", "b", "c"]);
        assert_eq!(enum_values("enum('it''s','ok')"), vec!["it's", "ok"]);
        assert!(enum_values("integer").is_empty());
    }

    // ── is_unsigned ──

    #[test]
    fn unsigned_detection() {
        assert!(is_unsigned("bigint(20) unsigned"));
        assert!(is_unsigned("int UNSIGNED"));
        assert!(!is_unsigned("bigint(20)"));
    }
}
