use thiserror::Error;

/// Everything that can go wrong between "open connection" and "files emitted".
///
/// Parsers never retry: a failed catalog query surfaces as [`QueryFailed`]
/// and no partial `Table` is produced. [`CircularDependency`] is non-fatal
/// for batch emission — the generation service degrades to FK-only files
/// for the edges inside the cycle.
///
/// [`QueryFailed`]: SchemaError::QueryFailed
/// [`CircularDependency`]: SchemaError::CircularDependency
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Driver tag outside {mysql, mariadb, pgsql, sqlite, sqlsrv}. Fatal.
    #[error("unsupported database driver '{0}' (expected mysql, mariadb, pgsql, sqlite or sqlsrv)")]
    UnsupportedDriver(String),

    /// A parser operation was invoked before a connection was attached. Fatal.
    #[error("no database connection attached")]
    ConnectionMissing,

    /// The requested table is absent from the live catalog.
    #[error("table '{0}' not found in the database")]
    TableNotFound(String),

    /// A catalog query errored. Carries the SQL and the driver message; never retried.
    #[error("catalog query failed: {message}\n  sql: {sql}")]
    QueryFailed { sql: String, message: String },

    /// The FK graph contains at least one cycle; carries the first cycle's node walk.
    #[error("circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    /// Host-side write conflict when overwrite was not requested.
    /// Recovered by skip-and-report.
    #[error("file already exists: {0} (use --force to overwrite)")]
    FileAlreadyExists(String),

    /// A recognized configuration key carries a bad value. Surfaced at boot.
    #[error("invalid configuration for '{key}': {message}")]
    InvalidConfiguration { key: String, message: String },
}

impl SchemaError {
    /// Shorthand used by every parser when a catalog query errors.
    pub fn query_failed(sql: impl Into<String>, message: impl ToString) -> Self {
        SchemaError::QueryFailed {
            sql: sql.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_dependency_message_joins_cycle() {
        let err = SchemaError::CircularDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(
            err.to_string(),
            "circular dependency detected: a -> b -> a"
        );
    }

    #[test]
    fn query_failed_carries_sql_and_message() {
        let err = SchemaError::query_failed("SELECT 1", "boom");
        let msg = err.to_string();
        assert!(msg.contains("SELECT 1"));
        assert!(msg.contains("boom"));
    }
}
