use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::comparator::{self, MigrationDrift, SchemaDiff};
use crate::domain::ports::MigrationScanner;
use crate::domain::schema::{DriverTag, Table};

// ─── Drift Service ───

/// Compares the live schema against the script archive (via the scanner
/// collaborator) or against another schema set directly.
#[derive(Default)]
pub struct DriftService;

#[derive(Debug, Serialize)]
pub struct DriftReport {
    pub report_id: String,
    /// Driver the live schema was read with.
    pub driver: String,
    pub created_at: String,
    pub drift: MigrationDrift,
}

impl DriftReport {
    pub fn is_in_sync(&self) -> bool {
        self.drift.is_in_sync()
    }
}

impl DriftService {
    pub fn new() -> Self {
        Self
    }

    /// Migration-aware drift: live tables vs. what the archive declares.
    pub fn against_migrations(
        &self,
        tables: &[Table],
        scanner: &dyn MigrationScanner,
        driver: DriverTag,
    ) -> Result<DriftReport> {
        let known = scanner.scan()?;
        let drift = comparator::compare_with_migrations(tables, &known);
        Ok(DriftReport {
            report_id: format!(
                "drift_{}_{}",
                Utc::now().format("%Y%m%d_%H%M%S"),
                Uuid::new_v4().simple()
            ),
            driver: driver.as_str().to_string(),
            created_at: Utc::now().to_rfc3339(),
            drift,
        })
    }

    /// Direct structural diff between two parsed schema sets.
    pub fn direct(&self, current: &[Table], target: &[Table]) -> SchemaDiff {
        comparator::compare(current, target)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
