use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::warn;

use crate::domain::error::SchemaError;
use crate::domain::schema::GeneratedFile;

#[cfg(feature = "cli")]
pub mod cli_summary;
pub mod migrations;
pub mod models;

/// What happened to each produced file on disk.
#[derive(Debug, Default, Serialize)]
pub struct WriteOutcome {
    pub written: Vec<String>,
    /// Files that already existed and were left untouched (no `--force`).
    pub skipped: Vec<String>,
}

/// Persist emitter output. The core only ever produces `(filename, body)`
/// pairs; this is the host side. Conflicts without `force` are recovered by
/// skip-and-report rather than aborting the run.
pub fn write_files(files: &[GeneratedFile], dir: &str, force: bool) -> Result<WriteOutcome> {
    std::fs::create_dir_all(dir)?;

    let mut outcome = WriteOutcome::default();
    for file in files {
        let path = Path::new(dir).join(&file.filename);
        if path.exists() && !force {
            warn!("{}", SchemaError::FileAlreadyExists(path.display().to_string()));
            outcome.skipped.push(file.filename.clone());
            continue;
        }
        std::fs::write(&path, &file.contents)?;
        outcome.written.push(file.filename.clone());
    }
    Ok(outcome)
}
