//! CSV ingestion pipeline.
//!
//! Turns a directory of dated `activities_YYYYMMDD.csv` extracts into
//! validated rows in the activity store. A malformed row is counted and
//! skipped, never fatal; a missing directory or an empty match set
//! aborts the whole run. Re-running against already-imported files is a
//! no-op at the storage layer (insert-if-absent by event_id).

use crate::activity::RawActivityRow;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::store::ActivityStore;
use std::fs;
use std::path::{Path, PathBuf};

/// Valid rows are flushed to the store in batches of this size; a
/// partial final batch is flushed as well.
pub const BATCH_SIZE: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub file: String,
    /// Rows that passed validation and were handed to the store.
    /// Duplicates of already-stored event_ids still count as processed;
    /// the store collapses them silently.
    pub processed: u64,
    /// Rows rejected by validation or CSV decoding.
    pub skipped: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub files: Vec<FileReport>,
    pub total_processed: u64,
    pub total_skipped: u64,
}

/// Select `activities_` + 8 digits + `.csv` files, sorted
/// lexicographically — chronological order, given the fixed-width date.
pub fn discover(data_dir: &Path) -> AnalyticsResult<Vec<PathBuf>> {
    if !data_dir.is_dir() {
        return Err(AnalyticsError::DataDirMissing(data_dir.to_path_buf()));
    }
    let mut files: Vec<PathBuf> = fs::read_dir(data_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(is_activity_file)
        })
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(AnalyticsError::NoInputFiles(data_dir.to_path_buf()));
    }
    Ok(files)
}

fn is_activity_file(name: &str) -> bool {
    let Some(stamp) = name
        .strip_prefix("activities_")
        .and_then(|rest| rest.strip_suffix(".csv"))
    else {
        return false;
    };
    stamp.len() == 8 && stamp.bytes().all(|b| b.is_ascii_digit())
}

/// Stream one file into the store. Header-driven, so column order in
/// the extract does not matter.
pub fn import_file(store: &ActivityStore, path: &Path) -> AnalyticsResult<FileReport> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let mut processed = 0u64;
    let mut skipped = 0u64;
    let mut batch = Vec::with_capacity(BATCH_SIZE);

    for result in reader.deserialize::<RawActivityRow>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                log::debug!("skipping undecodable row in {}: {err}", path.display());
                skipped += 1;
                continue;
            }
        };
        match raw.normalize() {
            Some(event) => {
                batch.push(event);
                if batch.len() >= BATCH_SIZE {
                    store.insert_events(&batch)?;
                    processed += batch.len() as u64;
                    batch.clear();
                }
            }
            None => skipped += 1,
        }
    }
    if !batch.is_empty() {
        store.insert_events(&batch)?;
        processed += batch.len() as u64;
    }

    let file = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    Ok(FileReport {
        file,
        processed,
        skipped,
    })
}

/// Full pipeline run: ensure the schema, discover extracts, import each
/// in order. Row failures are tallied per file; file discovery and
/// batch-write failures are fatal and leave prior commits in place.
pub fn run(store: &ActivityStore, data_dir: &Path) -> AnalyticsResult<ImportSummary> {
    store.migrate()?;
    let files = discover(data_dir)?;

    let mut summary = ImportSummary::default();
    for path in &files {
        let report = import_file(store, path)?;
        log::info!(
            "{}: {} rows processed, {} skipped (malformed)",
            report.file,
            report.processed,
            report.skipped
        );
        summary.total_processed += report.processed;
        summary.total_skipped += report.skipped;
        summary.files.push(report);
    }
    log::info!(
        "import done: {} processed, {} skipped across {} files",
        summary.total_processed,
        summary.total_skipped,
        summary.files.len()
    );
    Ok(summary)
}
