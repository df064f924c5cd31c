//! Diff ingestion: source-host file records in, normalized added/removed line sets out.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One file entry as delivered by the source host's commit-detail API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFileChange {
    pub filename: String,
    #[serde(default)]
    pub status: FileStatus,
    /// Absent or empty for binary files and for diffs the host considers too large.
    #[serde(default)]
    pub patch: Option<String>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    #[default]
    Modified,
    Removed,
    Renamed,
    /// Any status the host reports that we do not model (`copied`, `changed`, ...).
    #[serde(untagged)]
    Other(String),
}

/// One file's change in one commit, reduced to the lines that moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    pub filename: String,
    pub status: FileStatus,
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
    pub added_lines: Vec<String>,
    pub removed_lines: Vec<String>,
    #[serde(rename = "patch")]
    pub raw_patch: String,
}

/// Turn the host's file list into [`FileDiff`]s.
///
/// Entries without patch text (absent, `null` or empty) are dropped without
/// error. Total over its input.
pub fn ingest(raw_files: &[RawFileChange]) -> Vec<FileDiff> {
    raw_files
        .iter()
        .filter_map(|file| {
            let Some(patch) = file.patch.as_deref().filter(|p| !p.is_empty()) else {
                debug!(filename = %file.filename, "No patch text, skipping file");
                return None;
            };
            let (added_lines, removed_lines) = split_patch(patch);
            Some(FileDiff {
                filename: file.filename.clone(),
                status: file.status.clone(),
                additions: file.additions,
                deletions: file.deletions,
                changes: file.changes,
                added_lines,
                removed_lines,
                raw_patch: patch.to_string(),
            })
        })
        .collect()
}

/// Classify patch lines; `+++`/`---` file headers, hunk headers and context are dropped.
fn split_patch(patch: &str) -> (Vec<String>, Vec<String>) {
    let mut added = Vec::new();
    let mut removed = Vec::new();
    for line in patch.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with("+++") || line.starts_with("---") {
            continue;
        }
        if let Some(rest) = line.strip_prefix('+') {
            added.push(rest.to_string());
        } else if let Some(rest) = line.strip_prefix('-') {
            removed.push(rest.to_string());
        }
    }
    (added, removed)
}
