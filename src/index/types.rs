use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard cap on matches collected by a single search.
pub const MATCH_LIMIT: usize = 1000;

pub(crate) const REASON_DOT_FILE: &str = "Dot files are excluded.";
pub(crate) const REASON_INVALID_MODE: &str = "Invalid file mode.";
pub(crate) const REASON_NOT_TEXT: &str = "Not a text file.";
pub(crate) const REASON_BINARY: &str = "Binary files are excluded.";

/// Build-time filtering options.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Exclude entries whose name starts with a dot.
    pub exclude_dot_files: bool,
    /// Entry names that are not part of the source tree (VCS metadata and
    /// the like); matching entries and their subtrees are skipped without
    /// being logged.
    pub special_files: Vec<String>,
}

/// Per-search options.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub ignore_case: bool,
    /// Lines of context captured on each side of a matched line.
    pub lines_of_context: usize,
    /// When non-empty, only files whose path matches this regex are opened.
    pub file_regexp: String,
    /// Reserved; accepted but currently has no effect on results.
    pub ignore_comments: bool,
    /// Number of matched files to skip before collecting.
    pub offset: usize,
    /// Maximum number of files to collect matches for; 0 means unlimited.
    pub limit: usize,
}

/// One matched line with its context.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Match {
    pub line: String,
    /// 1-based.
    pub line_number: usize,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

/// All collected matches within one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileMatch {
    pub filename: String,
    pub matches: Vec<Match>,
}

/// Result of one search call.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub matches: Vec<FileMatch>,
    pub slug: String,
    /// Files with at least one matching line, including files skipped by
    /// offset/limit.
    pub files_with_match: usize,
    #[serde(skip)]
    pub files_opened: usize,
    #[serde(skip)]
    pub duration: Duration,
    pub revision: String,
}

/// A file skipped during ingestion, with the policy reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ExcludedFile {
    pub filename: String,
    pub reason: String,
}
