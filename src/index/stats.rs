//! Archive statistics collected during ingestion.
//!
//! Every archive entry is reported here, including ones the index later
//! excludes; the summary describes the archive, not the index.

use serde::Serialize;
use std::collections::HashMap;

/// Number of extensions kept in the summary.
const TOP_EXTENSIONS: usize = 10;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExtensionCount {
    pub extension: String,
    pub files: u64,
}

/// Aggregate statistics over all entries of one archive.
#[derive(Debug, Default, Serialize)]
pub struct ArchiveStats {
    pub total_files: u64,
    pub total_dirs: u64,
    pub total_bytes: u64,
    extensions: HashMap<String, u64>,
    /// Most common extensions, descending; fixed by `generate_summary`.
    pub top_extensions: Vec<ExtensionCount>,
}

impl ArchiveStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one archive entry with its uncompressed size.
    pub fn add_entry(&mut self, name: &str, size: u64, is_dir: bool) {
        if is_dir {
            self.total_dirs += 1;
            return;
        }
        self.total_files += 1;
        self.total_bytes += size;

        let ext = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => ext.to_lowercase(),
            _ => String::from("(none)"),
        };
        *self.extensions.entry(ext).or_insert(0) += 1;
    }

    /// Fix the top-extensions list from the accumulated counts.
    pub fn generate_summary(&mut self) {
        let mut counts: Vec<ExtensionCount> = self
            .extensions
            .iter()
            .map(|(extension, &files)| ExtensionCount {
                extension: extension.clone(),
                files,
            })
            .collect();
        counts.sort_by(|a, b| b.files.cmp(&a.files).then(a.extension.cmp(&b.extension)));
        counts.truncate(TOP_EXTENSIONS);
        self.top_extensions = counts;
    }

    /// Distinct extensions seen so far.
    pub fn extension_count(&self) -> usize {
        self.extensions.len()
    }
}
