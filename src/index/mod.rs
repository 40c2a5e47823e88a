//! Per-archive index management.
//!
//! This module provides the index lifecycle around the trigram store:
//!
//! - [`build`] - Ingestion of a zip archive into an on-disk index
//! - [`manifest`] - The `IndexRef` descriptor and manifest codec
//! - [`search`] - The open [`Index`] handle and the search driver
//! - [`stats`] - Archive statistics collected during ingestion
//! - [`types`] - Options, matches, responses, exclusion records
//!
//! ## Artifact layout
//!
//! ```text
//! <dir>/
//! ├── manifest              # length-prefixed binary {time, slug}
//! ├── excluded_files.json   # [{Filename, Reason}] in encounter order
//! ├── raw/<path>            # gzip-compressed original bytes per file
//! └── tri/                  # trigram store (names, dictionary, postings)
//! ```
//!
//! An index is immutable once built. `Index::open` gives a handle that
//! any number of threads may search concurrently; `close` and `destroy`
//! serialize against in-flight searches.

pub mod build;
pub mod manifest;
pub mod search;
pub mod stats;
pub mod types;

pub use build::build_from_zip;
pub use manifest::{read, IndexRef};
pub use search::Index;
pub use stats::ArchiveStats;
pub use types::{
    ExcludedFile, FileMatch, IndexOptions, Match, SearchOptions, SearchResponse,
};
