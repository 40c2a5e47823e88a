//! # zipdex - Archive Code Search Index
//!
//! zipdex builds and searches trigram indexes over zip archives of source
//! trees. Each archive becomes an immutable on-disk artifact that supports
//! fast regular-expression search across all indexed files, returning
//! matched lines with surrounding context.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - Index building, lifecycle, and the search driver
//! - [`tri`] - The trigram posting-list store (writer, reader, query planner)
//! - [`grep`] - Line-oriented regex scanning with context windows
//! - [`utils`] - Utility functions (trigram extraction, encodings, text gate)
//!
//! ## Index Structure
//!
//! The on-disk artifact layout:
//!
//! ```text
//! <dir>/
//! ├── manifest              # length-prefixed binary {time, slug}
//! ├── excluded_files.json   # files skipped during build, with reasons
//! ├── raw/                  # gzip-compressed copies of indexed files
//! │   └── <path>
//! └── tri/
//!     ├── names.bin         # file-ID -> path table
//!     ├── grams.dict        # trigram dictionary
//!     └── grams.postings    # delta-encoded posting lists
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use zipdex::index::{build_from_zip, Index, IndexOptions, SearchOptions};
//!
//! let opts = IndexOptions::default();
//! let (index_ref, stats) = build_from_zip(&opts, &archive_bytes, dst, "my-slug")?;
//!
//! let index = Index::open(index_ref.dir())?;
//! let resp = index.search("fn main", "my-slug", &SearchOptions::default())?;
//! for file in &resp.matches {
//!     println!("{}: {} matches", file.filename, file.matches.len());
//! }
//! ```
//!
//! Indexes are write-once: to pick up new content, build a fresh index and
//! destroy the old one. Any number of searches may run concurrently against
//! an open index; `close` and `destroy` wait for them to drain.

pub mod error;
pub mod grep;
pub mod index;
pub mod tri;
pub mod utils;

pub use error::{Error, Result};
