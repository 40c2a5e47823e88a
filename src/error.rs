use crate::index::manifest::IndexRef;
use thiserror::Error;

/// Errors produced by index builds, lifecycle operations, and searches.
#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot read archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("search exceeds limit on matches: {0}")]
    LimitExceeded(usize),

    /// The manifest file could not be opened. The partial ref still carries
    /// the directory path so callers can reap it.
    #[error("index manifest missing in {}", .partial.dir().display())]
    ManifestMissing {
        partial: Box<IndexRef>,
        #[source]
        source: std::io::Error,
    },

    /// The manifest file exists but failed to decode.
    #[error("index manifest corrupt in {}", .partial.dir().display())]
    ManifestCorrupt {
        partial: Box<IndexRef>,
        #[source]
        source: bincode::Error,
    },

    #[error("manifest encoding failed: {0}")]
    ManifestEncode(#[from] bincode::Error),

    #[error("corrupt trigram index: {0}")]
    TriCorrupt(String),

    #[error("index is closed")]
    IndexClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
