//! The `IndexRef` descriptor and its on-disk manifest.
//!
//! The manifest is a u32 length prefix followed by a bincode record of
//! the build time and slug. The directory path is derived from where the
//! manifest lives and is never serialized.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub(crate) const MANIFEST_FILE: &str = "manifest";

#[derive(Debug, Serialize, Deserialize)]
struct ManifestRecord {
    time: SystemTime,
    slug: String,
}

/// Lightweight descriptor of an index directory. Cheap to clone; does not
/// hold any file handles.
#[derive(Debug, Clone)]
pub struct IndexRef {
    time: SystemTime,
    slug: String,
    dir: PathBuf,
}

impl IndexRef {
    pub(crate) fn new(time: SystemTime, slug: String, dir: PathBuf) -> Self {
        Self { time, slug, dir }
    }

    pub fn time(&self) -> SystemTime {
        self.time
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Open this index for searching.
    pub fn open(&self) -> Result<crate::index::Index> {
        crate::index::Index::open_ref(self.clone())
    }

    /// Recursively delete the index directory. Deleting an
    /// already-removed index is a no-op.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn write_manifest(&self) -> Result<()> {
        let record = ManifestRecord {
            time: self.time,
            slug: self.slug.clone(),
        };
        let encoded = bincode::serialize(&record)?;

        let mut w = BufWriter::new(File::create(self.dir.join(MANIFEST_FILE))?);
        w.write_all(&(encoded.len() as u32).to_le_bytes())?;
        w.write_all(&encoded)?;
        w.flush()?;
        Ok(())
    }
}

/// Load the manifest for an index directory.
///
/// On failure the error still carries an `IndexRef` with the directory
/// populated, so callers can clean up a half-built or damaged index.
pub fn read(dir: &Path) -> Result<IndexRef> {
    let partial = IndexRef::new(SystemTime::UNIX_EPOCH, String::new(), dir.to_path_buf());

    let file = match File::open(dir.join(MANIFEST_FILE)) {
        Ok(f) => f,
        Err(source) => {
            return Err(Error::ManifestMissing {
                partial: Box::new(partial),
                source,
            })
        }
    };

    match decode(file) {
        Ok(record) => Ok(IndexRef::new(record.time, record.slug, dir.to_path_buf())),
        Err(source) => Err(Error::ManifestCorrupt {
            partial: Box::new(partial),
            source,
        }),
    }
}

fn decode(file: File) -> std::result::Result<ManifestRecord, bincode::Error> {
    let mut r = BufReader::new(file);

    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    let mut encoded = vec![0u8; len];
    r.read_exact(&mut encoded)?;
    bincode::deserialize(&encoded)
}
