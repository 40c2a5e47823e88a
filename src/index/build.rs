//! Zip-archive ingestion.
//!
//! Entries stream through a tee: one arm feeds the trigram writer, the
//! other a gzip encoder writing the raw store, so each entry is read
//! once. Filtering happens before the tee; files the trigram writer
//! itself refuses have their raw copy removed again so the raw store and
//! the exclusion log never overlap.

use crate::error::Result;
use crate::index::manifest::IndexRef;
use crate::index::stats::ArchiveStats;
use crate::index::types::{
    ExcludedFile, IndexOptions, REASON_BINARY, REASON_DOT_FILE, REASON_INVALID_MODE,
    REASON_NOT_TEXT,
};
use crate::tri::writer::{AddOutcome, IndexWriter};
use crate::utils::text::{valid_utf8_prefix, FILE_PEEK_SIZE};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, info};
use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::time::SystemTime;
use zip::ZipArchive;

pub(crate) const EXCLUDED_FILE: &str = "excluded_files.json";
pub(crate) const RAW_DIR: &str = "raw";
pub(crate) const TRI_DIR: &str = "tri";

/// Build an index for a zip archive under the (not yet existing)
/// directory `dst`.
///
/// Returns the index descriptor and statistics over every archive entry.
/// Filesystem errors are fatal and may leave a partial `dst` behind for
/// the caller to reap.
pub fn build_from_zip(
    opt: &IndexOptions,
    archive: &[u8],
    dst: &Path,
    slug: &str,
) -> Result<(IndexRef, ArchiveStats)> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;

    fs::create_dir(dst)?;
    fs::create_dir(dst.join(RAW_DIR))?;

    let stats = index_archive(opt, dst, &mut zip)?;

    let index_ref = IndexRef::new(SystemTime::now(), slug.to_string(), dst.to_path_buf());
    index_ref.write_manifest()?;

    info!(
        "built index {} at {}: {} files, {} bytes in archive",
        slug,
        dst.display(),
        stats.total_files,
        stats.total_bytes
    );

    Ok((index_ref, stats))
}

fn index_archive(
    opt: &IndexOptions,
    dst: &Path,
    zip: &mut ZipArchive<Cursor<&[u8]>>,
) -> Result<ArchiveStats> {
    let mut writer = IndexWriter::create(&dst.join(TRI_DIR))?;
    let mut stats = ArchiveStats::new();
    let mut excluded: Vec<ExcludedFile> = Vec::new();
    // Prefixes of subtrees disabled by a special or dot directory.
    let mut skipped_dirs: Vec<String> = Vec::new();

    'entries: for i in 0..zip.len() {
        let (name, is_dir, size, unix_mode) = {
            let entry = zip.by_index_raw(i)?;
            (
                entry.name().to_string(),
                entry.is_dir(),
                entry.size(),
                entry.unix_mode(),
            )
        };

        stats.add_entry(&name, size, is_dir);

        for prefix in &skipped_dirs {
            if name.len() > prefix.len() && name.starts_with(prefix) {
                continue 'entries;
            }
        }

        // Entries that are not part of the source tree at all (.git and
        // friends) are dropped without a log record.
        if opt.special_files.iter().any(|s| s == &name) {
            if is_dir {
                skipped_dirs.push(name);
            }
            continue;
        }

        if opt.exclude_dot_files && name.starts_with('.') {
            excluded.push(ExcludedFile {
                filename: name.clone(),
                reason: REASON_DOT_FILE.to_string(),
            });
            if is_dir {
                skipped_dirs.push(name);
            }
            continue;
        }

        if is_dir {
            fs::create_dir_all(dst.join(RAW_DIR).join(&name))?;
            continue;
        }

        if !is_regular_mode(unix_mode) || zip.by_index_raw(i)?.enclosed_name().is_none() {
            excluded.push(ExcludedFile {
                filename: name,
                reason: REASON_INVALID_MODE.to_string(),
            });
            continue;
        }

        if !is_text_entry(zip, i)? {
            excluded.push(ExcludedFile {
                filename: name,
                reason: REASON_NOT_TEXT.to_string(),
            });
            continue;
        }

        if let Some(reason) = add_entry(&mut writer, dst, zip, i, &name)? {
            debug!("index writer refused {name}: {reason}");
            excluded.push(ExcludedFile {
                filename: name,
                reason: REASON_BINARY.to_string(),
            });
        }
    }

    serde_json::to_writer(File::create(dst.join(EXCLUDED_FILE))?, &excluded)
        .map_err(std::io::Error::from)?;

    writer.flush()?;
    stats.generate_summary();

    Ok(stats)
}

/// File-type bits other than "regular file" disqualify an entry.
/// Archives written without unix modes carry no type bits and pass.
fn is_regular_mode(unix_mode: Option<u32>) -> bool {
    match unix_mode {
        Some(mode) => {
            let file_type = mode & 0o170000;
            file_type == 0 || file_type == 0o100000
        }
        None => true,
    }
}

/// Apply the UTF-8 prefix gate to an entry's first 512 bytes.
fn is_text_entry(zip: &mut ZipArchive<Cursor<&[u8]>>, i: usize) -> Result<bool> {
    let mut entry = zip.by_index(i)?;
    let mut buf = [0u8; FILE_PEEK_SIZE];

    let mut n = 0;
    while n < buf.len() {
        let read = entry.read(&mut buf[n..])?;
        if read == 0 {
            break;
        }
        n += read;
    }

    // A short read means the whole file is in the buffer and must be
    // fully valid.
    Ok(valid_utf8_prefix(&buf[..n], n < FILE_PEEK_SIZE))
}

/// Stream one accepted entry into the raw store and the trigram writer.
/// Returns the writer's refusal reason, if any; a refused entry's raw
/// copy is removed.
fn add_entry(
    writer: &mut IndexWriter,
    dst: &Path,
    zip: &mut ZipArchive<Cursor<&[u8]>>,
    i: usize,
    name: &str,
) -> Result<Option<&'static str>> {
    let raw_path = dst.join(RAW_DIR).join(name);
    if let Some(parent) = raw_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut gz = GzEncoder::new(File::create(&raw_path)?, Compression::default());
    let outcome = {
        let entry = zip.by_index(i)?;
        writer.add(
            name,
            TeeReader {
                r: entry,
                w: &mut gz,
            },
        )?
    };

    match outcome {
        AddOutcome::Added(_) => {
            gz.finish()?;
            Ok(None)
        }
        AddOutcome::Skipped(reason) => {
            drop(gz);
            fs::remove_file(&raw_path)?;
            Ok(Some(reason))
        }
    }
}

/// Mirrors every byte read from `r` into `w`.
struct TeeReader<R, W> {
    r: R,
    w: W,
}

impl<R: Read, W: Write> Read for TeeReader<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.r.read(buf)?;
        if n > 0 {
            self.w.write_all(&buf[..n])?;
        }
        Ok(n)
    }
}
