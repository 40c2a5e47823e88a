//! Streaming trigram index writer.

use crate::error::Result;
use crate::tri::{
    FileId, Trigram, DICT_FILE, DICT_MAGIC, DICT_VERSION, NAMES_FILE, POSTINGS_FILE,
};
use crate::utils::encoding::delta_encode;
use crate::utils::trigram::TrigramScanner;
use log::debug;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Files longer than this are refused outright.
const MAX_FILE_LEN: u64 = 1 << 30;

/// Files with a line longer than this are likely generated or minified
/// and are refused.
const MAX_LINE_LEN: u64 = 2000;

/// Distinct-trigram ceiling per file; genuine source stays well under it.
const MAX_TEXT_TRIGRAMS: usize = 20_000;

/// Result of feeding one file to the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The file was accepted under this ID.
    Added(FileId),
    /// The writer refused the file; the reason is a short human-readable tag.
    Skipped(&'static str),
}

/// Accumulates one index in memory, then serializes it with `flush`.
///
/// File IDs are dense and assigned in add order; a refused file consumes
/// no ID and contributes no postings. Posting lists come out sorted and
/// duplicate-free by construction, because each accepted file merges its
/// distinct trigrams exactly once under a strictly increasing ID.
pub struct IndexWriter {
    dir: PathBuf,
    names: Vec<String>,
    postings: BTreeMap<Trigram, Vec<FileId>>,
}

impl IndexWriter {
    /// Initialize an empty index under `dir`, creating the directory.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            names: Vec::new(),
            postings: BTreeMap::new(),
        })
    }

    /// Stream one file into the index.
    ///
    /// The reader is consumed in 64 KiB chunks; size and trigram-count
    /// refusals trigger as soon as the limit is crossed, without draining
    /// the rest of the input.
    pub fn add<R: Read>(&mut self, name: &str, mut r: R) -> Result<AddOutcome> {
        let mut scanner = TrigramScanner::new();
        let mut buf = vec![0u8; 64 * 1024];

        loop {
            let n = r.read(&mut buf)?;
            if n == 0 {
                break;
            }
            scanner.update(&buf[..n]);

            if scanner.total_len() > MAX_FILE_LEN {
                debug!("tri: refusing {name}: file too large");
                return Ok(AddOutcome::Skipped("file too large"));
            }
            if scanner.distinct_trigrams() > MAX_TEXT_TRIGRAMS {
                debug!("tri: refusing {name}: too many trigrams");
                return Ok(AddOutcome::Skipped("too many trigrams"));
            }
        }

        if scanner.saw_nul() {
            debug!("tri: refusing {name}: binary content");
            return Ok(AddOutcome::Skipped("binary content"));
        }
        if scanner.max_line_len() > MAX_LINE_LEN {
            debug!("tri: refusing {name}: line too long");
            return Ok(AddOutcome::Skipped("line too long"));
        }

        let file_id = self.names.len() as FileId;
        self.names.push(name.to_string());
        for trigram in scanner.into_trigrams() {
            self.postings.entry(trigram).or_default().push(file_id);
        }

        Ok(AddOutcome::Added(file_id))
    }

    /// Number of files accepted so far.
    pub fn file_count(&self) -> usize {
        self.names.len()
    }

    /// Serialize the name table, dictionary, and posting lists, sealing
    /// the writer.
    pub fn flush(self) -> Result<()> {
        self.write_names()?;
        self.write_postings()?;
        debug!(
            "tri: flushed {} files, {} distinct trigrams to {}",
            self.names.len(),
            self.postings.len(),
            self.dir.display()
        );
        Ok(())
    }

    fn write_names(&self) -> Result<()> {
        let path = self.dir.join(NAMES_FILE);
        let mut file = BufWriter::with_capacity(65536, File::create(path)?);

        file.write_all(&(self.names.len() as u32).to_le_bytes())?;
        for name in &self.names {
            let bytes = name.as_bytes();
            file.write_all(&(bytes.len() as u32).to_le_bytes())?;
            file.write_all(bytes)?;
        }

        file.flush()?;
        Ok(())
    }

    fn write_postings(&self) -> Result<()> {
        let dict_path = self.dir.join(DICT_FILE);
        let postings_path = self.dir.join(POSTINGS_FILE);

        let mut dict_file = BufWriter::with_capacity(65536, File::create(dict_path)?);
        let mut postings_file = BufWriter::with_capacity(65536, File::create(postings_path)?);

        dict_file.write_all(&DICT_MAGIC.to_le_bytes())?;
        dict_file.write_all(&DICT_VERSION.to_le_bytes())?;
        dict_file.write_all(&(self.postings.len() as u32).to_le_bytes())?;

        let mut postings_offset: u64 = 0;
        let mut encoded = Vec::new();

        for (&trigram, file_ids) in &self.postings {
            encoded.clear();
            delta_encode(file_ids, &mut encoded);

            dict_file.write_all(&trigram.to_le_bytes())?;
            dict_file.write_all(&postings_offset.to_le_bytes())?;
            dict_file.write_all(&(encoded.len() as u32).to_le_bytes())?;
            dict_file.write_all(&(file_ids.len() as u32).to_le_bytes())?;

            postings_file.write_all(&encoded)?;
            postings_offset += encoded.len() as u64;
        }

        dict_file.flush()?;
        postings_file.flush()?;
        Ok(())
    }
}
