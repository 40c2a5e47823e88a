//! Memory-mapped trigram index reader.

use crate::error::{Error, Result};
use crate::tri::query::Query;
use crate::tri::{
    FileId, Trigram, DICT_FILE, DICT_MAGIC, DICT_VERSION, NAMES_FILE, POSTINGS_FILE,
};
use crate::utils::encoding::delta_decode;
use memmap2::Mmap;
use roaring::RoaringBitmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

struct DictEntry {
    trigram: Trigram,
    offset: u64,
    length: u32,
    #[allow(dead_code)]
    doc_freq: u32,
}

/// Read-only view of a flushed trigram index.
pub struct IndexReader {
    names: Vec<String>,
    /// Sorted by trigram; the writer serializes from a BTreeMap.
    dict: Vec<DictEntry>,
    /// None when the index holds no postings at all.
    postings: Option<Mmap>,
}

impl IndexReader {
    /// Open the store files under `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        let names = read_names(&dir.join(NAMES_FILE))?;
        let dict = read_dict(&dir.join(DICT_FILE))?;

        let postings_file = File::open(dir.join(POSTINGS_FILE))?;
        let postings = if postings_file.metadata()?.len() == 0 {
            None
        } else {
            Some(unsafe { Mmap::map(&postings_file)? })
        };

        Ok(Self {
            names,
            dict,
            postings,
        })
    }

    /// The path recorded for a file ID, as it appeared in the archive.
    pub fn name(&self, file_id: FileId) -> Option<&str> {
        self.names.get(file_id as usize).map(String::as_str)
    }

    /// Number of files in the index.
    pub fn file_count(&self) -> u32 {
        self.names.len() as u32
    }

    /// Evaluate a trigram expression, returning candidate file IDs in
    /// ascending order.
    pub fn posting_query(&self, query: &Query) -> Vec<FileId> {
        self.eval(query).iter().collect()
    }

    fn eval(&self, query: &Query) -> RoaringBitmap {
        match query {
            Query::All => (0..self.file_count()).collect(),
            Query::Trigram(t) => self.postings_for(*t),
            Query::And(children) => {
                let mut result: Option<RoaringBitmap> = None;
                for child in children {
                    let set = self.eval(child);
                    result = Some(match result {
                        Some(acc) => acc & set,
                        None => set,
                    });
                    if result.as_ref().is_some_and(RoaringBitmap::is_empty) {
                        break;
                    }
                }
                result.unwrap_or_else(|| (0..self.file_count()).collect())
            }
            Query::Or(children) => {
                let mut result = RoaringBitmap::new();
                for child in children {
                    result |= self.eval(child);
                }
                result
            }
        }
    }

    fn postings_for(&self, trigram: Trigram) -> RoaringBitmap {
        let Some(postings) = &self.postings else {
            return RoaringBitmap::new();
        };

        if let Ok(i) = self.dict.binary_search_by_key(&trigram, |e| e.trigram) {
            let entry = &self.dict[i];
            let start = entry.offset as usize;
            let end = start + entry.length as usize;
            if end <= postings.len() {
                return delta_decode(&postings[start..end]).into_iter().collect();
            }
        }
        RoaringBitmap::new()
    }
}

fn read_names(path: &Path) -> Result<Vec<String>> {
    let mut file = BufReader::new(File::open(path)?);
    let mut buf4 = [0u8; 4];

    file.read_exact(&mut buf4)?;
    let count = u32::from_le_bytes(buf4) as usize;

    let mut names = Vec::with_capacity(count);
    for _ in 0..count {
        file.read_exact(&mut buf4)?;
        let len = u32::from_le_bytes(buf4) as usize;

        let mut bytes = vec![0u8; len];
        file.read_exact(&mut bytes)?;
        let name = String::from_utf8(bytes)
            .map_err(|_| Error::TriCorrupt("name table is not UTF-8".into()))?;
        names.push(name);
    }

    Ok(names)
}

fn read_dict(path: &Path) -> Result<Vec<DictEntry>> {
    let mut file = BufReader::new(File::open(path)?);
    let mut buf4 = [0u8; 4];
    let mut buf8 = [0u8; 8];

    file.read_exact(&mut buf4)?;
    let magic = u32::from_le_bytes(buf4);
    if magic != DICT_MAGIC {
        return Err(Error::TriCorrupt(format!(
            "bad dictionary magic {magic:#010x}"
        )));
    }

    file.read_exact(&mut buf4)?;
    let version = u32::from_le_bytes(buf4);
    if version != DICT_VERSION {
        return Err(Error::TriCorrupt(format!(
            "unsupported dictionary version {version}"
        )));
    }

    file.read_exact(&mut buf4)?;
    let count = u32::from_le_bytes(buf4) as usize;

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        file.read_exact(&mut buf4)?;
        let trigram = u32::from_le_bytes(buf4);

        file.read_exact(&mut buf8)?;
        let offset = u64::from_le_bytes(buf8);

        file.read_exact(&mut buf4)?;
        let length = u32::from_le_bytes(buf4);

        file.read_exact(&mut buf4)?;
        let doc_freq = u32::from_le_bytes(buf4);

        entries.push(DictEntry {
            trigram,
            offset,
            length,
            doc_freq,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tri::writer::{AddOutcome, IndexWriter};
    use crate::tri::{bytes_to_trigram, Query};
    use std::io::Cursor;

    fn build(files: &[(&str, &[u8])]) -> (tempfile::TempDir, IndexReader) {
        let dir = tempfile::tempdir().unwrap();
        let mut w = IndexWriter::create(dir.path()).unwrap();
        for (name, content) in files {
            assert!(matches!(
                w.add(name, Cursor::new(content)).unwrap(),
                AddOutcome::Added(_)
            ));
        }
        w.flush().unwrap();
        let r = IndexReader::open(dir.path()).unwrap();
        (dir, r)
    }

    #[test]
    fn test_roundtrip_names_and_postings() {
        let (_dir, r) = build(&[
            ("a.txt", b"hello world"),
            ("b.txt", b"hello there"),
            ("c.txt", b"goodbye"),
        ]);

        assert_eq!(r.file_count(), 3);
        assert_eq!(r.name(0), Some("a.txt"));
        assert_eq!(r.name(2), Some("c.txt"));
        assert_eq!(r.name(3), None);

        let hel = Query::Trigram(bytes_to_trigram(b'h', b'e', b'l'));
        assert_eq!(r.posting_query(&hel), vec![0, 1]);

        let bye = Query::Trigram(bytes_to_trigram(b'b', b'y', b'e'));
        assert_eq!(r.posting_query(&bye), vec![2]);
    }

    #[test]
    fn test_and_or_evaluation() {
        let (_dir, r) = build(&[
            ("a.txt", b"hello world"),
            ("b.txt", b"hello there"),
            ("c.txt", b"world peace"),
        ]);

        let hel = Query::Trigram(bytes_to_trigram(b'h', b'e', b'l'));
        let wor = Query::Trigram(bytes_to_trigram(b'w', b'o', b'r'));

        assert_eq!(
            r.posting_query(&Query::And(vec![hel.clone(), wor.clone()])),
            vec![0]
        );
        assert_eq!(
            r.posting_query(&Query::Or(vec![hel, wor])),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_all_query_and_absent_trigram() {
        let (_dir, r) = build(&[("a.txt", b"abc"), ("b.txt", b"def")]);

        assert_eq!(r.posting_query(&Query::All), vec![0, 1]);
        let zzz = Query::Trigram(bytes_to_trigram(b'z', b'z', b'z'));
        assert_eq!(r.posting_query(&zzz), Vec::<FileId>::new());
    }

    #[test]
    fn test_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let w = IndexWriter::create(dir.path()).unwrap();
        w.flush().unwrap();

        let r = IndexReader::open(dir.path()).unwrap();
        assert_eq!(r.file_count(), 0);
        assert_eq!(r.posting_query(&Query::All), Vec::<FileId>::new());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let w = IndexWriter::create(dir.path()).unwrap();
        w.flush().unwrap();

        std::fs::write(dir.path().join(DICT_FILE), b"not a dictionary").unwrap();
        assert!(matches!(
            IndexReader::open(dir.path()),
            Err(Error::TriCorrupt(_))
        ));
    }
}
