//! The open index handle and the search driver.

use crate::error::{Error, Result};
use crate::grep;
use crate::index::build::RAW_DIR;
use crate::index::manifest::{self, IndexRef};
use crate::index::types::{
    FileMatch, Match, SearchOptions, SearchResponse, MATCH_LIMIT,
};
use crate::tri;
use log::debug;
use parking_lot::RwLock;
use std::path::Path;
use std::time::Instant;

/// An index opened for searching.
///
/// Holds the trigram reader behind a multi-reader lock: searches share a
/// read hold for their whole duration, while `close` and `destroy` take
/// the write hold, draining in-flight searches and turning every later
/// operation into [`Error::IndexClosed`].
pub struct Index {
    index_ref: IndexRef,
    rdr: RwLock<Option<tri::IndexReader>>,
}

impl Index {
    /// Open the index in `dir` for searching.
    pub fn open(dir: &Path) -> Result<Index> {
        Self::open_ref(manifest::read(dir)?)
    }

    pub(crate) fn open_ref(index_ref: IndexRef) -> Result<Index> {
        let rdr = tri::IndexReader::open(&index_ref.dir().join(crate::index::build::TRI_DIR))?;
        Ok(Index {
            index_ref,
            rdr: RwLock::new(Some(rdr)),
        })
    }

    pub fn index_ref(&self) -> &IndexRef {
        &self.index_ref
    }

    pub fn dir(&self) -> &Path {
        self.index_ref.dir()
    }

    /// Release the trigram reader. Idempotent.
    pub fn close(&self) -> Result<()> {
        *self.rdr.write() = None;
        Ok(())
    }

    /// Close, then recursively remove the index directory.
    pub fn destroy(&self) -> Result<()> {
        let mut guard = self.rdr.write();
        *guard = None;
        self.index_ref.remove()
    }

    /// Run a regex search over the index.
    ///
    /// `offset` and `limit` are measured in files: a file skipped by
    /// pagination still counts toward `files_with_match`. Collecting more
    /// than [`MATCH_LIMIT`] matches aborts the whole search.
    pub fn search(&self, pat: &str, slug: &str, opt: &SearchOptions) -> Result<SearchResponse> {
        let started = Instant::now();

        let guard = self.rdr.read();
        let rdr = guard.as_ref().ok_or(Error::IndexClosed)?;

        let re = regex::bytes::Regex::new(&regexp_pattern(pat, opt.ignore_case))?;
        let file_re = if opt.file_regexp.is_empty() {
            None
        } else {
            Some(regex::Regex::new(&opt.file_regexp)?)
        };

        let query = tri::regexp_query(pat, opt.ignore_case);
        debug!("query plan for {pat:?}: {query:?}");
        let candidates = rdr.posting_query(&query);

        let mut results: Vec<FileMatch> = Vec::new();
        let mut files_opened = 0usize;
        let mut files_found = 0usize;
        let mut files_collected = 0usize;
        let mut matches_collected = 0usize;

        for file_id in candidates {
            let Some(name) = rdr.name(file_id) else {
                continue;
            };

            if let Some(fre) = &file_re {
                if !fre.is_match(name) {
                    continue;
                }
            }

            files_opened += 1;
            let mut matches: Vec<Match> = Vec::new();
            let mut has_match = false;

            let raw_path = self.index_ref.dir().join(RAW_DIR).join(name);
            grep::grep_gzip_file(
                &raw_path,
                &re,
                opt.lines_of_context,
                &mut |line, lineno, before, after| {
                    has_match = true;
                    if files_found < opt.offset
                        || (opt.limit > 0 && files_collected >= opt.limit)
                    {
                        // Outside the page: remember the file matched, but
                        // record nothing and stop scanning it.
                        return Ok(false);
                    }

                    matches_collected += 1;
                    matches.push(Match {
                        line: String::from_utf8_lossy(line).into_owned(),
                        line_number: lineno,
                        before: to_strings(before),
                        after: to_strings(after),
                    });

                    if matches_collected > MATCH_LIMIT {
                        return Err(Error::LimitExceeded(MATCH_LIMIT));
                    }
                    Ok(true)
                },
            )?;

            if !has_match {
                continue;
            }

            files_found += 1;
            if !matches.is_empty() {
                files_collected += 1;
                results.push(FileMatch {
                    filename: name.to_string(),
                    matches,
                });
            }
        }

        Ok(SearchResponse {
            matches: results,
            slug: slug.to_string(),
            files_with_match: files_found,
            files_opened,
            duration: started.elapsed(),
            revision: String::new(),
        })
    }
}

/// Wrap a user pattern with the flags every search runs under.
fn regexp_pattern(pat: &str, ignore_case: bool) -> String {
    if ignore_case {
        format!("(?i)(?m){pat}")
    } else {
        format!("(?m){pat}")
    }
}

fn to_strings(lines: &[Vec<u8>]) -> Vec<String> {
    lines
        .iter()
        .map(|l| String::from_utf8_lossy(l).into_owned())
        .collect()
}
