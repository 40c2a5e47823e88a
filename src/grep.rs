//! Line-oriented regex scanning with bounded context windows.
//!
//! The grepper walks a file line by line and hands every matching line to
//! a visitor together with up to `ctx` lines on either side. Memory stays
//! bounded by the context window: `ctx` lines behind, `ctx` lines of
//! lookahead, and the current line.

use crate::error::Result;
use flate2::read::GzDecoder;
use regex::bytes::Regex;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Called once per matching line with the line text, its 1-based number,
/// and the preceding/following context lines. Returning `Ok(false)` stops
/// the scan of this file; errors propagate to the caller.
pub type Visitor<'a> = dyn FnMut(&[u8], usize, &[Vec<u8>], &[Vec<u8>]) -> Result<bool> + 'a;

/// Scan a gzip-compressed file from the raw store.
pub fn grep_gzip_file(path: &Path, re: &Regex, ctx: usize, visitor: &mut Visitor) -> Result<()> {
    let file = File::open(path)?;
    grep(BufReader::new(GzDecoder::new(file)), re, ctx, visitor)
}

/// Scan any line source.
///
/// Lines are LF-delimited; a trailing CR is stripped, so CRLF input
/// reports the same text as LF input.
pub fn grep<R: BufRead>(mut r: R, re: &Regex, ctx: usize, visitor: &mut Visitor) -> Result<()> {
    let mut before: VecDeque<Vec<u8>> = VecDeque::with_capacity(ctx);
    let mut pending: VecDeque<Vec<u8>> = VecDeque::with_capacity(ctx);
    let mut lineno = 0usize;

    loop {
        let line = match pending.pop_front() {
            Some(line) => line,
            None => match read_line(&mut r)? {
                Some(line) => line,
                None => break,
            },
        };
        lineno += 1;

        if re.is_match(&line) {
            while pending.len() < ctx {
                match read_line(&mut r)? {
                    Some(next) => pending.push_back(next),
                    None => break,
                }
            }
            let after: Vec<Vec<u8>> = pending.iter().take(ctx).cloned().collect();
            if !visitor(&line, lineno, before.make_contiguous(), &after)? {
                return Ok(());
            }
        }

        if ctx > 0 {
            if before.len() == ctx {
                before.pop_front();
            }
            before.push_back(line);
        }
    }

    Ok(())
}

/// Read one line without its LF terminator, stripping a trailing CR.
/// Returns None at EOF; a final line without a newline is still a line.
fn read_line<R: BufRead>(r: &mut R) -> Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    let n = r.read_until(b'\n', &mut line)?;
    if n == 0 {
        return Ok(None);
    }
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Hit {
        line: String,
        lineno: usize,
        before: Vec<String>,
        after: Vec<String>,
    }

    fn run(content: &str, pattern: &str, ctx: usize) -> Vec<Hit> {
        let re = Regex::new(pattern).unwrap();
        let mut hits = Vec::new();
        grep(
            Cursor::new(content.as_bytes().to_vec()),
            &re,
            ctx,
            &mut |line, lineno, before, after| {
                hits.push(Hit {
                    line: String::from_utf8_lossy(line).into_owned(),
                    lineno,
                    before: before
                        .iter()
                        .map(|l| String::from_utf8_lossy(l).into_owned())
                        .collect(),
                    after: after
                        .iter()
                        .map(|l| String::from_utf8_lossy(l).into_owned())
                        .collect(),
                });
                Ok(true)
            },
        )
        .unwrap();
        hits
    }

    #[test]
    fn test_basic_match_line_numbers() {
        let hits = run("alpha\nbeta\ngamma\nbeta again\n", "beta", 0);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].lineno, 2);
        assert_eq!(hits[0].line, "beta");
        assert_eq!(hits[1].lineno, 4);
        assert_eq!(hits[1].line, "beta again");
    }

    #[test]
    fn test_context_window() {
        let hits = run("A\nB\nC\nD\nE\n", "C", 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].before, vec!["B"]);
        assert_eq!(hits[0].after, vec!["D"]);
    }

    #[test]
    fn test_context_clipped_at_file_edges() {
        let hits = run("match\nx\ny\nmatch\n", "match", 2);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].before.is_empty());
        assert_eq!(hits[0].after, vec!["x", "y"]);
        assert_eq!(hits[1].before, vec!["x", "y"]);
        assert!(hits[1].after.is_empty());
    }

    #[test]
    fn test_adjacent_matches_keep_full_context() {
        let hits = run("a\nm1\nm2\nb\n", "m", 1);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].before, vec!["a"]);
        assert_eq!(hits[0].after, vec!["m2"]);
        assert_eq!(hits[1].before, vec!["m1"]);
        assert_eq!(hits[1].after, vec!["b"]);
    }

    #[test]
    fn test_crlf_stripped() {
        let hits = run("one\r\ntwo\r\n", "two", 0);
        assert_eq!(hits[0].line, "two");
    }

    #[test]
    fn test_no_trailing_newline() {
        let hits = run("first\nlast", "last", 0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].lineno, 2);
        assert_eq!(hits[0].line, "last");
    }

    #[test]
    fn test_visitor_stop() {
        let re = Regex::new("x").unwrap();
        let mut seen = 0;
        grep(
            Cursor::new(b"x\nx\nx\n".to_vec()),
            &re,
            0,
            &mut |_, _, _, _| {
                seen += 1;
                Ok(seen < 2)
            },
        )
        .unwrap();
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_visitor_error_propagates() {
        let re = Regex::new("x").unwrap();
        let result = grep(
            Cursor::new(b"x\n".to_vec()),
            &re,
            0,
            &mut |_, _, _, _| Err(crate::Error::LimitExceeded(1000)),
        );
        assert!(matches!(result, Err(crate::Error::LimitExceeded(_))));
    }

    #[test]
    fn test_gzip_file_scan() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.gz");
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(b"needle in\na haystack\n").unwrap();
        enc.finish().unwrap();

        let re = Regex::new("needle").unwrap();
        let mut lines = Vec::new();
        grep_gzip_file(&path, &re, 0, &mut |line, lineno, _, _| {
            lines.push((lineno, String::from_utf8_lossy(line).into_owned()));
            Ok(true)
        })
        .unwrap();
        assert_eq!(lines, vec![(1, "needle in".to_string())]);
    }
}
