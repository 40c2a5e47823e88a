//! Text-vs-binary classification over a small file prefix.
//!
//! Two classifiers share a 512-byte peek: a heuristic binary detector for
//! loose files, and a UTF-8 prefix validator used by archive ingestion.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Number of prefix bytes inspected by both classifiers.
pub const FILE_PEEK_SIZE: usize = 512;

/// Heuristic binary detection over a byte prefix.
///
/// Rules, in order: empty input and a UTF-8 BOM are text; a `%PDF-` magic
/// or any NUL byte is binary; otherwise bytes outside
/// `[0x07..=0x0E] | [0x20..=0x7F]` count as suspicious, and a suspicious
/// ratio above 10% is binary. The ratio is checked as soon as 32 bytes
/// have been scanned so large binary prefixes bail out early, and once
/// more over the full prefix.
pub fn detect_binary(bs: &[u8]) -> bool {
    let length = bs.len();

    if length == 0 {
        return false;
    }

    if length >= 3 && bs[0] == 0xEF && bs[1] == 0xBB && bs[2] == 0xBF {
        // UTF-8 BOM
        return false;
    }

    if length >= 5 && &bs[..5] == b"%PDF-" {
        return true;
    }

    let mut suspicious_bytes = 0usize;
    for (i, &b) in bs.iter().enumerate() {
        if b == 0x00 {
            return true;
        }
        if (b < 7 || b > 14) && (b < 32 || b > 127) {
            suspicious_bytes += 1;
            if i >= 32 && (suspicious_bytes * 100) / length > 10 {
                return true;
            }
        }
    }

    (suspicious_bytes * 100) / length > 10
}

/// Classify a loose file on disk by peeking at its first 512 bytes.
pub fn is_binary_file(path: &Path) -> std::io::Result<bool> {
    let mut buf = [0u8; FILE_PEEK_SIZE];
    let mut file = File::open(path)?;

    let mut n = 0;
    while n < buf.len() {
        let read = file.read(&mut buf[n..])?;
        if read == 0 {
            break;
        }
        n += read;
    }

    Ok(detect_binary(&buf[..n]))
}

fn is_utf8_lead_byte(b: u8) -> bool {
    // Anything but a continuation byte can start a rune.
    b & 0xC0 != 0x80
}

/// Validate a buffer as UTF-8, where the buffer may be the prefix of a
/// larger file.
///
/// When `whole_file` is set the buffer must be fully valid. Otherwise
/// the buffer is cut at an arbitrary point, so a decode failure is
/// tolerated when it sits within 4 bytes of the end and the suspect
/// byte could start a rune; the tail is then assumed to be a rune the
/// cut split in half.
pub fn valid_utf8_prefix(buf: &[u8], whole_file: bool) -> bool {
    match std::str::from_utf8(buf) {
        Ok(_) => true,
        Err(e) => {
            if whole_file {
                return false;
            }
            let i = e.valid_up_to();
            buf.len() - i < 4 && is_utf8_lead_byte(buf[i])
        }
    }
}
