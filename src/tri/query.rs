//! Translation from regex syntax to trigram set expressions.
//!
//! The planner walks the pattern's HIR bottom-up carrying, for each
//! subexpression, either the complete (bounded) set of strings it can
//! match or an already-sealed trigram query. Keeping exact sets through
//! concatenation is what produces the trigrams straddling literal
//! boundaries; once a set grows past its caps it is sealed into a query
//! and the walk continues conservatively.
//!
//! The output is sound, never precise: a file whose content matches the
//! regex is always in the result set, and survivors are re-verified by
//! the grepper.

use crate::tri::{bytes_to_trigram, Trigram};
use regex_syntax::hir::{Class, Hir, HirKind};
use regex_syntax::ParserBuilder;

/// Upper bound on the width of an exact-match string set.
const MAX_SET_SIZE: usize = 20;

/// Upper bound on the byte length of an exact-match string.
const MAX_LIT_LEN: usize = 64;

/// A boolean expression over trigram posting lists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Query {
    /// Matches every file; the subexpression imposes no content constraint.
    All,
    /// Files containing this trigram.
    Trigram(Trigram),
    /// Intersection of the children.
    And(Vec<Query>),
    /// Union of the children.
    Or(Vec<Query>),
}

impl Query {
    /// Conjunction with flattening: `All` children drop out, nested `And`s
    /// merge, duplicates collapse.
    pub fn and(children: Vec<Query>) -> Query {
        let mut flat = Vec::new();
        for child in children {
            match child {
                Query::All => {}
                Query::And(grand) => flat.extend(grand),
                other => flat.push(other),
            }
        }
        flat.sort();
        flat.dedup();
        match flat.len() {
            0 => Query::All,
            1 => flat.pop().unwrap(),
            _ => Query::And(flat),
        }
    }

    /// Disjunction with flattening; any `All` child absorbs the whole node.
    pub fn or(children: Vec<Query>) -> Query {
        let mut flat = Vec::new();
        for child in children {
            match child {
                Query::All => return Query::All,
                Query::Or(grand) => flat.extend(grand),
                other => flat.push(other),
            }
        }
        flat.sort();
        flat.dedup();
        match flat.len() {
            0 => Query::All,
            1 => flat.pop().unwrap(),
            _ => Query::Or(flat),
        }
    }
}

/// Per-subexpression analysis state.
enum Info {
    /// The complete set of strings the subexpression can match.
    /// Always non-empty; the empty string is represented as an empty Vec.
    Exact(Vec<Vec<u8>>),
    /// Caps were hit; only a sound query remains.
    Sealed(Query),
}

/// Plan a trigram query for `pattern`.
///
/// The flags mirror what the search driver compiles: multiline always on,
/// case folding per `ignore_case`, and byte-oriented matching. A pattern
/// the HIR parser cannot digest degrades to [`Query::All`]; the driver
/// has already compiled the pattern, so this is a conservative fallback,
/// not an answer source.
pub fn regexp_query(pattern: &str, ignore_case: bool) -> Query {
    let hir = match ParserBuilder::new()
        .utf8(false)
        .multi_line(true)
        .case_insensitive(ignore_case)
        .build()
        .parse(pattern)
    {
        Ok(hir) => hir,
        Err(_) => return Query::All,
    };

    seal(analyze(&hir))
}

fn analyze(hir: &Hir) -> Info {
    match hir.kind() {
        HirKind::Empty => Info::Exact(vec![Vec::new()]),

        HirKind::Literal(lit) => Info::Exact(vec![lit.0.to_vec()]),

        HirKind::Class(class) => match enumerate_class(class) {
            Some(set) => Info::Exact(set),
            None => Info::Sealed(Query::All),
        },

        // Anchors and word boundaries consume no content.
        HirKind::Look(_) => Info::Exact(vec![Vec::new()]),

        HirKind::Repetition(rep) => {
            if rep.min == 0 {
                // Zero repetitions match the empty string anywhere.
                Info::Sealed(Query::All)
            } else {
                // Any match contains at least one match of the body.
                Info::Sealed(seal(analyze(&rep.sub)))
            }
        }

        HirKind::Capture(cap) => analyze(&cap.sub),

        HirKind::Concat(subs) => {
            let mut acc = Info::Exact(vec![Vec::new()]);
            for sub in subs {
                acc = concat(acc, analyze(sub));
            }
            acc
        }

        HirKind::Alternation(subs) => {
            let infos: Vec<Info> = subs.iter().map(analyze).collect();

            let mut union: Vec<Vec<u8>> = Vec::new();
            let mut all_exact = true;
            for info in &infos {
                match info {
                    Info::Exact(set) if union.len() + set.len() <= MAX_SET_SIZE => {
                        union.extend(set.iter().cloned());
                    }
                    _ => {
                        all_exact = false;
                        break;
                    }
                }
            }

            if all_exact {
                union.sort();
                union.dedup();
                Info::Exact(union)
            } else {
                Info::Sealed(Query::or(infos.into_iter().map(seal).collect()))
            }
        }
    }
}

fn concat(a: Info, b: Info) -> Info {
    match (a, b) {
        (Info::Exact(ea), Info::Exact(eb)) => {
            let max_len = |set: &[Vec<u8>]| set.iter().map(Vec::len).max().unwrap_or(0);
            if ea.len() * eb.len() <= MAX_SET_SIZE && max_len(&ea) + max_len(&eb) <= MAX_LIT_LEN {
                let mut product = Vec::with_capacity(ea.len() * eb.len());
                for x in &ea {
                    for y in &eb {
                        let mut s = Vec::with_capacity(x.len() + y.len());
                        s.extend_from_slice(x);
                        s.extend_from_slice(y);
                        product.push(s);
                    }
                }
                product.sort();
                product.dedup();
                Info::Exact(product)
            } else {
                // Boundary trigrams are lost past the caps; each side still
                // constrains independently.
                Info::Sealed(Query::and(vec![
                    trigrams_of_set(&ea),
                    trigrams_of_set(&eb),
                ]))
            }
        }
        (a, b) => Info::Sealed(Query::and(vec![seal(a), seal(b)])),
    }
}

fn seal(info: Info) -> Query {
    match info {
        Info::Sealed(q) => q,
        Info::Exact(set) => trigrams_of_set(&set),
    }
}

/// The query for "content contains one of these strings": OR over the
/// strings, AND over each string's 3-byte windows. A string shorter than
/// three bytes carries no trigram and widens the whole set to `All`.
fn trigrams_of_set(set: &[Vec<u8>]) -> Query {
    let mut alternatives = Vec::with_capacity(set.len());
    for s in set {
        if s.len() < 3 {
            return Query::All;
        }
        let windows = s
            .windows(3)
            .map(|w| Query::Trigram(bytes_to_trigram(w[0], w[1], w[2])))
            .collect();
        alternatives.push(Query::and(windows));
    }
    Query::or(alternatives)
}

/// Enumerate a small character class into its UTF-8 encoded members.
/// Classes wider than the set cap (most `.`-like and named classes)
/// return None.
fn enumerate_class(class: &Class) -> Option<Vec<Vec<u8>>> {
    match class {
        Class::Unicode(cls) => {
            let total: usize = cls
                .ranges()
                .iter()
                .map(|r| (r.end() as u32 - r.start() as u32) as usize + 1)
                .sum();
            if total > MAX_SET_SIZE {
                return None;
            }
            let mut out = Vec::with_capacity(total);
            for range in cls.ranges() {
                for cp in range.start() as u32..=range.end() as u32 {
                    if let Some(c) = char::from_u32(cp) {
                        let mut buf = [0u8; 4];
                        out.push(c.encode_utf8(&mut buf).as_bytes().to_vec());
                    }
                }
            }
            Some(out)
        }
        Class::Bytes(cls) => {
            let total: usize = cls
                .ranges()
                .iter()
                .map(|r| (r.end() - r.start()) as usize + 1)
                .sum();
            if total > MAX_SET_SIZE {
                return None;
            }
            let mut out = Vec::with_capacity(total);
            for range in cls.ranges() {
                for b in range.start()..=range.end() {
                    out.push(vec![b]);
                }
            }
            Some(out)
        }
    }
}
