//! Result window selection
//!
//! A position specifier is one of:
//!
//! - `n`: the single message at position `n`
//! - `lo-hi`: positions `lo` through `hi`, both included
//! - `i,n`: `n` messages starting at position `i`
//!
//! Positions count from the newest message for `latest` queries and from the
//! oldest for `oldest` queries. Parsing is purely syntactic; clamping against
//! the number of candidates happens in [`select`].

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::{Direction, MailFile, MatchKind};

/// Window into an ordered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Single(usize),
    /// Inclusive on both ends
    Range(usize, usize),
    IndexLimit(usize, usize),
}

impl Position {
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidSelector(s.to_string());

        if let Some((lo, hi)) = s.split_once('-') {
            let lo = parse_number(lo).ok_or_else(invalid)?;
            let hi = parse_number(hi).ok_or_else(invalid)?;
            if hi < lo {
                return Err(invalid());
            }
            return Ok(Position::Range(lo, hi));
        }

        if let Some((index, limit)) = s.split_once(',') {
            let index = parse_number(index).ok_or_else(invalid)?;
            let limit = parse_number(limit).ok_or_else(invalid)?;
            return Ok(Position::IndexLimit(index, limit));
        }

        parse_number(s).map(Position::Single).ok_or_else(invalid)
    }

    /// `(start, count)` of the requested window before clamping.
    pub fn window(&self) -> (usize, usize) {
        match *self {
            Position::Single(n) => (n, 1),
            Position::Range(lo, hi) => (lo, (hi - lo).saturating_add(1)),
            Position::IndexLimit(index, limit) => (index, limit),
        }
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Position::parse(s)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Single(n) => write!(f, "{}", n),
            Position::Range(lo, hi) => write!(f, "{}-{}", lo, hi),
            Position::IndexLimit(index, limit) => write!(f, "{},{}", index, limit),
        }
    }
}

/// Non-empty run of ASCII digits; signs are rejected.
fn parse_number(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// A fully resolved request against the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub index: String,
    pub value: String,
    pub kind: MatchKind,
    pub position: Position,
    pub direction: Direction,
}

/// Order `candidates` and cut out the window described by `position`.
///
/// The start is clamped to the last candidate and the window never runs past
/// the end, so any non-empty window over a non-empty candidate set returns at
/// least one message.
pub fn select(mut candidates: Vec<MailFile>, position: Position, direction: Direction) -> Vec<MailFile> {
    if candidates.is_empty() {
        return Vec::new();
    }

    candidates.sort_by(|a, b| a.cmp_by_date(b));
    if direction == Direction::NewestFirst {
        candidates.reverse();
    }

    let (start, count) = position.window();
    if count == 0 {
        return Vec::new();
    }

    let start = start.min(candidates.len() - 1);
    let end = start.saturating_add(count).min(candidates.len());
    candidates.truncate(end);
    candidates.split_off(start)
}
