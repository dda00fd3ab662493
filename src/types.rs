//! Core types shared by the crawler, the cache and the query path

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Maildir subdirectories holding deliverable messages.
pub const MAILDIR_SUBDIRS: [&str; 2] = ["cur", "new"];

/// A message file inside a Maildir-style mailbox.
///
/// Identity is the pair `(mailbox, file)`; `date` is metadata filled in once
/// the headers have been parsed and takes no part in equality or hashing.
#[derive(Debug, Clone)]
pub struct MailFile {
    /// Directory holding the `cur`/`new` subdirectories
    pub mailbox: PathBuf,
    /// Path relative to `mailbox`, always `cur/<name>` or `new/<name>`
    pub file: PathBuf,
    /// Parsed `Date` header, if any
    pub date: Option<DateTime<Utc>>,
}

impl MailFile {
    /// Build a MailFile from a message path.
    ///
    /// Fails unless the immediate parent directory is named `cur` or `new`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let invalid = || Error::InvalidPath(path.display().to_string());

        let name = path.file_name().ok_or_else(invalid)?;
        let parent = path.parent().ok_or_else(invalid)?;
        let subdir = parent
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(invalid)?;

        if !MAILDIR_SUBDIRS.contains(&subdir) {
            return Err(invalid());
        }

        let mailbox = parent
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            mailbox,
            file: Path::new(subdir).join(name),
            date: None,
        })
    }

    /// Attach a parsed date.
    pub fn with_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.date = date;
        self
    }

    /// Full path of the message file on disk.
    pub fn path(&self) -> PathBuf {
        self.mailbox.join(&self.file)
    }

    /// Chronological order used for range selection.
    ///
    /// Oldest first; undated messages sort before dated ones. Ties are broken
    /// by mailbox then file so that pagination is deterministic.
    pub fn cmp_by_date(&self, other: &Self) -> Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| self.mailbox.cmp(&other.mailbox))
            .then_with(|| self.file.cmp(&other.file))
    }
}

impl PartialEq for MailFile {
    fn eq(&self, other: &Self) -> bool {
        self.mailbox == other.mailbox && self.file == other.file
    }
}

impl Eq for MailFile {}

impl Hash for MailFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.mailbox.hash(state);
        self.file.hash(state);
    }
}

impl fmt::Display for MailFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// How the values of an indexed header are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    /// Exact match on the raw header value
    Normal,
    /// Header holds an address list; keys are lowercased addresses
    Address,
    /// Raw header value, matched by substring at query time
    Substring,
    /// Single empty key matching every indexed message
    CatchAll,
}

/// Result ordering for range selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl Direction {
    /// Parse the `latest`/`oldest` URL segment.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "latest" => Some(Direction::NewestFirst),
            "oldest" => Some(Direction::OldestFirst),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_path_cur_and_new() {
        let m = MailFile::from_path("/mail/alice/INBOX/cur/123.host:2,S").unwrap();
        assert_eq!(m.mailbox, PathBuf::from("/mail/alice/INBOX"));
        assert_eq!(m.file, PathBuf::from("cur/123.host:2,S"));
        assert_eq!(m.path(), PathBuf::from("/mail/alice/INBOX/cur/123.host:2,S"));

        let m = MailFile::from_path("/mail/alice/INBOX/new/456.host").unwrap();
        assert_eq!(m.file, PathBuf::from("new/456.host"));
    }

    #[test]
    fn test_from_path_rejects_other_parents() {
        assert!(MailFile::from_path("/mail/alice/INBOX/tmp/123.host").is_err());
        assert!(MailFile::from_path("/mail/alice/INBOX/123.host").is_err());
        assert!(MailFile::from_path("123.host").is_err());
        assert!(MailFile::from_path("/").is_err());
    }

    #[test]
    fn test_from_path_relative_mailbox() {
        let m = MailFile::from_path("cur/1").unwrap();
        assert_eq!(m.mailbox, PathBuf::new());
        assert_eq!(m.path(), PathBuf::from("cur/1"));
    }

    #[test]
    fn test_identity_ignores_date() {
        let a = MailFile::from_path("/m/cur/1").unwrap();
        let b = MailFile::from_path("/m/cur/1")
            .unwrap()
            .with_date(Some(Utc.timestamp_opt(10, 0).unwrap()));
        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_cmp_by_date_breaks_ties_by_path() {
        let date = Some(Utc.timestamp_opt(100, 0).unwrap());
        let a = MailFile::from_path("/a/cur/2").unwrap().with_date(date);
        let b = MailFile::from_path("/b/cur/1").unwrap().with_date(date);
        let c = MailFile::from_path("/a/cur/3").unwrap().with_date(date);
        let early = MailFile::from_path("/z/cur/9")
            .unwrap()
            .with_date(Some(Utc.timestamp_opt(1, 0).unwrap()));

        let mut files = vec![b.clone(), c.clone(), a.clone(), early.clone()];
        files.sort_by(|x, y| x.cmp_by_date(y));
        assert_eq!(files, vec![early, a, c, b]);
    }

    #[test]
    fn test_direction_segments() {
        assert_eq!(Direction::from_segment("latest"), Some(Direction::NewestFirst));
        assert_eq!(Direction::from_segment("oldest"), Some(Direction::OldestFirst));
        assert_eq!(Direction::from_segment("newest"), None);
    }
}
