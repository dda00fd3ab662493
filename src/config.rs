//! Daemon configuration
//!
//! The configuration is built once at startup and shared read-only by the
//! cache, the indexer and the crawler.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::MatchKind;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8888";
pub const DEFAULT_AGENT: &str = "MAILER-DAEMON-PERSO";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);
/// Longest accepted rescan interval (one year)
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 3600);

/// Indexed header names and how each one is matched.
///
/// Names are stored lowercased. At most one name carries
/// [`MatchKind::CatchAll`]; by convention it is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexKeys {
    keys: BTreeMap<String, MatchKind>,
}

impl IndexKeys {
    /// An empty key set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a header. Adding a catch-all replaces any previous one.
    pub fn add(&mut self, name: &str, kind: MatchKind) {
        if kind == MatchKind::CatchAll {
            self.keys.retain(|_, k| *k != MatchKind::CatchAll);
        }
        self.keys.insert(name.to_lowercase(), kind);
    }

    pub fn with(mut self, name: &str, kind: MatchKind) -> Self {
        self.add(name, kind);
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.keys.contains_key(name)
    }

    pub fn kind(&self, name: &str) -> Option<MatchKind> {
        self.keys.get(name).copied()
    }

    /// Name of the catch-all index, if configured.
    pub fn catch_all(&self) -> Option<&str> {
        self.keys
            .iter()
            .find(|(_, kind)| **kind == MatchKind::CatchAll)
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, MatchKind)> {
        self.keys.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    pub fn names(&self) -> Vec<String> {
        self.keys.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub keys: IndexKeys,
    /// Root of the Maildir tree to crawl
    pub root: PathBuf,
    /// Address the HTTP boundary binds to
    pub listen: String,
    /// Sender written after `From ` in mbox separators
    pub agent: String,
    /// Time between full rescans
    pub interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let keys = IndexKeys::new()
            .with("", MatchKind::CatchAll)
            .with("from", MatchKind::Address)
            .with("to", MatchKind::Address);

        Self {
            keys,
            root: PathBuf::from("."),
            listen: DEFAULT_LISTEN.to_string(),
            agent: DEFAULT_AGENT.to_string(),
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Parse an interval such as `2s`, `500ms`, `1m` or `1h`.
///
/// A bare integer is read as seconds.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| Error::Parse(format!("invalid interval: {:?}", s)))?;

    let secs = |factor: u64| value.checked_mul(factor).map(Duration::from_secs);
    let duration = match unit {
        "ms" => Some(Duration::from_millis(value)),
        "" | "s" => secs(1),
        "m" => secs(60),
        "h" => secs(3600),
        _ => return Err(Error::Parse(format!("invalid interval unit: {:?}", unit))),
    };

    let duration = duration
        .filter(|d| *d <= MAX_INTERVAL)
        .ok_or_else(|| Error::Parse(format!("interval too large: {:?}", s)))?;

    if duration.is_zero() {
        return Err(Error::Parse("interval must be positive".to_string()));
    }

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys() {
        let config = Config::default();
        assert_eq!(config.keys.kind(""), Some(MatchKind::CatchAll));
        assert_eq!(config.keys.kind("from"), Some(MatchKind::Address));
        assert_eq!(config.keys.kind("to"), Some(MatchKind::Address));
        assert_eq!(config.keys.catch_all(), Some(""));
        assert_eq!(config.interval, Duration::from_secs(2));
    }

    #[test]
    fn test_names_are_lowercased() {
        let keys = IndexKeys::new().with("Subject", MatchKind::Substring);
        assert!(keys.has("subject"));
        assert!(!keys.has("Subject"));
    }

    #[test]
    fn test_single_catch_all() {
        let keys = IndexKeys::new()
            .with("", MatchKind::CatchAll)
            .with("all", MatchKind::CatchAll);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys.catch_all(), Some("all"));
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_interval("5").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_interval("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_interval("3m").unwrap(), Duration::from_secs(180));
        assert_eq!(parse_interval("1h").unwrap(), Duration::from_secs(3600));
        assert!(parse_interval("").is_err());
        assert!(parse_interval("0s").is_err());
        assert!(parse_interval("2d").is_err());
        assert!(parse_interval("-1s").is_err());
    }

    #[test]
    fn test_parse_interval_rejects_huge_values() {
        assert!(parse_interval("18446744073709551615s").is_err());
        assert!(parse_interval("18446744073709551615h").is_err());
        assert!(parse_interval("99999999999m").is_err());
        assert!(parse_interval("18446744073709551616").is_err());
        assert_eq!(parse_interval("8760h").unwrap(), MAX_INTERVAL);
        assert!(parse_interval("8761h").is_err());
    }
}
