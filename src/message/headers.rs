//! Case-insensitive header multimap

use async_std::fs::File;
use async_std::io::BufReader;
use async_std::prelude::*;
use async_std::path::Path as AsyncPath;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::message::address::{parse_address_list, Address};

/// Parsed message headers keyed by lowercased name.
///
/// Repeated headers keep every value in file order. Values are kept as
/// written: folded lines are joined with a single space and encoded words
/// are not decoded.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    headers: HashMap<String, Vec<String>>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the header block at the start of a raw message.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let (headers, _) = mailparse::parse_headers(raw)?;
        if headers.is_empty() {
            return Err(Error::Parse("no headers found".to_string()));
        }

        let mut map = Self::new();
        for header in headers.iter() {
            map.insert(&header.get_key(), unfold(header.get_value_raw()));
        }
        Ok(map)
    }

    /// Read and parse the headers of a message file.
    ///
    /// Only the header block is read; the body is never loaded.
    pub async fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(AsyncPath::new(path.as_ref())).await?;
        let mut reader = BufReader::new(file);

        let mut raw = Vec::new();
        loop {
            let start = raw.len();
            if reader.read_until(b'\n', &mut raw).await? == 0 {
                break;
            }
            if matches!(&raw[start..], b"\n" | b"\r\n") {
                break;
            }
        }

        Self::parse(&raw)
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.headers
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into());
    }

    /// All values of a header, looked up case-insensitively.
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.headers
            .get(&name.to_lowercase())
            .map(|values| values.as_slice())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_lowercase())
    }

    /// The `Date` header, if present.
    pub fn date(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(value) = self.get("date") else {
            return Ok(None);
        };

        let timestamp = mailparse::dateparse(value)?;
        DateTime::from_timestamp(timestamp, 0)
            .map(Some)
            .ok_or_else(|| Error::Parse(format!("date out of range: {}", value)))
    }

    /// Addresses listed in a header; repeated headers are joined.
    pub fn addresses(&self, name: &str) -> Vec<Address> {
        match self.get_all(name) {
            Some(values) => parse_address_list(&values.join(", ")),
            None => Vec::new(),
        }
    }
}

/// Join folded continuation lines the way they read on one line.
fn unfold(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
