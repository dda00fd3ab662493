//! In-memory index maps
//!
//! `IndexState` is plain synchronous storage. It is owned by the cache actor
//! and never shared; all ordering and concurrency concerns live in
//! [`Cache`](crate::index::Cache).

use std::collections::{HashMap, HashSet};

use crate::index::CacheEntry;
use crate::types::{MailFile, MatchKind};

type Buckets = HashMap<String, HashSet<MailFile>>;

/// `index name -> (key -> set of files)`
#[derive(Debug, Default)]
pub struct IndexState {
    indexes: HashMap<String, Buckets>,
}

impl IndexState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one entry. A file already present in the bucket is replaced so
    /// its metadata is refreshed; membership stays single.
    pub fn add(&mut self, entry: CacheEntry) {
        self.indexes
            .entry(entry.index)
            .or_default()
            .entry(entry.key)
            .or_default()
            .replace(entry.file);
    }

    /// Remove every given file from every bucket. Buckets left empty are
    /// dropped.
    pub fn remove(&mut self, files: &HashSet<MailFile>) {
        if files.is_empty() {
            return;
        }

        for buckets in self.indexes.values_mut() {
            buckets.retain(|_, bucket| {
                bucket.retain(|file| !files.contains(file));
                !bucket.is_empty()
            });
        }
    }

    /// Files matching `value` in index `index`.
    ///
    /// Substring matching scans every key of the index; the other kinds are a
    /// single bucket lookup. An unknown index yields nothing.
    pub fn lookup(&self, index: &str, value: &str, kind: MatchKind) -> Vec<MailFile> {
        let Some(buckets) = self.indexes.get(index) else {
            return Vec::new();
        };

        match kind {
            MatchKind::Substring => {
                let mut matched: HashSet<&MailFile> = HashSet::new();
                for (key, bucket) in buckets {
                    if key.contains(value) {
                        matched.extend(bucket.iter());
                    }
                }
                matched.into_iter().cloned().collect()
            }
            MatchKind::Normal | MatchKind::Address | MatchKind::CatchAll => buckets
                .get(value)
                .map(|bucket| bucket.iter().cloned().collect())
                .unwrap_or_default(),
        }
    }

    /// Keys of an index in lexicographic order.
    pub fn list_keys(&self, index: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .indexes
            .get(index)
            .map(|buckets| buckets.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Number of files in one bucket.
    #[cfg(test)]
    pub fn bucket_len(&self, index: &str, key: &str) -> usize {
        self.indexes
            .get(index)
            .and_then(|buckets| buckets.get(key))
            .map(HashSet::len)
            .unwrap_or(0)
    }

    /// Whether `file` appears in any bucket of any index.
    #[cfg(test)]
    pub fn contains(&self, file: &MailFile) -> bool {
        self.indexes
            .values()
            .flat_map(|buckets| buckets.values())
            .any(|bucket| bucket.contains(file))
    }
}
