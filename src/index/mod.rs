//! Header index: entry production, storage and the cache actor
//!
//! The [`Indexer`] turns one parsed message into [`CacheEntry`] values, the
//! [`Cache`] actor is the only owner of the index maps, and [`IndexSink`] is the
//! seam the crawler writes through.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::Result;
use crate::types::MailFile;

pub mod backend;
pub mod cache;
pub mod indexer;

pub use backend::IndexState;
pub use cache::Cache;
pub use indexer::Indexer;

/// Assertion that `file` belongs in bucket `key` of index `index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub index: String,
    pub key: String,
    pub file: MailFile,
}

impl CacheEntry {
    pub fn new(index: impl Into<String>, key: impl Into<String>, file: MailFile) -> Self {
        Self {
            index: index.into(),
            key: key.into(),
            file,
        }
    }
}

/// Destination for index mutations produced by the crawler
#[async_trait]
pub trait IndexSink: Send + Sync {
    /// Insert entries, creating buckets as needed
    async fn add(&self, entries: Vec<CacheEntry>) -> Result<()>;

    /// Drop the given files from every bucket of every index
    async fn remove(&self, files: HashSet<MailFile>) -> Result<()>;
}
