//! Translation of one parsed message into cache entries

use log::warn;

use crate::config::IndexKeys;
use crate::index::CacheEntry;
use crate::message::HeaderMap;
use crate::types::{MailFile, MatchKind};

/// Produces the cache entries of a message according to the configured keys.
///
/// The indexer does not deduplicate: a header repeated with an identical value
/// yields identical entries. Bucket membership in the cache is a set, so such
/// duplicates collapse there.
#[derive(Debug, Clone)]
pub struct Indexer {
    keys: IndexKeys,
}

impl Indexer {
    pub fn new(keys: IndexKeys) -> Self {
        Self { keys }
    }

    /// Entries to insert for `file`, in no particular order.
    pub fn entries(&self, file: &MailFile, headers: &HeaderMap) -> Vec<CacheEntry> {
        let mut entries = Vec::new();

        for (name, kind) in self.keys.iter() {
            match kind {
                MatchKind::CatchAll => {
                    entries.push(CacheEntry::new(name, "", file.clone()));
                }
                MatchKind::Address => {
                    if !headers.contains(name) {
                        continue;
                    }

                    let addresses = headers.addresses(name);
                    if addresses.is_empty() {
                        warn!("{}: no address found in header {}", file, name);
                        continue;
                    }

                    for addr in addresses {
                        if addr.address.is_empty() {
                            continue;
                        }
                        entries.push(CacheEntry::new(
                            name,
                            addr.address.to_lowercase(),
                            file.clone(),
                        ));
                    }
                }
                MatchKind::Normal | MatchKind::Substring => {
                    let Some(values) = headers.get_all(name) else {
                        continue;
                    };

                    for value in values {
                        entries.push(CacheEntry::new(name, value.clone(), file.clone()));
                    }
                }
            }
        }

        entries
    }
}
