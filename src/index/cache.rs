//! Cache actor owning the index maps
//!
//! Every operation is a command sent to a single task that owns the
//! [`IndexState`]. Commands are handled strictly in arrival order, so a query
//! sent after an add observes that add, and no lock ever guards the maps.

use async_std::channel::{bounded, Receiver, Sender};
use async_std::task;
use async_trait::async_trait;
use futures::channel::oneshot;
use log::{debug, info};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::index::{CacheEntry, IndexSink, IndexState};
use crate::selector::{select, Query};
use crate::types::{MailFile, MatchKind};

const CHANNEL_CAPACITY: usize = 100;

/// Commands for the cache loop
enum Command {
    Add(Vec<CacheEntry>, oneshot::Sender<()>),
    Remove(HashSet<MailFile>, oneshot::Sender<()>),
    Lookup {
        index: String,
        value: String,
        kind: MatchKind,
        reply: oneshot::Sender<Vec<MailFile>>,
    },
    Query(Query, oneshot::Sender<Vec<MailFile>>),
    ListKeys(String, oneshot::Sender<Vec<String>>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to the cache actor. Clones share the same actor.
#[derive(Clone)]
pub struct Cache {
    tx: Sender<Command>,
}

impl Cache {
    /// Spawn the cache loop with an empty index.
    pub fn new() -> Self {
        let (tx, rx) = bounded(CHANNEL_CAPACITY);

        task::spawn(cache_loop(rx));
        info!("Cache started");

        Self { tx }
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(command(tx))
            .await
            .map_err(|_| Error::Internal("Cache loop stopped".to_string()))?;
        rx.await
            .map_err(|_| Error::Internal("Cache loop dropped reply".to_string()))
    }

    /// Insert a single entry.
    pub async fn add(&self, entry: CacheEntry) -> Result<()> {
        self.add_all(vec![entry]).await
    }

    /// Insert a batch of entries in one turn of the loop.
    pub async fn add_all(&self, entries: Vec<CacheEntry>) -> Result<()> {
        self.request(|reply| Command::Add(entries, reply)).await
    }

    /// Drop files from every bucket. Files absent from a bucket are ignored.
    pub async fn remove(&self, files: HashSet<MailFile>) -> Result<()> {
        self.request(|reply| Command::Remove(files, reply)).await
    }

    /// Unordered set of files matching `value` in `index`.
    pub async fn lookup(&self, index: &str, value: &str, kind: MatchKind) -> Result<Vec<MailFile>> {
        self.request(|reply| Command::Lookup {
            index: index.to_string(),
            value: value.to_string(),
            kind,
            reply,
        })
        .await
    }

    /// Look up and select a window in a single turn of the loop.
    pub async fn query(&self, query: Query) -> Result<Vec<MailFile>> {
        self.request(|reply| Command::Query(query, reply)).await
    }

    /// Sorted keys of an index; empty for an unknown index.
    pub async fn list_keys(&self, index: &str) -> Result<Vec<String>> {
        self.request(|reply| Command::ListKeys(index.to_string(), reply))
            .await
    }

    /// Stop the loop after the commands already queued.
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Shutdown(tx)).await;
        let _ = rx.await;
        Ok(())
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexSink for Cache {
    async fn add(&self, entries: Vec<CacheEntry>) -> Result<()> {
        self.add_all(entries).await
    }

    async fn remove(&self, files: HashSet<MailFile>) -> Result<()> {
        Cache::remove(self, files).await
    }
}

async fn cache_loop(rx: Receiver<Command>) {
    let mut state = IndexState::new();

    while let Ok(cmd) = rx.recv().await {
        match cmd {
            Command::Add(entries, reply) => {
                for entry in entries {
                    state.add(entry);
                }
                let _ = reply.send(());
            }
            Command::Remove(files, reply) => {
                debug!("Removing {} files from the index", files.len());
                state.remove(&files);
                let _ = reply.send(());
            }
            Command::Lookup {
                index,
                value,
                kind,
                reply,
            } => {
                let _ = reply.send(state.lookup(&index, &value, kind));
            }
            Command::Query(query, reply) => {
                let candidates = state.lookup(&query.index, &query.value, query.kind);
                let _ = reply.send(select(candidates, query.position, query.direction));
            }
            Command::ListKeys(index, reply) => {
                let _ = reply.send(state.list_keys(&index));
            }
            Command::Shutdown(reply) => {
                info!("Shutting down cache");
                let _ = reply.send(());
                break;
            }
        }
    }
}
