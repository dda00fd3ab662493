//! Filesystem change notifications
//!
//! Wraps a recursive `notify` watcher on the crawl root and reduces its
//! platform-specific events to [`FsEvent`].

use async_std::channel::{bounded, Receiver};
use async_std::task;
use log::{debug, warn};
use notify::event::{EventKind, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};

use crate::error::Result;

const EVENT_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Written,
    Removed,
    Renamed,
}

/// One change to one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub kind: FsEventKind,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, kind: FsEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Live subscription on a directory tree. Dropping it ends the subscription
/// and closes the event channel.
pub struct Watcher {
    _inner: RecommendedWatcher,
}

impl Watcher {
    /// Watch `root` recursively, returning the subscription and its events.
    pub fn new(root: &Path) -> Result<(Self, Receiver<FsEvent>)> {
        let (tx, rx) = bounded(EVENT_CAPACITY);

        let mut inner = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for event in adapt(event) {
                        if task::block_on(tx.send(event)).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!("Filesystem watch error: {}", e),
            }
        })?;
        inner.watch(root, RecursiveMode::Recursive)?;

        debug!("Watching {:?} for changes", root);
        Ok((Self { _inner: inner }, rx))
    }
}

/// Reduce a `notify` event to one [`FsEvent`] per affected path.
pub fn adapt(event: notify::Event) -> Vec<FsEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => FsEventKind::Created,
        EventKind::Modify(ModifyKind::Name(_)) => FsEventKind::Renamed,
        EventKind::Modify(_) => FsEventKind::Written,
        EventKind::Remove(_) => FsEventKind::Removed,
        _ => return Vec::new(),
    };

    event
        .paths
        .into_iter()
        .map(|path| FsEvent::new(path, kind))
        .collect()
}
