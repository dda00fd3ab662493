//! Maildir crawler
//!
//! The crawler keeps its own record of every message file it has seen and, on
//! each scan, diffs that record against the filesystem:
//!
//! - files seen for the first time are parsed and indexed (`Added`)
//! - files whose size or mtime changed are removed from the index and indexed
//!   again (`Updated`)
//! - files with identical metadata are left alone (`Unchanged`)
//! - files no longer found are removed from the index (`Deleted`)
//!
//! Between full scans, change notifications trigger targeted updates of single
//! files.

use async_std::channel::{bounded, Receiver, Sender};
use async_std::fs;
use async_std::path::Path as AsyncPath;
use async_std::task::{self, JoinHandle};
use futures::future::{self, FutureExt};
use futures::{pin_mut, select};
use log::{debug, error, info, warn};
use std::collections::{HashMap, HashSet};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use walkdir::WalkDir;

use crate::config::MAX_INTERVAL;
use crate::index::{IndexSink, Indexer};
use crate::message::HeaderMap;
use crate::types::MailFile;

pub mod watcher;

pub use watcher::{FsEvent, FsEventKind, Watcher};

/// Classification of a tracked file during the current scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Updated,
    Unchanged,
    Deleted,
}

/// Filesystem metadata compared between scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl From<&Metadata> for FileStat {
    fn from(meta: &Metadata) -> Self {
        Self {
            size: meta.len(),
            modified: meta.modified().ok(),
        }
    }
}

#[derive(Debug, Clone)]
struct FileMeta {
    status: FileStatus,
    stat: FileStat,
    file: MailFile,
}

/// Counts from one full scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    /// Files tracked but not indexed because they could not be read or parsed
    pub failed: usize,
}

/// Diff engine between the filesystem and the index
pub struct Crawler {
    root: PathBuf,
    indexer: Indexer,
    sink: Arc<dyn IndexSink>,
    files: HashMap<PathBuf, FileMeta>,
    interval: Duration,
}

impl Crawler {
    /// Create a crawler for `root`. The root is canonicalized when possible so
    /// walk results and notification paths agree.
    pub fn new<P: AsRef<Path>>(
        root: P,
        indexer: Indexer,
        sink: Arc<dyn IndexSink>,
        interval: Duration,
    ) -> Self {
        let root = root.as_ref();
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

        Self {
            root,
            indexer,
            sink,
            files: HashMap::new(),
            interval,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Status of a tracked file from the last scan or event.
    pub fn status<P: AsRef<Path>>(&self, path: P) -> Option<FileStatus> {
        self.files.get(path.as_ref()).map(|meta| meta.status)
    }

    /// Number of tracked files.
    pub fn tracked(&self) -> usize {
        self.files.len()
    }

    /// Walk the whole tree and bring the index in line with it.
    pub async fn scan(&mut self) -> ScanReport {
        let mut report = ScanReport::default();

        for meta in self.files.values_mut() {
            meta.status = FileStatus::Deleted;
        }

        let root = self.root.clone();
        let found = task::spawn_blocking(move || walk(&root)).await;

        for (path, stat) in found {
            let file = match MailFile::from_path(&path) {
                Ok(file) => file,
                Err(e) => {
                    debug!("Skipping {}", e);
                    continue;
                }
            };

            let Some(meta) = self.files.get_mut(&path) else {
                if !self.index_file(path, file, stat).await {
                    report.failed += 1;
                }
                report.added += 1;
                continue;
            };

            if meta.stat != stat {
                meta.status = FileStatus::Updated;
                meta.stat = stat;
                report.updated += 1;
            } else {
                meta.status = FileStatus::Unchanged;
                report.unchanged += 1;
            }
        }

        let deleted = self.take_by_status(FileStatus::Deleted);
        report.deleted = deleted.len();
        self.forget(deleted.into_iter().map(|(_, meta)| meta.file).collect())
            .await;

        let updated = self.take_by_status(FileStatus::Updated);
        self.forget(updated.iter().map(|(_, meta)| meta.file.clone()).collect())
            .await;
        for (path, meta) in updated {
            if !self.index_file(path, meta.file, meta.stat).await {
                report.failed += 1;
            }
        }

        debug!(
            "Scan of {:?}: {} added, {} updated, {} unchanged, {} deleted, {} failed",
            self.root, report.added, report.updated, report.unchanged, report.deleted, report.failed
        );
        report
    }

    /// Apply a single change notification.
    ///
    /// Removals and renames drop the old entry; any path that now exists as a
    /// regular file is (re)indexed.
    pub async fn handle_event(&mut self, event: FsEvent) {
        let file = match MailFile::from_path(&event.path) {
            Ok(file) => file,
            Err(e) => {
                debug!("Ignoring event: {}", e);
                return;
            }
        };

        if let Some(meta) = self.files.remove(&event.path) {
            self.forget(vec![meta.file]).await;
        }

        if event.kind == FsEventKind::Removed {
            return;
        }

        let stat = match fs::metadata(AsyncPath::new(&event.path)).await {
            Ok(meta) if meta.is_file() => FileStat::from(&meta),
            _ => return,
        };

        self.index_file(event.path, file, stat).await;
    }

    /// Scan once, then apply notifications as they arrive and rescan every
    /// `interval` until stopped.
    pub async fn run(self, stop: Receiver<()>) {
        let watched = match Watcher::new(&self.root) {
            Ok((watcher, events)) => Some((watcher, events)),
            Err(e) => {
                warn!(
                    "Cannot watch {:?}, relying on periodic scans: {}",
                    self.root, e
                );
                None
            }
        };

        match watched {
            Some((_watcher, events)) => self.run_with_events(Some(events), stop).await,
            None => self.run_with_events(None, stop).await,
        }
    }

    /// Run loop fed by an explicit event channel.
    pub async fn run_with_events(
        mut self,
        mut events: Option<Receiver<FsEvent>>,
        stop: Receiver<()>,
    ) {
        self.scan().await;
        let mut next_scan = deadline(self.interval);
        info!("Crawler ready on {:?}", self.root);

        loop {
            let wakeup = {
                let event = async {
                    match &events {
                        Some(rx) => rx.recv().await.ok(),
                        None => future::pending().await,
                    }
                }
                .fuse();
                let stopped = stop.recv().fuse();
                let tick = task::sleep(next_scan.saturating_duration_since(Instant::now())).fuse();
                pin_mut!(event, stopped, tick);

                select! {
                    event = event => match event {
                        Some(event) => Wakeup::Event(event),
                        None => Wakeup::EventsClosed,
                    },
                    _ = stopped => Wakeup::Stop,
                    _ = tick => Wakeup::Tick,
                }
            };

            match wakeup {
                Wakeup::Event(event) => self.handle_event(event).await,
                Wakeup::EventsClosed => {
                    warn!("Change notifications stopped, relying on periodic scans");
                    events = None;
                }
                Wakeup::Tick => {
                    self.scan().await;
                    next_scan = deadline(self.interval);
                }
                Wakeup::Stop => {
                    info!("Stopping crawler on {:?}", self.root);
                    break;
                }
            }
        }
    }

    /// Start the run loop on its own task.
    pub fn spawn(self) -> CrawlerHandle {
        let (stop_tx, stop_rx) = bounded(1);
        let join = task::spawn(self.run(stop_rx));
        CrawlerHandle { stop: stop_tx, join }
    }

    /// Parse and index a file, then record its baseline metadata.
    ///
    /// The file is tracked even when parsing fails, so a later rewrite is
    /// picked up as an update.
    async fn index_file(&mut self, path: PathBuf, file: MailFile, stat: FileStat) -> bool {
        let mut file = file;
        let mut indexed = false;

        match HeaderMap::read(&path).await {
            Ok(headers) => {
                match headers.date() {
                    Ok(date) => file.date = date,
                    Err(e) => warn!("{}: error parsing date: {}", file, e),
                }

                let entries = self.indexer.entries(&file, &headers);
                match self.sink.add(entries).await {
                    Ok(()) => indexed = true,
                    Err(e) => error!("{}: error adding to index: {}", file, e),
                }
            }
            Err(e) => warn!("{}: error parsing: {}", file, e),
        }

        self.files.insert(
            path,
            FileMeta {
                status: FileStatus::Added,
                stat,
                file,
            },
        );
        indexed
    }

    fn take_by_status(&mut self, status: FileStatus) -> Vec<(PathBuf, FileMeta)> {
        let paths: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|(_, meta)| meta.status == status)
            .map(|(path, _)| path.clone())
            .collect();

        paths
            .into_iter()
            .filter_map(|path| self.files.remove(&path).map(|meta| (path, meta)))
            .collect()
    }

    async fn forget(&self, files: Vec<MailFile>) {
        if files.is_empty() {
            return;
        }

        let files: HashSet<MailFile> = files.into_iter().collect();
        if let Err(e) = self.sink.remove(files).await {
            error!("Error removing files from index: {}", e);
        }
    }
}

enum Wakeup {
    Event(FsEvent),
    EventsClosed,
    Tick,
    Stop,
}

/// Handle to a spawned crawler
pub struct CrawlerHandle {
    stop: Sender<()>,
    join: JoinHandle<()>,
}

impl CrawlerHandle {
    /// Ask the crawler to stop and wait for it. A scan in progress completes
    /// first.
    pub async fn stop(self) {
        let _ = self.stop.send(()).await;
        self.join.await;
    }
}

/// Next rescan time, capped so that no interval can overflow the clock.
fn deadline(interval: Duration) -> Instant {
    Instant::now() + interval.min(MAX_INTERVAL)
}

fn walk(root: &Path) -> Vec<(PathBuf, FileStat)> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error walking {:?}: {}", root, e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match entry.metadata() {
            Ok(meta) => {
                let stat = FileStat::from(&meta);
                found.push((entry.into_path(), stat));
            }
            Err(e) => warn!("{:?}: error reading metadata: {}", entry.path(), e),
        }
    }

    found
}
