//! Perso - a Maildir indexing daemon
//!
//! Crawls a tree of Maildir mailboxes, indexes configured message headers in
//! memory and serves date-ordered selections of messages as mbox over HTTP.

pub mod config;
pub mod crawler;
pub mod error;
pub mod index;
pub mod message;
pub mod render;
pub mod routes;
pub mod selector;
pub mod server;
pub mod types;

pub use config::{Config, IndexKeys};
pub use crawler::{Crawler, CrawlerHandle, ScanReport};
pub use error::{Error, Result};
pub use index::{Cache, CacheEntry, IndexSink, Indexer};
pub use routes::Route;
pub use selector::{Position, Query};
pub use server::HttpServer;
pub use types::*;
