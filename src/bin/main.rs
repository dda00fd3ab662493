//! Perso daemon binary

use async_std::net::TcpListener;
use clap::Parser;
use futures::prelude::*;
use perso::config::{parse_interval, Config, DEFAULT_AGENT, DEFAULT_LISTEN};
use perso::{Cache, Crawler, HttpServer, Indexer, MatchKind};
use signal_hook::consts::signal::*;
use signal_hook_async_std::Signals;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "perso", version, about = "Serve a Maildir tree as mbox over HTTP")]
struct Args {
    /// Header to index as-is
    #[arg(short = 'H', value_name = "HEADER")]
    headers: Vec<String>,

    /// Header containing addresses (in addition to From and To)
    #[arg(short = 'A', value_name = "HEADER")]
    addresses: Vec<String>,

    /// Header that can be matched by a substring
    #[arg(short = 'P', value_name = "HEADER")]
    partials: Vec<String>,

    /// Interval between runs of the crawler
    #[arg(short = 'i', value_name = "INTERVAL", default_value = "2s", value_parser = interval_arg)]
    interval: Duration,

    /// Where to listen from
    #[arg(short = 's', value_name = "ADDR", default_value = DEFAULT_LISTEN)]
    listen: String,

    /// What to write after 'From ' in mbox format
    #[arg(short = 'a', value_name = "AGENT", default_value = DEFAULT_AGENT)]
    agent: String,

    /// Root of the Maildir tree
    #[arg(value_name = "ROOT", default_value = ".")]
    root: PathBuf,
}

fn interval_arg(s: &str) -> Result<Duration, String> {
    parse_interval(s).map_err(|e| e.to_string())
}

impl Args {
    fn into_config(self) -> Config {
        let mut config = Config::default();

        for name in &self.headers {
            config.keys.add(name, MatchKind::Normal);
        }
        for name in &self.addresses {
            config.keys.add(name, MatchKind::Address);
        }
        for name in &self.partials {
            config.keys.add(name, MatchKind::Substring);
        }

        config.root = self.root;
        config.listen = self.listen;
        config.agent = self.agent;
        config.interval = self.interval;
        config
    }
}

#[async_std::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Arc::new(Args::parse().into_config());
    log::info!(
        "Indexing {:?} on headers {:?}",
        config.root,
        config.keys.names()
    );

    let cache = Cache::new();
    let indexer = Indexer::new(config.keys.clone());
    let crawler = Crawler::new(
        &config.root,
        indexer,
        Arc::new(cache.clone()),
        config.interval,
    );
    let crawler = crawler.spawn();

    let listener = TcpListener::bind(config.listen.as_str()).await?;
    log::info!("HTTP server listening on {}", config.listen);
    let server = HttpServer::new(cache.clone(), Arc::clone(&config));
    let _server_task = async_std::task::spawn(async move {
        if let Err(e) = server.listen_on(listener).await {
            log::error!("HTTP server error: {}", e);
        }
    });

    // Set up signal handling for graceful shutdown
    let signals = Signals::new([SIGTERM, SIGINT, SIGHUP])?;
    let handle = signals.handle();

    let mut signals = signals.fuse();
    if let Some(signal) = signals.next().await {
        let signal_name = match signal {
            SIGTERM => "SIGTERM",
            SIGINT => "SIGINT",
            SIGHUP => "SIGHUP",
            _ => "unknown signal",
        };
        log::info!(
            "Received {} signal, initiating graceful shutdown...",
            signal_name
        );
    }

    handle.close();

    crawler.stop().await;
    cache.shutdown().await?;

    log::info!("Shutdown complete");
    Ok(())
}
