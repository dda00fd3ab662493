//! End-to-end tests of the crawler feeding the cache

use perso::config::Config;
use perso::selector::{Position, Query};
use perso::{Cache, Crawler, Direction, Indexer, MailFile, MatchKind};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write_message(root: &Path, mailbox: &str, name: &str, from: &str, to: &str, date: &str) {
    let dir = root.join(mailbox).join("cur");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join(name),
        format!(
            "From: {}\nTo: {}\nDate: {}\nSubject: test {}\n\nbody of {}\n",
            from, to, date, name, name
        ),
    )
    .unwrap();
}

fn setup() -> (TempDir, Cache, Crawler) {
    let tmp = TempDir::new().unwrap();
    let cache = Cache::new();
    let crawler = Crawler::new(
        tmp.path(),
        Indexer::new(Config::default().keys),
        Arc::new(cache.clone()),
        Duration::from_secs(60),
    );
    (tmp, cache, crawler)
}

fn names(files: &[MailFile]) -> Vec<String> {
    files
        .iter()
        .map(|f| f.file.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

async fn everything(cache: &Cache) -> Vec<MailFile> {
    cache
        .query(Query {
            index: String::new(),
            value: String::new(),
            kind: MatchKind::CatchAll,
            position: Position::IndexLimit(0, 1000),
            direction: Direction::OldestFirst,
        })
        .await
        .unwrap()
}

#[async_std::test]
async fn test_scan_indexes_every_mailbox() {
    let (tmp, cache, mut crawler) = setup();
    write_message(tmp.path(), "INBOX", "1", "Alice <alice@x.com>", "bob@x.com", "Thu, 01 Jan 2015 10:00:00 +0000");
    write_message(tmp.path(), "INBOX/.Sent", "2", "bob@x.com", "Alice <ALICE@x.com>", "Fri, 02 Jan 2015 10:00:00 +0000");
    write_message(tmp.path(), "Archive", "3", "carol@x.com", "bob@x.com", "Sat, 03 Jan 2015 10:00:00 +0000");
    std::fs::write(tmp.path().join("stray"), "From: nobody@x.com\n\n").unwrap();

    let report = crawler.scan().await;
    assert_eq!(report.added, 3);

    assert_eq!(names(&everything(&cache).await), vec!["1", "2", "3"]);
    assert_eq!(
        cache.list_keys("from").await.unwrap(),
        vec!["alice@x.com", "bob@x.com", "carol@x.com"]
    );

    let to_bob = cache
        .query(Query {
            index: "to".to_string(),
            value: "bob@x.com".to_string(),
            kind: MatchKind::Address,
            position: Position::Single(0),
            direction: Direction::NewestFirst,
        })
        .await
        .unwrap();
    assert_eq!(names(&to_bob), vec!["3"]);

    let to_alice = cache.lookup("to", "alice@x.com", MatchKind::Address).await.unwrap();
    assert_eq!(names(&to_alice), vec!["2"]);
}

#[async_std::test]
async fn test_rescan_follows_updates_and_deletions() {
    let (tmp, cache, mut crawler) = setup();
    write_message(tmp.path(), "INBOX", "1", "alice@x.com", "bob@x.com", "Thu, 01 Jan 2015 10:00:00 +0000");
    write_message(tmp.path(), "INBOX", "2", "carol@x.com", "bob@x.com", "Fri, 02 Jan 2015 10:00:00 +0000");
    crawler.scan().await;

    let second = crawler.scan().await;
    assert_eq!(second.unchanged, 2);
    assert_eq!(second.added + second.updated + second.deleted, 0);

    // Rewritten with a different sender and a different size
    write_message(tmp.path(), "INBOX", "1", "dave.longer.name@x.com", "bob@x.com", "Thu, 01 Jan 2015 10:00:00 +0000");
    let report = crawler.scan().await;
    assert_eq!(report.updated, 1);

    assert!(cache.lookup("from", "alice@x.com", MatchKind::Address).await.unwrap().is_empty());
    assert_eq!(
        names(&cache.lookup("from", "dave.longer.name@x.com", MatchKind::Address).await.unwrap()),
        vec!["1"]
    );
    assert_eq!(everything(&cache).await.len(), 2);

    std::fs::remove_file(tmp.path().join("INBOX/cur/2")).unwrap();
    let report = crawler.scan().await;
    assert_eq!(report.deleted, 1);

    assert_eq!(names(&everything(&cache).await), vec!["1"]);
    assert_eq!(cache.list_keys("from").await.unwrap(), vec!["dave.longer.name@x.com"]);
}

#[async_std::test]
async fn test_move_between_subdirectories() {
    let (tmp, cache, mut crawler) = setup();
    let new_dir = tmp.path().join("INBOX/new");
    std::fs::create_dir_all(&new_dir).unwrap();
    std::fs::create_dir_all(tmp.path().join("INBOX/cur")).unwrap();
    std::fs::write(new_dir.join("1"), "From: alice@x.com\n\nhi\n").unwrap();
    crawler.scan().await;

    std::fs::rename(new_dir.join("1"), tmp.path().join("INBOX/cur/1:2,S")).unwrap();
    let report = crawler.scan().await;
    assert_eq!((report.added, report.deleted), (1, 1));

    let all = everything(&cache).await;
    assert_eq!(all.len(), 1);
    assert!(all[0].file.starts_with("cur"));
}
