//! mbox rendering of selected messages
//!
//! Each message is written as a `From <agent> <date>` separator line followed
//! by the file bytes as they are on disk.

use async_std::fs;
use async_std::io::{Write, WriteExt};
use async_std::path::Path as AsyncPath;
use chrono::{DateTime, Utc};
use log::warn;

use crate::error::Result;
use crate::types::MailFile;

/// `asctime`-style date used in mbox separators
const SEPARATOR_DATE_FORMAT: &str = "%a %b %e %H:%M:%S UTC %Y";

/// Separator line for one message, including the trailing newline.
pub fn separator(agent: &str, date: Option<DateTime<Utc>>) -> String {
    let date = date
        .map(|d| d.format(SEPARATOR_DATE_FORMAT).to_string())
        .unwrap_or_default();
    format!("From {} {}\n", agent, date)
}

/// Write `files` as one mbox stream, returning how many were written.
///
/// A file that cannot be read is logged and skipped.
pub async fn write_mbox<W>(w: &mut W, agent: &str, files: &[MailFile]) -> Result<usize>
where
    W: Write + Unpin,
{
    let mut written = 0;

    for file in files {
        let path = file.path();
        let content = match fs::read(AsyncPath::new(&path)).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not write {}: {}", file, e);
                continue;
            }
        };

        w.write_all(separator(agent, file.date).as_bytes()).await?;
        w.write_all(&content).await?;
        // The next separator must start a line.
        if !content.ends_with(b"\n") {
            w.write_all(b"\n").await?;
        }
        written += 1;
    }

    w.flush().await?;
    Ok(written)
}
