//! Append-only message logbook.
//!
//! One line per entry: `<RFC 3339 UTC timestamp> - <message>`. Appends rely
//! on the platform's append semantics; there is no locking.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use tokio::io::AsyncWriteExt;

use kiosk_core::Result;

/// Appends a timestamped message line to the logbook file, creating the
/// file on first use.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or written.
pub async fn append(path: &Path, message: &str) -> Result<()> {
    let line = format!(
        "{} - {}\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        message
    );

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    Ok(())
}
