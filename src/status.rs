//! Index overview for `docwatch status`.
//!
//! Lists every indexed document version with its chunk count and when it
//! was ingested, followed by totals. `--json` prints the same rows as a
//! JSON array instead.

use anyhow::Result;

use crate::config::Config;
use crate::sqlite::{IndexedDocument, SqliteCollection};

pub async fn run_status(config: &Config, json: bool) -> Result<()> {
    let collection = SqliteCollection::open(config).await?;
    let docs = collection.status().await?;
    collection.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&docs)?);
        return Ok(());
    }

    let db_size = std::fs::metadata(&config.store.path)
        .map(|m| m.len())
        .unwrap_or(0);

    let root = config.registry.root.display().to_string();
    let now = chrono::Utc::now().timestamp();
    print!("{}", render(&docs, db_size, &root, now));
    Ok(())
}

fn render(docs: &[IndexedDocument], db_size: u64, root: &str, now: i64) -> String {
    let mut out = String::new();
    let total_chunks: i64 = docs.iter().map(|d| d.chunks).sum();

    out.push_str("docwatch index\n");
    out.push_str("==============\n\n");
    out.push_str(&format!("  Root:        {}\n", root));
    out.push_str(&format!("  Index size:  {}\n", format_bytes(db_size)));
    out.push_str(&format!("  Documents:   {}\n", docs.len()));
    out.push_str(&format!("  Chunks:      {}\n", total_chunks));

    if !docs.is_empty() {
        out.push('\n');
        out.push_str(&format!(
            "  {:<40} {:>10} {:>7}   {}\n",
            "PATH", "CRC32", "CHUNKS", "INGESTED"
        ));
        out.push_str(&format!("  {}\n", "-".repeat(76)));
        for doc in docs {
            out.push_str(&format!(
                "  {:<40} {:>10} {:>7}   {}\n",
                doc.path,
                format!("{:08x}", doc.checksum),
                doc.chunks,
                format_ts_relative(doc.ingested_at.timestamp(), now)
            ));
        }
    }

    out
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp relative to `now` (e.g. "3 hours ago").
fn format_ts_relative(ts: i64, now: i64) -> String {
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
