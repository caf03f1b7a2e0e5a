//! Chatsync event replay
//!
//! Feeds a JSON-lines file of transport events through the engine and
//! prints the resulting contact list. Handy for reproducing ordering and
//! unread-count bugs from captured event logs.
//!
//! Usage: chatsync-replay <events.jsonl> [--settings <file>] [--filter <text>]

use anyhow::{bail, Context};
use chatsync::{
    engine::{ChatEngine, TransportEvent},
    history::SqliteHistory,
    pagination::ReceiptSink,
    storage::{Message, Settings},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Receipt sink that only logs
struct LogReceipts;

impl ReceiptSink for LogReceipts {
    fn send_displayed(&self, peer: &str, message_id: &str, timestamp: DateTime<Utc>) {
        tracing::info!("displayed {} to {} ({})", message_id, peer, timestamp);
    }
}

struct Args {
    events: String,
    settings: Option<String>,
    filter: Option<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut events = None;
    let mut settings = None;
    let mut filter = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => settings = Some(args.next().context("--settings needs a path")?),
            "--filter" => filter = Some(args.next().context("--filter needs a value")?),
            _ if events.is_none() => events = Some(arg),
            other => bail!("unexpected argument: {}", other),
        }
    }

    Ok(Args {
        events: events.context("usage: chatsync-replay <events.jsonl> [--settings <file>] [--filter <text>]")?,
        settings,
        filter,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chatsync::init();
    let args = parse_args()?;

    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let history = Arc::new(match &settings.history_db_path {
        Some(path) => SqliteHistory::new_with_path(path, settings.page_size)?,
        None => SqliteHistory::new(settings.page_size)?,
    });
    let mut engine = ChatEngine::new(&settings, history.clone(), Arc::new(LogReceipts));

    let data = std::fs::read_to_string(&args.events)
        .with_context(|| format!("reading {}", args.events))?;

    let mut applied = 0usize;
    for (line_no, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event: TransportEvent = serde_json::from_str(line)
            .with_context(|| format!("line {}: invalid event", line_no + 1))?;

        let changed = match event {
            TransportEvent::Message { peer, record } => {
                let message = Message::from_raw(record);
                history.archive(&peer, &message).await?;
                engine.upsert_message(&peer, message)
            }
            other => engine.handle_event(other),
        };
        if changed {
            applied += 1;
        }
    }
    tracing::info!("Applied {} events", applied);

    if let Some(filter) = args.filter {
        engine.set_filter(filter);
    }

    let view = engine.snapshot();
    for entry in &view.entries {
        let last = entry
            .last_message
            .as_ref()
            .map(|m| format!("{} {}", m.timestamp.format("%Y-%m-%d %H:%M"), m.content))
            .unwrap_or_else(|| "-".to_string());
        let marker = if entry.placeholder { "+" } else { " " };
        println!(
            "{} {:<32} unread {:>3}  {}",
            marker,
            entry.peer.label(),
            entry.unread_count,
            last
        );
    }
    println!("total unread: {}", view.total_unread);

    Ok(())
}
