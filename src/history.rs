//! History provider module
//!
//! This module defines the contract of the external store older history is
//! paged from, and ships a SQLite-backed implementation of it:
//! - Pages of the messages just before a cursor, oldest first
//! - Per-peer cursor backing the `has_more` probe
//! - Archiving of live messages

use crate::{
    storage::{Identity, Message, MessageState, NotificationKind},
    Error, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;

/// Source of older conversation history
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Fetch the page of messages older than `before_id` (newest page if None)
    ///
    /// Pages are expected in chronological order. Messages sharing a
    /// timestamp must keep the order they were sent or received in.
    async fn fetch_older_page(&self, peer: &str, before_id: Option<&str>) -> Result<Vec<Message>>;

    /// Whether older messages remain beyond the last page handed out
    async fn has_more(&self, peer: &str) -> Result<bool>;
}

/// Position of a message in the history table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Cursor {
    timestamp: i64,
    seq: i64,
}

struct Inner {
    conn: Connection,
    /// Oldest position handed out per peer
    cursors: HashMap<String, Cursor>,
}

/// History provider with SQLite persistence
pub struct SqliteHistory {
    inner: Mutex<Inner>,
    page_size: usize,
}

impl SqliteHistory {
    /// Create a history store with an in-memory database
    pub fn new(page_size: usize) -> Result<Self> {
        Self::new_with_connection(Connection::open_in_memory()?, page_size)
    }

    /// Create a history store backed by a database file
    pub fn new_with_path<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::new_with_connection(conn, page_size)
    }

    fn new_with_connection(conn: Connection, page_size: usize) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                conn,
                cursors: HashMap::new(),
            }),
            page_size: page_size.max(1),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id TEXT NOT NULL UNIQUE,
                peer TEXT NOT NULL,
                sender_uri TEXT NOT NULL,
                sender_name TEXT,
                receiver_uri TEXT NOT NULL,
                receiver_name TEXT,
                timestamp INTEGER NOT NULL,
                content TEXT NOT NULL,
                content_type TEXT NOT NULL,
                state TEXT NOT NULL,
                disposition_state TEXT,
                disposition_notification TEXT NOT NULL,
                is_secure INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        // Paging walks a peer's history newest to oldest
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_history_peer_time
             ON history(peer, timestamp DESC, seq DESC)",
            [],
        )?;

        Ok(())
    }

    /// Store a message in a peer's history; returns false if it was already there
    pub async fn archive(&self, peer: &str, message: &Message) -> Result<bool> {
        let notifications = serde_json::to_string(&message.disposition_notification)?;
        let inner = self.inner.lock().await;

        let inserted = inner.conn.execute(
            "INSERT OR IGNORE INTO history
             (message_id, peer, sender_uri, sender_name, receiver_uri, receiver_name,
              timestamp, content, content_type, state, disposition_state,
              disposition_notification, is_secure)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                message.id,
                peer,
                message.sender.uri,
                message.sender.display_name,
                message.receiver.uri,
                message.receiver.display_name,
                message.timestamp.timestamp_millis(),
                message.content,
                message.content_type,
                message.state.as_str(),
                message.disposition_state.map(|s| s.as_str()),
                notifications,
                message.is_secure,
            ],
        )?;

        Ok(inserted > 0)
    }

    /// Number of archived messages for a peer
    pub async fn count(&self, peer: &str) -> Result<usize> {
        let inner = self.inner.lock().await;
        let count: usize = inner.conn.query_row(
            "SELECT COUNT(*) FROM history WHERE peer = ?1",
            params![peer],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn locate(conn: &Connection, peer: &str, id: &str) -> Result<Option<Cursor>> {
        let cursor = conn
            .query_row(
                "SELECT timestamp, seq FROM history WHERE peer = ?1 AND message_id = ?2",
                params![peer, id],
                |row| {
                    Ok(Cursor {
                        timestamp: row.get(0)?,
                        seq: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(cursor)
    }

    fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Message, Cursor)> {
        let timestamp_ms: i64 = row.get(6)?;
        let state: String = row.get(9)?;
        let disposition_state: Option<String> = row.get(10)?;
        let notifications: String = row.get(11)?;

        let message = Message {
            id: row.get(0)?,
            sender: Identity {
                uri: row.get(2)?,
                display_name: row.get(3)?,
            },
            receiver: Identity {
                uri: row.get(4)?,
                display_name: row.get(5)?,
            },
            timestamp: DateTime::<Utc>::from_timestamp_millis(timestamp_ms).unwrap_or_default(),
            content: row.get(7)?,
            content_type: row.get(8)?,
            state: MessageState::parse(&state).unwrap_or(MessageState::Error),
            disposition_state: disposition_state.as_deref().and_then(MessageState::parse),
            disposition_notification: serde_json::from_str::<Vec<NotificationKind>>(&notifications)
                .unwrap_or_default(),
            is_secure: row.get(12)?,
        };
        let cursor = Cursor {
            timestamp: timestamp_ms,
            seq: row.get(1)?,
        };
        Ok((message, cursor))
    }
}

#[async_trait]
impl HistoryProvider for SqliteHistory {
    async fn fetch_older_page(&self, peer: &str, before_id: Option<&str>) -> Result<Vec<Message>> {
        let mut inner = self.inner.lock().await;

        // A cursor we never archived (e.g. a live message) pages from the newest entry;
        // the store drops whatever overlaps.
        let cursor = match before_id {
            Some(id) => Self::locate(&inner.conn, peer, id)?,
            None => None,
        }
        .unwrap_or(Cursor {
            timestamp: i64::MAX,
            seq: i64::MAX,
        });

        let page = {
            let mut stmt = inner.conn.prepare(
                "SELECT message_id, seq, sender_uri, sender_name, receiver_uri, receiver_name,
                        timestamp, content, content_type, state, disposition_state,
                        disposition_notification, is_secure
                 FROM history
                 WHERE peer = ?1 AND (timestamp < ?2 OR (timestamp = ?2 AND seq < ?3))
                 ORDER BY timestamp DESC, seq DESC
                 LIMIT ?4",
            )?;

            let rows = stmt.query_map(
                params![peer, cursor.timestamp, cursor.seq, self.page_size as i64],
                Self::row_to_message,
            )?;

            let mut page = Vec::new();
            for row in rows {
                page.push(row?);
            }
            page.reverse();
            page
        };

        if let Some((_, oldest)) = page.first() {
            let oldest = *oldest;
            inner
                .cursors
                .entry(peer.to_string())
                .and_modify(|c| *c = (*c).min(oldest))
                .or_insert(oldest);
        }

        tracing::debug!("Served {} history messages for {}", page.len(), peer);
        Ok(page.into_iter().map(|(message, _)| message).collect())
    }

    async fn has_more(&self, peer: &str) -> Result<bool> {
        let inner = self.inner.lock().await;

        let remaining: i64 = match inner.cursors.get(peer) {
            Some(cursor) => inner.conn.query_row(
                "SELECT COUNT(*) FROM history
                 WHERE peer = ?1 AND (timestamp < ?2 OR (timestamp = ?2 AND seq < ?3))",
                params![peer, cursor.timestamp, cursor.seq],
                |row| row.get(0),
            ),
            None => inner.conn.query_row(
                "SELECT COUNT(*) FROM history WHERE peer = ?1",
                params![peer],
                |row| row.get(0),
            ),
        }
        .map_err(|e| Error::HistoryFetch {
            peer: peer.to_string(),
            reason: e.to_string(),
        })?;

        Ok(remaining > 0)
    }
}
