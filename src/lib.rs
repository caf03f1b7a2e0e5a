//! Chatsync - conversation synchronization and pagination engine
//!
//! This library keeps the in-memory model of a chat client's conversations:
//! per-peer ordered message history, delivery/read disposition tracking,
//! unread counters, the sorted contact list and scroll-anchored loading of
//! older history.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contact_list;
pub mod engine;
pub mod history;
pub mod pagination;
pub mod storage;

#[cfg(test)]
mod tests;

/// Result type alias for Chatsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Chatsync operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Conversation store or snapshot error
    #[error("Storage error: {0}")]
    Storage(String),

    /// History provider rejected a page fetch
    #[error("History fetch for {peer} failed: {reason}")]
    HistoryFetch {
        /// Peer whose history was requested
        peer: String,
        /// Failure reported by the provider
        reason: String,
    },

    /// No conversation exists for the given peer
    #[error("Unknown conversation: {0}")]
    UnknownConversation(String),

    /// Settings could not be read, parsed or validated
    #[error("Settings error: {0}")]
    Settings(String),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// CBOR serialization error
    #[error("CBOR serialization error: {0}")]
    CborSerialization(String),

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl Error {
    /// Whether the caller may simply re-invoke the failed operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::HistoryFetch { .. } | Error::Database(_))
    }
}

/// Initialize logging for hosts that don't install their own subscriber
pub fn init() {
    tracing_subscriber::fmt::init();
}
