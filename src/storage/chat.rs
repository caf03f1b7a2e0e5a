//! Conversation with a single peer

use crate::storage::message::{Identity, Message};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered message history with one peer
///
/// Messages are kept in arrival order, which is not necessarily timestamp
/// order: older history pages are inserted at the head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// The remote party
    pub peer: Identity,
    /// Messages in arrival order
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation with a peer
    pub fn new(peer: Identity) -> Self {
        Self {
            peer,
            messages: Vec::new(),
        }
    }

    /// Peer URI this conversation is keyed by
    pub fn uri(&self) -> &str {
        &self.peer.uri
    }

    /// Number of stored messages, protocol-internal ones included
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation has no messages at all
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether a message with this ID is present
    pub fn contains(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    /// Get a message by ID
    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Get a mutable message by ID
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Append a message at the tail; returns false if the ID is already present
    pub fn append_message(&mut self, msg: Message) -> bool {
        if self.contains(&msg.id) {
            return false;
        }
        self.messages.push(msg);
        true
    }

    /// Insert an older-history page at the head
    ///
    /// Messages already present (or repeated within the page) are dropped.
    /// The remaining ones are placed oldest first ahead of the existing
    /// entries, whose relative order is untouched. A page whose first
    /// message is newer than its last is taken as newest first and flipped
    /// before sorting, so equal timestamps keep their arrival order either
    /// way. Returns how many were inserted.
    pub fn prepend_page(&mut self, mut page: Vec<Message>) -> usize {
        if page.first().map(|m| m.timestamp) > page.last().map(|m| m.timestamp) {
            page.reverse();
        }

        let mut seen: HashSet<String> = self.messages.iter().map(|m| m.id.clone()).collect();
        let mut fresh: Vec<Message> = page
            .into_iter()
            .filter(|m| seen.insert(m.id.clone()))
            .collect();

        if fresh.is_empty() {
            return 0;
        }

        fresh.sort_by_key(|m| m.timestamp);
        let inserted = fresh.len();
        fresh.append(&mut self.messages);
        self.messages = fresh;
        inserted
    }

    /// Remove a message by ID
    pub fn remove_message(&mut self, id: &str) -> Option<Message> {
        let position = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(position))
    }

    /// Most recent user-visible message, skipping trailing protocol-internal ones
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| !m.is_protocol_internal())
    }

    /// ID of the oldest loaded message, used as the history cursor
    pub fn oldest_message_id(&self) -> Option<&str> {
        self.messages.first().map(|m| m.id.as_str())
    }

    /// Number of messages still owed a display notification
    pub fn unread_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_unread()).count()
    }

    /// Case-insensitive match of the peer name or URI against a lowercase needle
    pub fn matches_filter(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.peer.uri.to_lowercase().contains(needle)
            || self
                .peer
                .display_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(needle))
    }
}
