//! Contact list ordering and unread counters
//!
//! A pure derivation over the conversation store. The view is cached and
//! only recomputed when the store version or the filter text changes.

use crate::storage::{Conversation, ConversationStore, Identity, Message};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// One row of the contact list
#[derive(Debug, Clone, PartialEq)]
pub struct ContactEntry {
    /// The remote party
    pub peer: Identity,
    /// Most recent user-visible message
    pub last_message: Option<Message>,
    /// Messages still owed a display notification
    pub unread_count: usize,
    /// Number of stored messages
    pub message_count: usize,
    /// Synthesized "new conversation" row for a peer not in the store
    pub placeholder: bool,
}

impl ContactEntry {
    fn from_conversation(conversation: &Conversation) -> Self {
        Self {
            peer: conversation.peer.clone(),
            last_message: conversation.last_message().cloned(),
            unread_count: conversation.unread_count(),
            message_count: conversation.len(),
            placeholder: false,
        }
    }

    fn placeholder(uri: &str) -> Self {
        Self {
            peer: Identity::new(uri),
            last_message: None,
            unread_count: 0,
            message_count: 0,
            placeholder: true,
        }
    }
}

/// Sorted, filtered contact list plus unread counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactListView {
    /// Rows in display order
    pub entries: Vec<ContactEntry>,
    /// Unread count per peer, over all conversations regardless of the filter
    pub unread_by_peer: BTreeMap<String, usize>,
    /// Sum of all unread counts
    pub total_unread: usize,
}

impl ContactListView {
    /// Unread count for one peer
    pub fn unread_for(&self, peer: &str) -> usize {
        self.unread_by_peer.get(peer).copied().unwrap_or(0)
    }
}

/// Derive the contact list for a set of conversations and a filter
pub fn derive_view(conversations: &[Conversation], filter: &str) -> ContactListView {
    let needle = filter.trim().to_lowercase();

    let mut unread_by_peer = BTreeMap::new();
    for conversation in conversations {
        let unread = conversation.unread_count();
        if unread > 0 {
            unread_by_peer.insert(conversation.uri().to_string(), unread);
        }
    }
    let total_unread = unread_by_peer.values().sum();

    let mut matched = false;
    let mut entries: Vec<ContactEntry> = Vec::new();
    for conversation in conversations {
        if conversation.matches_filter(&needle) {
            matched = true;
            entries.push(ContactEntry::from_conversation(conversation));
        } else if conversation.is_empty() {
            entries.push(ContactEntry::from_conversation(conversation));
        }
    }

    // Conversations without a visible message sort first, as if just created.
    // sort_by_key is stable, so ties keep store order.
    entries.sort_by_key(|entry| {
        let timestamp = entry.last_message.as_ref().map(|m| m.timestamp);
        (timestamp.is_some(), Reverse(timestamp))
    });

    if !needle.is_empty() && !matched {
        entries.insert(0, ContactEntry::placeholder(filter.trim()));
    }

    ContactListView {
        entries,
        unread_by_peer,
        total_unread,
    }
}

/// Cached contact list over a conversation store
#[derive(Debug, Default)]
pub struct ContactListEngine {
    filter: String,
    cache: Option<(u64, ContactListView)>,
}

impl ContactListEngine {
    /// Create an engine with an empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Current filter text
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Change the filter text; invalidates the cached view if it differs
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        let filter = filter.into();
        if filter != self.filter {
            self.filter = filter;
            self.cache = None;
        }
    }

    /// Current view, recomputed only if the store changed since the last call
    pub fn view(&mut self, store: &ConversationStore) -> &ContactListView {
        let version = store.version();
        if !matches!(&self.cache, Some((cached, _)) if *cached == version) {
            self.cache = None;
        }

        let filter = &self.filter;
        &self
            .cache
            .get_or_insert_with(|| {
                tracing::trace!("Recomputing contact list at store version {}", version);
                (version, derive_view(store.list_conversations(), filter))
            })
            .1
    }
}
