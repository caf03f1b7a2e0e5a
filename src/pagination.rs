//! Pagination and scroll-anchoring controller
//!
//! Drives "load older history" for the open conversation:
//! - At most one outstanding fetch per conversation
//! - Scroll position preserved across prepends
//! - Responses for a conversation that is no longer open are dropped
//! - Display notifications emitted once when messages scroll into view

use crate::{
    history::HistoryProvider,
    storage::{ConversationStore, Message},
    Error, Result,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Scroll metrics of the message list
///
/// Measurement stays outside the engine; the controller only needs the
/// content height for a given message list and the current offset.
pub trait Viewport {
    /// Total height the given messages occupy once laid out
    fn content_height(&self, messages: &[Message]) -> f64;
    /// Current scroll offset from the top
    fn scroll_offset(&self) -> f64;
    /// Move the scroll offset
    fn set_scroll_offset(&mut self, offset: f64);
}

/// Outbound display notifications
pub trait ReceiptSink: Send + Sync {
    /// Tell the peer that a message was displayed
    fn send_displayed(&self, peer: &str, message_id: &str, timestamp: DateTime<Utc>);
}

/// Scroll metrics captured before a prepend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnchor {
    /// Content height before the insert
    pub content_height: f64,
    /// Scroll offset before the insert
    pub scroll_offset: f64,
}

impl ScrollAnchor {
    /// Offset keeping the previously visible content stationary
    pub fn restored_offset(&self, new_content_height: f64) -> f64 {
        self.scroll_offset + (new_content_height - self.content_height)
    }
}

/// An issued history fetch, detached from the controller
///
/// Executing it does not borrow the engine, so other events may be applied
/// while it is outstanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Conversation the page is for
    pub peer: String,
    /// Oldest message loaded when the request was issued
    pub before_id: Option<String>,
}

impl PageRequest {
    /// Fetch the page, then probe whether more history remains
    pub async fn execute(self, provider: &dyn HistoryProvider) -> PageResponse {
        let messages = provider
            .fetch_older_page(&self.peer, self.before_id.as_deref())
            .await;

        let has_more = match &messages {
            Ok(_) => match provider.has_more(&self.peer).await {
                Ok(has_more) => Some(has_more),
                Err(e) => {
                    warn!("has_more probe for {} failed: {}", self.peer, e);
                    None
                }
            },
            Err(_) => None,
        };

        PageResponse {
            peer: self.peer,
            messages,
            has_more,
        }
    }
}

/// Result of an executed [`PageRequest`]
#[derive(Debug)]
pub struct PageResponse {
    /// Conversation the page was fetched for
    pub peer: String,
    /// The page, or the provider's failure
    pub messages: Result<Vec<Message>>,
    /// Outcome of the `has_more` probe, if it ran and succeeded
    pub has_more: Option<bool>,
}

/// What happened to a page response
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageOutcome {
    /// The page was merged into the open conversation
    Applied {
        /// Messages actually inserted after deduplication
        inserted: usize,
        /// Scroll offset after anchoring
        scroll_offset: f64,
    },
    /// The conversation was switched while the fetch was outstanding
    Discarded,
}

/// Pagination state of the open conversation
#[derive(Debug)]
pub struct PaginationController {
    active_peer: Option<String>,
    in_flight: HashSet<String>,
    has_more_remaining: bool,
    anchors: HashMap<String, ScrollAnchor>,
    send_receipts: bool,
}

impl PaginationController {
    /// Create a controller; `send_receipts` gates display notifications
    pub fn new(send_receipts: bool) -> Self {
        Self {
            active_peer: None,
            in_flight: HashSet::new(),
            has_more_remaining: true,
            anchors: HashMap::new(),
            send_receipts,
        }
    }

    /// Switch the open conversation
    ///
    /// An outstanding fetch for the previous conversation is not cancelled;
    /// its response is discarded if it arrives while another conversation
    /// is open, and applied with its captured anchor otherwise.
    pub fn open_conversation(&mut self, peer: &str) {
        if self.active_peer.as_deref() == Some(peer) {
            return;
        }
        debug!("Opening conversation {}", peer);
        self.active_peer = Some(peer.to_string());
        self.has_more_remaining = true;
    }

    /// Conversation currently open
    pub fn active_peer(&self) -> Option<&str> {
        self.active_peer.as_deref()
    }

    /// Whether a fetch for the open conversation is outstanding
    pub fn is_loading(&self) -> bool {
        self.active_peer
            .as_ref()
            .is_some_and(|peer| self.in_flight.contains(peer))
    }

    /// Whether the last probe reported more history
    pub fn has_more_remaining(&self) -> bool {
        self.has_more_remaining
    }

    /// Scroll metrics captured for the open conversation's outstanding fetch
    pub fn anchor(&self) -> Option<ScrollAnchor> {
        self.active_peer
            .as_ref()
            .and_then(|peer| self.anchors.get(peer))
            .copied()
    }

    /// Issue a fetch for older history
    ///
    /// Returns None while a fetch for the same conversation is outstanding.
    pub fn request_older_page(
        &mut self,
        store: &ConversationStore,
        peer: &str,
        viewport: &dyn Viewport,
    ) -> Option<PageRequest> {
        if self.in_flight.contains(peer) {
            debug!("Fetch for {} already in flight", peer);
            return None;
        }

        let conversation = store.conversation(peer);
        let messages = conversation.map(|c| c.messages.as_slice()).unwrap_or(&[]);
        self.anchors.insert(
            peer.to_string(),
            ScrollAnchor {
                content_height: viewport.content_height(messages),
                scroll_offset: viewport.scroll_offset(),
            },
        );
        self.in_flight.insert(peer.to_string());

        Some(PageRequest {
            peer: peer.to_string(),
            before_id: conversation
                .and_then(|c| c.oldest_message_id())
                .map(str::to_string),
        })
    }

    /// The sentinel above the oldest message came into view
    pub fn on_sentinel_visible(
        &mut self,
        store: &ConversationStore,
        viewport: &dyn Viewport,
    ) -> Option<PageRequest> {
        let peer = self.active_peer.clone()?;
        if !self.has_more_remaining || self.is_loading() {
            return None;
        }
        self.request_older_page(store, &peer, viewport)
    }

    /// Merge a fetched page and restore the scroll position
    ///
    /// # Errors
    /// A provider failure is returned as [`Error::HistoryFetch`]; loading is
    /// cleared and `has_more_remaining` is left unchanged so the caller can
    /// retry.
    pub fn on_page_loaded(
        &mut self,
        store: &mut ConversationStore,
        response: PageResponse,
        viewport: &mut dyn Viewport,
    ) -> Result<PageOutcome> {
        let PageResponse {
            peer,
            messages,
            has_more,
        } = response;
        self.in_flight.remove(&peer);
        let anchor = self.anchors.remove(&peer);

        if self.active_peer.as_deref() != Some(peer.as_str()) {
            info!("Discarding stale history page for {}", peer);
            return Ok(PageOutcome::Discarded);
        }

        let messages = messages.map_err(|e| {
            warn!("History fetch for {} failed: {}", peer, e);
            Error::HistoryFetch {
                peer: peer.clone(),
                reason: e.to_string(),
            }
        })?;

        let inserted = store.prepend_history_page(&peer, messages);
        if let Some(has_more) = has_more {
            self.has_more_remaining = has_more;
        }

        let new_height = viewport.content_height(
            store
                .conversation(&peer)
                .map(|c| c.messages.as_slice())
                .unwrap_or(&[]),
        );
        let scroll_offset = match anchor {
            Some(anchor) => anchor.restored_offset(new_height),
            None => viewport.scroll_offset(),
        };
        viewport.set_scroll_offset(scroll_offset);

        debug!("Prepended {} messages for {}", inserted, peer);
        Ok(PageOutcome::Applied {
            inserted,
            scroll_offset,
        })
    }

    /// A message element entered the viewport
    ///
    /// Emits a display notification at most once per message, and only for
    /// received messages that asked for one and were not displayed yet. The
    /// message is marked displayed right after, which keeps later calls quiet.
    /// Returns whether a notification was sent.
    pub fn on_message_visible(
        &mut self,
        store: &mut ConversationStore,
        peer: &str,
        id: &str,
        sink: &dyn ReceiptSink,
    ) -> bool {
        if !self.send_receipts {
            return false;
        }
        let Some(message) = store.message(peer, id) else {
            return false;
        };
        if !message.is_unread() {
            return false;
        }

        sink.send_displayed(peer, id, message.timestamp);
        debug!("Sent display notification for {} to {}", id, peer);
        store.mark_displayed(peer, id);
        true
    }

    /// Drop per-conversation bookkeeping after a conversation was deleted
    pub fn forget_conversation(&mut self, peer: &str) {
        self.anchors.remove(peer);
        if self.active_peer.as_deref() == Some(peer) {
            self.active_peer = None;
        }
    }
}
