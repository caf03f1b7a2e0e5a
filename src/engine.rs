//! Engine facade
//!
//! Ties the conversation store, contact list, pagination controller,
//! history provider and receipt sink together behind the entry points the
//! UI layer calls. All mutations run on the caller's single event queue.

use crate::{
    contact_list::{ContactListEngine, ContactListView},
    history::HistoryProvider,
    pagination::{PageOutcome, PageRequest, PageResponse, PaginationController, ReceiptSink, Viewport},
    storage::{
        Conversation, ConversationStore, Message, MessageState, RawMessage, Settings, StoreEvent,
        StoreSnapshot, Transition,
    },
    Result,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Event observed from the messaging transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransportEvent {
    /// A message was sent or received
    Message {
        /// Peer URI
        peer: String,
        /// Transport record
        record: RawMessage,
    },
    /// A message's delivery state changed
    StateChanged {
        /// Peer URI
        peer: String,
        /// Message ID
        id: String,
        /// State the transport believed the message was in
        old_state: MessageState,
        /// Reported new state
        new_state: MessageState,
    },
    /// A message was deleted
    Removed {
        /// Peer URI
        peer: String,
        /// Message ID
        id: String,
    },
}

/// Conversation synchronization engine
pub struct ChatEngine {
    store: ConversationStore,
    contacts: ContactListEngine,
    pagination: PaginationController,
    history: Arc<dyn HistoryProvider>,
    receipts: Arc<dyn ReceiptSink>,
}

impl ChatEngine {
    /// Create an engine with an empty store
    pub fn new(
        settings: &Settings,
        history: Arc<dyn HistoryProvider>,
        receipts: Arc<dyn ReceiptSink>,
    ) -> Self {
        Self::with_store(
            settings,
            ConversationStore::with_capacity(settings.event_channel_capacity),
            history,
            receipts,
        )
    }

    /// Create an engine warm-started from a snapshot
    pub fn from_snapshot(
        settings: &Settings,
        snapshot: StoreSnapshot,
        history: Arc<dyn HistoryProvider>,
        receipts: Arc<dyn ReceiptSink>,
    ) -> Self {
        let store = ConversationStore::from_snapshot(snapshot, settings.event_channel_capacity);
        Self::with_store(settings, store, history, receipts)
    }

    fn with_store(
        settings: &Settings,
        store: ConversationStore,
        history: Arc<dyn HistoryProvider>,
        receipts: Arc<dyn ReceiptSink>,
    ) -> Self {
        Self {
            store,
            contacts: ContactListEngine::new(),
            pagination: PaginationController::new(settings.send_display_receipts),
            history,
            receipts,
        }
    }

    /// Read access to the store
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Read access to the pagination state
    pub fn pagination(&self) -> &PaginationController {
        &self.pagination
    }

    /// History provider, for executing page requests
    pub fn history(&self) -> Arc<dyn HistoryProvider> {
        Arc::clone(&self.history)
    }

    /// Subscribe to store change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    /// Sorted contact list and unread counters
    pub fn snapshot(&mut self) -> &ContactListView {
        self.contacts.view(&self.store)
    }

    /// Change the contact list filter text
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.contacts.set_filter(filter);
    }

    /// Route a transport event; returns whether the store changed
    pub fn handle_event(&mut self, event: TransportEvent) -> bool {
        match event {
            TransportEvent::Message { peer, record } => {
                self.upsert_message(&peer, Message::from_raw(record))
            }
            TransportEvent::StateChanged {
                peer,
                id,
                old_state,
                new_state,
            } => self
                .transition_message_state(&peer, &id, old_state, new_state)
                .is_some_and(|t| t.is_accepted()),
            TransportEvent::Removed { peer, id } => self.remove_message(&peer, &id).is_some(),
        }
    }

    /// Add a sent or received message
    pub fn upsert_message(&mut self, peer: &str, message: Message) -> bool {
        self.store.upsert_message(peer, message)
    }

    /// Apply a delivery state change
    pub fn transition_message_state(
        &mut self,
        peer: &str,
        id: &str,
        old_state: MessageState,
        new_state: MessageState,
    ) -> Option<Transition> {
        self.store
            .transition_message_state(peer, id, old_state, new_state)
    }

    /// Delete a message
    pub fn remove_message(&mut self, peer: &str, id: &str) -> Option<Message> {
        self.store.remove_message(peer, id)
    }

    /// Delete a whole conversation
    pub fn remove_conversation(&mut self, peer: &str) -> Option<Conversation> {
        self.pagination.forget_conversation(peer);
        self.store.remove_conversation(peer)
    }

    /// Start a conversation with no history and open it
    pub fn create_conversation(&mut self, peer: &str, display_name: Option<String>) -> bool {
        let created = self.store.create_conversation(peer, display_name);
        self.pagination.open_conversation(peer);
        created
    }

    /// Make a conversation the open one
    pub fn open_conversation(&mut self, peer: &str) {
        self.pagination.open_conversation(peer);
    }

    /// Issue a fetch for older history of a conversation
    pub fn request_older_page(&mut self, peer: &str, viewport: &dyn Viewport) -> Option<PageRequest> {
        self.pagination
            .request_older_page(&self.store, peer, viewport)
    }

    /// The pagination sentinel came into view
    pub fn on_sentinel_visible(&mut self, viewport: &dyn Viewport) -> Option<PageRequest> {
        self.pagination.on_sentinel_visible(&self.store, viewport)
    }

    /// Apply a fetched page
    pub fn on_page_loaded(
        &mut self,
        response: PageResponse,
        viewport: &mut dyn Viewport,
    ) -> Result<PageOutcome> {
        self.pagination
            .on_page_loaded(&mut self.store, response, viewport)
    }

    /// A message element came into view
    pub fn on_message_visible(&mut self, peer: &str, id: &str) -> bool {
        self.pagination
            .on_message_visible(&mut self.store, peer, id, self.receipts.as_ref())
    }

    /// Request, fetch and apply one page in a single call
    ///
    /// Holds the engine for the whole fetch; hosts that must keep applying
    /// events meanwhile should drive [`PageRequest::execute`] themselves.
    /// Returns Ok(None) when a fetch for this conversation is already
    /// outstanding.
    pub async fn load_older_page(
        &mut self,
        peer: &str,
        viewport: &mut dyn Viewport,
    ) -> Result<Option<PageOutcome>> {
        let Some(request) = self.request_older_page(peer, viewport) else {
            return Ok(None);
        };
        let history = self.history();
        let response = request.execute(history.as_ref()).await;
        self.on_page_loaded(response, viewport).map(Some)
    }
}
