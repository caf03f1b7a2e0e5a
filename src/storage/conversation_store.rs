//! Conversation store
//!
//! The single shared mutable resource of the engine. Every successful
//! mutation bumps `version` and broadcasts exactly one [`StoreEvent`];
//! no-ops (duplicates, stale transitions, unknown targets) leave both alone.

use crate::storage::{
    chat::Conversation,
    disposition::{transition, Transition},
    message::{Identity, Message, MessageState},
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Default capacity of the change channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Change notification emitted by the store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// An empty conversation was opened explicitly
    ConversationCreated {
        /// Peer URI
        peer: String,
    },
    /// A new message was appended
    MessageAdded {
        /// Peer URI
        peer: String,
        /// Message ID
        id: String,
    },
    /// An older-history page was inserted at the head
    HistoryPrepended {
        /// Peer URI
        peer: String,
        /// Number of messages actually inserted
        inserted: usize,
    },
    /// A message moved to a new delivery state
    StateChanged {
        /// Peer URI
        peer: String,
        /// Message ID
        id: String,
        /// Previous state
        from: MessageState,
        /// New state
        to: MessageState,
    },
    /// A message was marked as displayed locally
    Displayed {
        /// Peer URI
        peer: String,
        /// Message ID
        id: String,
    },
    /// A message was deleted
    MessageRemoved {
        /// Peer URI
        peer: String,
        /// Message ID
        id: String,
    },
    /// A whole conversation was deleted
    ConversationRemoved {
        /// Peer URI
        peer: String,
    },
}

/// Serializable copy of the store contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Store version at capture time
    pub version: u64,
    /// Conversations in store order
    pub conversations: Vec<Conversation>,
}

/// Per-peer conversations, kept in creation order
#[derive(Debug)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    version: u64,
    events: broadcast::Sender<StoreEvent>,
}

impl ConversationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create an empty store whose change channel holds `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            conversations: Vec::new(),
            version: 0,
            events,
        }
    }

    /// Rebuild a store from a snapshot
    pub fn from_snapshot(snapshot: StoreSnapshot, capacity: usize) -> Self {
        let mut store = Self::with_capacity(capacity);
        store.conversations = snapshot.conversations;
        store.version = snapshot.version;
        store
    }

    /// Capture the current contents
    pub fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            version: self.version,
            conversations: self.conversations.clone(),
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Monotonic change counter
    pub fn version(&self) -> u64 {
        self.version
    }

    /// All conversations; ordering for display is the contact list's job
    pub fn list_conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Get a conversation by peer URI
    pub fn conversation(&self, peer: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.uri() == peer)
    }

    /// Get a message by peer URI and ID
    pub fn message(&self, peer: &str, id: &str) -> Option<&Message> {
        self.conversation(peer)?.get(id)
    }

    fn conversation_mut(&mut self, peer: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.uri() == peer)
    }

    fn get_or_create(&mut self, peer: &str) -> &mut Conversation {
        let position = match self.conversations.iter().position(|c| c.uri() == peer) {
            Some(position) => position,
            None => {
                self.conversations
                    .push(Conversation::new(Identity::new(peer)));
                self.conversations.len() - 1
            }
        };
        &mut self.conversations[position]
    }

    fn publish(&mut self, event: StoreEvent) {
        self.version += 1;
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    /// Open a conversation with no history; returns false if it already exists
    pub fn create_conversation(&mut self, peer: &str, display_name: Option<String>) -> bool {
        if let Some(existing) = self.conversation_mut(peer) {
            if existing.peer.display_name.is_none() && display_name.is_some() {
                existing.peer.display_name = display_name;
            }
            return false;
        }

        let mut identity = Identity::new(peer);
        identity.display_name = display_name;
        self.conversations.push(Conversation::new(identity));
        self.publish(StoreEvent::ConversationCreated {
            peer: peer.to_string(),
        });
        true
    }

    /// Append a newly sent or received message
    ///
    /// Creates the conversation if needed. A message whose ID is already
    /// present is ignored and false is returned.
    pub fn upsert_message(&mut self, peer: &str, message: Message) -> bool {
        let id = message.id.clone();
        let learned_name = [&message.sender, &message.receiver]
            .into_iter()
            .find(|identity| identity.uri == peer)
            .and_then(|identity| identity.display_name.clone());

        let conversation = self.get_or_create(peer);
        if !conversation.append_message(message) {
            debug!("Ignoring duplicate message {} for {}", id, peer);
            return false;
        }
        if learned_name.is_some() {
            conversation.peer.display_name = learned_name;
        }

        self.publish(StoreEvent::MessageAdded {
            peer: peer.to_string(),
            id,
        });
        true
    }

    /// Insert a page of older history at the head, dropping known IDs
    ///
    /// Returns the number of messages inserted.
    pub fn prepend_history_page(&mut self, peer: &str, messages: Vec<Message>) -> usize {
        if messages.is_empty() {
            return 0;
        }

        let inserted = self.get_or_create(peer).prepend_page(messages);
        if inserted == 0 {
            debug!("History page for {} contained only known messages", peer);
            return 0;
        }

        self.publish(StoreEvent::HistoryPrepended {
            peer: peer.to_string(),
            inserted,
        });
        inserted
    }

    /// Apply a delivery state change reported by the transport
    ///
    /// `old_state` is what the transport believed the state to be; the
    /// decision is made against the message's actual state. Returns None
    /// when the message is unknown (e.g. already deleted locally).
    pub fn transition_message_state(
        &mut self,
        peer: &str,
        id: &str,
        old_state: MessageState,
        new_state: MessageState,
    ) -> Option<Transition> {
        let Some(message) = self.conversation_mut(peer).and_then(|c| c.get_mut(id)) else {
            debug!("State change for unknown message {} ({})", id, peer);
            return None;
        };

        if message.state != old_state {
            debug!(
                "Message {} is {} but transport reported {}",
                id, message.state, old_state
            );
        }

        let outcome = transition(message.state, new_state);
        match outcome {
            Transition::Accepted { from, to } => {
                message.state = to;
                self.publish(StoreEvent::StateChanged {
                    peer: peer.to_string(),
                    id: id.to_string(),
                    from,
                    to,
                });
            }
            Transition::Rejected { current, requested, reason } => {
                debug!(
                    "Rejected {} -> {} for {}: {:?}",
                    current, requested, id, reason
                );
            }
        }
        Some(outcome)
    }

    /// Record that a display notification was sent for a message
    pub fn mark_displayed(&mut self, peer: &str, id: &str) -> bool {
        let Some(message) = self.conversation_mut(peer).and_then(|c| c.get_mut(id)) else {
            return false;
        };
        if message.disposition_state == Some(MessageState::Displayed) {
            return false;
        }

        message.disposition_state = Some(MessageState::Displayed);
        self.publish(StoreEvent::Displayed {
            peer: peer.to_string(),
            id: id.to_string(),
        });
        true
    }

    /// Delete a single message
    pub fn remove_message(&mut self, peer: &str, id: &str) -> Option<Message> {
        let removed = self.conversation_mut(peer)?.remove_message(id)?;
        self.publish(StoreEvent::MessageRemoved {
            peer: peer.to_string(),
            id: id.to_string(),
        });
        Some(removed)
    }

    /// Delete a whole conversation
    pub fn remove_conversation(&mut self, peer: &str) -> Option<Conversation> {
        let position = self.conversations.iter().position(|c| c.uri() == peer)?;
        let removed = self.conversations.remove(position);
        self.publish(StoreEvent::ConversationRemoved {
            peer: peer.to_string(),
        });
        Some(removed)
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}
