//! Conversation storage module
//!
//! This module holds the in-memory model of the chat history:
//! - `message` - Message entity, identities and transport records
//! - `disposition` - Delivery/read state machine
//! - `chat` - A single ordered conversation
//! - `conversation_store` - All conversations plus change notifications
//! - `snapshot` - JSON/CBOR export of the store
//! - `settings` - Engine configuration

// Submodules
pub mod chat;
pub mod conversation_store;
pub mod disposition;
pub mod message;
pub mod settings;
pub mod snapshot;

// Re-export commonly used types
pub use chat::Conversation;
pub use conversation_store::{ConversationStore, StoreEvent, StoreSnapshot};
pub use disposition::{transition, RejectReason, Transition};
pub use message::{Identity, Message, MessageState, NotificationKind, RawMessage};
pub use settings::Settings;
