// Snapshot Tests - Testing JSON/CBOR persistence of the store

use crate::storage::{ConversationStore, MessageState, StoreSnapshot};
use crate::tests::helpers::{received, sent, ALICE, BOB};
use tempfile::{NamedTempFile, TempDir};

fn populated_store() -> ConversationStore {
    let mut store = ConversationStore::new();
    store.upsert_message(ALICE, received("a1", ALICE, 1));
    store.upsert_message(ALICE, sent("a2", ALICE, 2));
    store.transition_message_state(ALICE, "a2", MessageState::Pending, MessageState::Accepted);
    store.create_conversation(BOB, Some("Bob".to_string()));
    store
}

#[test]
fn test_snapshot_save_load_json() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let snapshot = populated_store().to_snapshot();

    snapshot.save(temp_file.path()).expect("Failed to save snapshot");
    let loaded = StoreSnapshot::load(temp_file.path()).expect("Failed to load snapshot");

    assert_eq!(loaded.version, snapshot.version);
    assert_eq!(loaded.conversations.len(), 2);
    assert_eq!(loaded.conversations[0].messages[1].state, MessageState::Accepted);
    assert_eq!(loaded.conversations[1].peer.display_name.as_deref(), Some("Bob"));
}

#[test]
fn test_snapshot_save_load_cbor() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let snapshot = populated_store().to_snapshot();

    snapshot.save_cbor(temp_file.path()).expect("Failed to save snapshot");
    let loaded = StoreSnapshot::load_cbor(temp_file.path()).expect("Failed to load snapshot");

    assert_eq!(loaded.version, snapshot.version);
    assert_eq!(loaded.conversations[0].messages[0], snapshot.conversations[0].messages[0]);
}

#[test]
fn test_snapshot_missing_file_is_empty() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let json = StoreSnapshot::load(dir.path().join("missing.json")).expect("Failed to load");
    let cbor = StoreSnapshot::load_cbor(dir.path().join("missing.cbor")).expect("Failed to load");

    assert!(json.conversations.is_empty());
    assert!(cbor.conversations.is_empty());
}

#[test]
fn test_snapshot_corrupt_cbor() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    std::fs::write(temp_file.path(), [0xff, 0x00, 0x13]).expect("Failed to write");

    assert!(matches!(
        StoreSnapshot::load_cbor(temp_file.path()),
        Err(crate::Error::CborSerialization(_))
    ));
}

#[test]
fn test_restored_store_keeps_deduplicating() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    populated_store().to_snapshot().save(temp_file.path()).expect("Failed to save");

    let snapshot = StoreSnapshot::load(temp_file.path()).expect("Failed to load");
    let mut store = ConversationStore::from_snapshot(snapshot, 8);

    assert!(!store.upsert_message(ALICE, received("a1", ALICE, 1)));
    assert_eq!(store.conversation(ALICE).unwrap().len(), 2);
}
