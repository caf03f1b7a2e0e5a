// Message Tests - Testing the Message entity and raw record conversion

use crate::storage::{Identity, Message, MessageState, NotificationKind, RawMessage};
use crate::tests::helpers::{otr, received, sent, ALICE, ME};

fn raw(id: Option<&str>) -> RawMessage {
    RawMessage {
        id: id.map(str::to_string),
        sender: Identity::new(ALICE).with_display_name("Alice"),
        receiver: Identity::new(ME),
        timestamp: Some("2024-03-01T10:15:00Z".to_string()),
        content: "hello".to_string(),
        content_type: Some("text/plain".to_string()),
        state: None,
        disposition_state: None,
        disposition_notification: vec!["positive-delivery".to_string(), "display".to_string()],
        is_secure: true,
    }
}

#[test]
fn test_outgoing_starts_pending() {
    let msg = sent("m1", ALICE, 0);
    assert_eq!(msg.state, MessageState::Pending);
    assert_eq!(msg.content_type, "text/plain");
    assert!(msg.disposition_state.is_none());
}

#[test]
fn test_incoming_starts_received() {
    let msg = received("m1", ALICE, 0);
    assert_eq!(msg.state, MessageState::Received);
    assert!(msg.requests_display());
    assert!(msg.is_unread());
}

#[test]
fn test_protocol_internal_detection() {
    assert!(otr("o1", ALICE, 0).is_protocol_internal());
    assert!(!received("m1", ALICE, 0).is_protocol_internal());

    // Prefix must be at the very start
    let mut msg = received("m2", ALICE, 0);
    msg.content = "see ?OTRv3".to_string();
    assert!(!msg.is_protocol_internal());
}

#[test]
fn test_protocol_internal_never_unread() {
    assert!(!otr("o1", ALICE, 0).is_unread());
}

#[test]
fn test_unread_predicate() {
    let mut msg = received("m1", ALICE, 0);
    assert!(msg.is_unread());

    msg.disposition_state = Some(MessageState::Displayed);
    assert!(!msg.is_unread());

    let no_display = received("m2", ALICE, 0).with_notifications(&[NotificationKind::Delivery]);
    assert!(!no_display.is_unread());

    let outgoing = sent("m3", ALICE, 0).with_notifications(&[NotificationKind::Display]);
    assert!(!outgoing.is_unread());
}

#[test]
fn test_from_raw_well_formed() {
    let msg = Message::from_raw(raw(Some("abc")));

    assert_eq!(msg.id, "abc");
    assert_eq!(msg.state, MessageState::Received);
    assert_eq!(msg.sender.display_name.as_deref(), Some("Alice"));
    assert_eq!(msg.timestamp.to_rfc3339(), "2024-03-01T10:15:00+00:00");
    assert_eq!(
        msg.disposition_notification,
        vec![NotificationKind::PositiveDelivery, NotificationKind::Display]
    );
    assert!(msg.is_secure);
}

#[test]
fn test_from_raw_keeps_explicit_state() {
    let mut record = raw(Some("abc"));
    record.state = Some("delivered".to_string());
    record.disposition_state = Some("displayed".to_string());

    let msg = Message::from_raw(record);
    assert_eq!(msg.state, MessageState::Delivered);
    assert_eq!(msg.disposition_state, Some(MessageState::Displayed));
}

#[test]
fn test_from_raw_missing_id_gets_uuid_and_error_state() {
    let msg = Message::from_raw(raw(None));

    assert!(uuid::Uuid::parse_str(&msg.id).is_ok());
    assert_eq!(msg.state, MessageState::Error);
}

#[test]
fn test_from_raw_bad_timestamp_is_error_state() {
    let mut record = raw(Some("abc"));
    record.timestamp = Some("yesterday".to_string());

    let msg = Message::from_raw(record);
    assert_eq!(msg.id, "abc");
    assert_eq!(msg.state, MessageState::Error);
    assert_eq!(msg.content, "hello");
}

#[test]
fn test_from_raw_unknown_state_is_error_state() {
    let mut record = raw(Some("abc"));
    record.state = Some("teleported".to_string());

    assert_eq!(Message::from_raw(record).state, MessageState::Error);
}

#[test]
fn test_from_raw_missing_content_type_is_error_state() {
    let mut record = raw(Some("abc"));
    record.content_type = None;

    assert_eq!(Message::from_raw(record).state, MessageState::Error);
}

#[test]
fn test_from_raw_ignores_unknown_notification_tags() {
    let mut record = raw(Some("abc"));
    record.disposition_notification = vec!["display".to_string(), "processing".to_string()];

    let msg = Message::from_raw(record);
    assert_eq!(msg.disposition_notification, vec![NotificationKind::Display]);
    assert_eq!(msg.state, MessageState::Received);
}

#[test]
fn test_raw_message_from_json() {
    let json = r#"{
        "id": "j1",
        "sender": {"uri": "alice@example.com", "display_name": "Alice"},
        "receiver": {"uri": "me@example.com"},
        "timestamp": "2024-03-01T10:15:00+01:00",
        "content": "hi",
        "content_type": "text/plain",
        "disposition_notification": ["display"]
    }"#;

    let record: RawMessage = serde_json::from_str(json).expect("Failed to parse record");
    let msg = Message::from_raw(record);

    assert_eq!(msg.id, "j1");
    assert_eq!(msg.timestamp.to_rfc3339(), "2024-03-01T09:15:00+00:00");
    assert!(msg.is_unread());
}

#[test]
fn test_state_tags() {
    for state in [
        MessageState::Pending,
        MessageState::Accepted,
        MessageState::Delivered,
        MessageState::Displayed,
        MessageState::Received,
        MessageState::Failed,
        MessageState::Error,
    ] {
        assert_eq!(MessageState::parse(state.as_str()), Some(state));
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            format!("\"{}\"", state)
        );
    }
    assert_eq!(MessageState::parse("bogus"), None);
}

#[test]
fn test_identity_label() {
    assert_eq!(Identity::new(ALICE).label(), ALICE);
    assert_eq!(Identity::new(ALICE).with_display_name("Alice").label(), "Alice");
}

#[test]
fn test_message_state_defaults_to_pending() {
    assert_eq!(MessageState::default(), MessageState::Pending);
}
