// Shared test fixtures: message builders and in-test fakes for the
// history provider, receipt sink and viewport.

use crate::history::HistoryProvider;
use crate::pagination::{ReceiptSink, Viewport};
use crate::storage::{Identity, Message, NotificationKind};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const ME: &str = "me@example.com";
pub const ALICE: &str = "alice@example.com";
pub const BOB: &str = "bob@example.com";

pub fn ts(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

/// Inbound message asking for a display notification
pub fn received(id: &str, from: &str, seconds: i64) -> Message {
    Message::incoming(id, Identity::new(from), Identity::new(ME), format!("text {}", id), ts(seconds))
        .with_notifications(&[NotificationKind::PositiveDelivery, NotificationKind::Display])
}

/// Outbound message in pending state
pub fn sent(id: &str, to: &str, seconds: i64) -> Message {
    Message::outgoing(id, Identity::new(ME), Identity::new(to), format!("text {}", id), ts(seconds))
}

/// Inbound encryption-negotiation marker
pub fn otr(id: &str, from: &str, seconds: i64) -> Message {
    let mut message = received(id, from, seconds);
    message.content = "?OTRv3?".to_string();
    message
}

/// Receipt sink recording every call
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<(String, String, DateTime<Utc>)>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl ReceiptSink for RecordingSink {
    fn send_displayed(&self, peer: &str, message_id: &str, timestamp: DateTime<Utc>) {
        self.sent
            .lock()
            .unwrap()
            .push((peer.to_string(), message_id.to_string(), timestamp));
    }
}

/// Viewport with fixed-height rows
pub struct FakeViewport {
    pub row_height: f64,
    pub offset: f64,
}

impl FakeViewport {
    pub fn new(row_height: f64, offset: f64) -> Self {
        Self { row_height, offset }
    }
}

impl Viewport for FakeViewport {
    fn content_height(&self, messages: &[Message]) -> f64 {
        messages.len() as f64 * self.row_height
    }

    fn scroll_offset(&self) -> f64 {
        self.offset
    }

    fn set_scroll_offset(&mut self, offset: f64) {
        self.offset = offset;
    }
}

/// History provider serving scripted pages and counting calls
#[derive(Default)]
pub struct ScriptedHistory {
    pub pages: Mutex<VecDeque<Result<Vec<Message>>>>,
    pub more: Mutex<bool>,
    pub fetches: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedHistory {
    pub fn with_pages(pages: Vec<Vec<Message>>, more: bool) -> Self {
        Self {
            pages: Mutex::new(pages.into_iter().map(Ok).collect()),
            more: Mutex::new(more),
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub fn push_failure(&self, reason: &str) {
        self.pages
            .lock()
            .unwrap()
            .push_back(Err(Error::Storage(reason.to_string())));
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

#[async_trait]
impl HistoryProvider for ScriptedHistory {
    async fn fetch_older_page(&self, peer: &str, before_id: Option<&str>) -> Result<Vec<Message>> {
        self.fetches
            .lock()
            .unwrap()
            .push((peer.to_string(), before_id.map(str::to_string)));
        self.pages.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn has_more(&self, _peer: &str) -> Result<bool> {
        Ok(*self.more.lock().unwrap())
    }
}
