//! Test doubles shared by the workspace test suites.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::Api;
use crate::error::{BotError, Result};
use crate::types::{Contact, Notification};

/// In-memory [`Api`] that records every send and serves queued notifications.
#[derive(Default)]
pub struct RecordingApi {
    sent: Mutex<Vec<(String, String)>>,
    notifications: Mutex<VecDeque<Notification>>,
    acknowledged: Mutex<Vec<i64>>,
    fail_sends: AtomicBool,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(chat_id, text)` pairs in send order.
    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts sent to the given chat, in order.
    pub fn texts_for(&self, chat_id: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(chat, _)| chat == chat_id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn queue_notification(&self, receipt_id: i64, body: Value) {
        self.notifications
            .lock()
            .unwrap()
            .push_back(Notification { receipt_id, body });
    }

    pub fn acknowledged(&self) -> Vec<i64> {
        self.acknowledged.lock().unwrap().clone()
    }

    /// When set, every send operation fails with a provider error.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    fn check_failure(&self) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BotError::Api("injected send failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Api for RecordingApi {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<Value> {
        self.check_failure()?;
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(json!({"idMessage": "sent"}))
    }

    async fn send_file_by_url(
        &self,
        chat_id: &str,
        url: &str,
        _file_name: &str,
        _caption: Option<&str>,
    ) -> Result<Value> {
        self.check_failure()?;
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), format!("file:{url}")));
        Ok(json!({"idMessage": "sent"}))
    }

    async fn send_location(
        &self,
        chat_id: &str,
        latitude: f64,
        longitude: f64,
        _name: &str,
        _address: &str,
    ) -> Result<Value> {
        self.check_failure()?;
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), format!("location:{latitude},{longitude}")));
        Ok(json!({"idMessage": "sent"}))
    }

    async fn send_contact(&self, chat_id: &str, contact: &Contact) -> Result<Value> {
        self.check_failure()?;
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), format!("contact:{}", contact.phone)));
        Ok(json!({"idMessage": "sent"}))
    }

    async fn delete_message(&self, _chat_id: &str, _message_id: &str) -> Result<Value> {
        Ok(json!({}))
    }

    async fn receive_notification(&self) -> Result<Option<Notification>> {
        Ok(self.notifications.lock().unwrap().pop_front())
    }

    async fn delete_notification(&self, receipt_id: i64) -> Result<()> {
        self.acknowledged.lock().unwrap().push(receipt_id);
        Ok(())
    }
}

/// Builds a text-message update payload in the provider's wire shape.
pub fn text_update(chat_id: &str, text: &str) -> Value {
    json!({
        "timestamp": 1700000000,
        "messageData": {
            "idMessage": "msg-test",
            "typeMessage": "textMessage",
            "textMessageData": {"textMessage": text}
        },
        "senderData": {
            "chatId": chat_id,
            "sender": chat_id,
            "senderName": "Tester"
        }
    })
}

/// Builds a callback-query update payload.
pub fn callback_update(chat_id: &str, data: &str) -> Value {
    json!({
        "callbackQuery": {"id": "cb-test", "data": data, "chatId": chat_id}
    })
}
