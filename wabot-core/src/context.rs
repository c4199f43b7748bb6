//! Per-update [`Context`]: parsed update fields, session map, reply helpers.
//!
//! A Context is created fresh for every inbound update and owned by the
//! single dispatch call that processes it. The session layer fills
//! `session` before user handlers run; the stage middleware attaches the
//! scene manager; the wizard dispatcher attaches the wizard cursor.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::api::Api;
use crate::error::{BotError, Result};
use crate::types::{CallbackQuery, Contact, Message, TextMatch, UpdateKind};
use crate::wizard::WizardControl;

/// Reserved session key holding the active-scene record
/// (`{"id", "state", "entered_at"}`).
pub const SCENE_SESSION_KEY: &str = "__scene";

/// Scene routing operations exposed to handlers through the Context.
///
/// Implemented by the `scenes` crate's Stage; defined here so handlers can
/// switch scenes without the core depending on the scene engine.
#[async_trait]
pub trait SceneManager: Send + Sync {
    /// Enters the named scene, leaving the current one first. Returns
    /// `Ok(false)` when no scene with that id is registered.
    async fn enter(&self, scene_id: &str, ctx: &mut Context) -> Result<bool>;

    /// Leaves the active scene. Returns `Ok(false)` when none is active.
    async fn leave(&self, ctx: &mut Context) -> Result<bool>;

    /// Leaves and immediately re-enters the active scene.
    async fn reenter(&self, ctx: &mut Context) -> Result<bool>;
}

/// Mutable, single-update-lifetime view of an inbound update.
pub struct Context {
    /// Raw provider payload.
    pub update: Value,
    kind: UpdateKind,
    chat_id: String,
    /// Structured message view, present for message updates.
    pub message: Option<Message>,
    /// Callback payload, present for callback-query updates.
    pub callback_query: Option<CallbackQuery>,
    /// Delivery status, present for status updates.
    pub status: Option<String>,
    /// Conversation-scoped key-value state, attached by the session layer.
    pub session: Map<String, Value>,
    /// Match details set by a `hears` gate before its handlers run.
    pub text_match: Option<TextMatch>,
    /// Wizard cursor, attached while a wizard step handler runs.
    pub wizard: Option<WizardControl>,
    scene_manager: Option<Arc<dyn SceneManager>>,
    api: Arc<dyn Api>,
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

impl Context {
    /// Parses a raw update into a Context. Classification happens once,
    /// here; unrecognized payloads become `UpdateKind::Unknown` with an
    /// empty conversation id.
    pub fn from_update(update: Value, api: Arc<dyn Api>) -> Self {
        let mut kind = UpdateKind::Unknown;
        let mut chat_id = String::new();
        let mut message = None;
        let mut callback_query = None;
        let mut status = None;

        if let Some(message_data) = update.get("messageData") {
            let sender_data = update.get("senderData").cloned().unwrap_or(Value::Null);
            chat_id = str_field(&sender_data, "chatId").unwrap_or_default();
            let file_data = message_data.get("fileMessageData");
            message = Some(Message {
                message_id: str_field(message_data, "idMessage").unwrap_or_default(),
                chat_id: chat_id.clone(),
                text: message_data
                    .get("textMessageData")
                    .and_then(|t| str_field(t, "textMessage")),
                timestamp: update.get("timestamp").and_then(Value::as_i64),
                sender_name: str_field(&sender_data, "senderName"),
                sender_phone: str_field(&sender_data, "sender"),
                message_type: str_field(message_data, "typeMessage"),
                file_url: file_data.and_then(|f| str_field(f, "downloadUrl")),
                file_name: file_data.and_then(|f| str_field(f, "fileName")),
                caption: file_data.and_then(|f| str_field(f, "caption")),
                quoted_message_id: message_data
                    .get("quotedMessage")
                    .and_then(|q| str_field(q, "idMessage")),
                raw: message_data.clone(),
            });
            kind = UpdateKind::Message;
        } else if let Some(callback_data) = update.get("callbackQuery") {
            chat_id = str_field(callback_data, "chatId").unwrap_or_default();
            callback_query = Some(CallbackQuery {
                id: str_field(callback_data, "id").unwrap_or_default(),
                data: str_field(callback_data, "data").unwrap_or_default(),
            });
            kind = UpdateKind::CallbackQuery;
        } else if let Some(status_value) = update.get("status") {
            chat_id = str_field(&update, "chatId").unwrap_or_default();
            status = status_value.as_str().map(str::to_string);
            kind = UpdateKind::Status;
        }

        Self {
            update,
            kind,
            chat_id,
            message,
            callback_query,
            status,
            session: Map::new(),
            text_match: None,
            wizard: None,
            scene_manager: None,
            api,
        }
    }

    pub fn kind(&self) -> UpdateKind {
        self.kind
    }

    /// Stable identifier grouping updates into one conversation. Empty for
    /// unknown updates.
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn api(&self) -> &Arc<dyn Api> {
        &self.api
    }

    /// Message text, when this update carries a text message.
    pub fn text(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.text.as_deref())
    }

    fn require_chat_id(&self) -> Result<&str> {
        if self.chat_id.is_empty() {
            return Err(BotError::Handler("no chat id available for reply".into()));
        }
        Ok(&self.chat_id)
    }

    /// Replies with text to the conversation this update belongs to.
    pub async fn reply(&self, text: &str) -> Result<Value> {
        let chat_id = self.require_chat_id()?;
        self.api.send_message(chat_id, text).await
    }

    pub async fn reply_with_photo(&self, photo_url: &str, caption: Option<&str>) -> Result<Value> {
        let chat_id = self.require_chat_id()?;
        self.api
            .send_file_by_url(chat_id, photo_url, "photo.jpg", caption)
            .await
    }

    pub async fn reply_with_document(
        &self,
        document_url: &str,
        file_name: &str,
        caption: Option<&str>,
    ) -> Result<Value> {
        let chat_id = self.require_chat_id()?;
        self.api
            .send_file_by_url(chat_id, document_url, file_name, caption)
            .await
    }

    pub async fn reply_with_audio(&self, audio_url: &str, caption: Option<&str>) -> Result<Value> {
        let chat_id = self.require_chat_id()?;
        self.api
            .send_file_by_url(chat_id, audio_url, "audio.mp3", caption)
            .await
    }

    pub async fn reply_with_location(
        &self,
        latitude: f64,
        longitude: f64,
        name: Option<&str>,
        address: Option<&str>,
    ) -> Result<Value> {
        let chat_id = self.require_chat_id()?;
        self.api
            .send_location(
                chat_id,
                latitude,
                longitude,
                name.unwrap_or("Location"),
                address.unwrap_or(""),
            )
            .await
    }

    pub async fn reply_with_contact(&self, contact: &Contact) -> Result<Value> {
        let chat_id = self.require_chat_id()?;
        self.api.send_contact(chat_id, contact).await
    }

    /// Deletes the given message, or the current inbound message when
    /// `message_id` is `None`.
    pub async fn delete_message(&self, message_id: Option<&str>) -> Result<Value> {
        let chat_id = self.require_chat_id()?;
        let own_id = self.message.as_ref().map(|m| m.message_id.as_str());
        let target = message_id
            .or(own_id)
            .ok_or_else(|| BotError::Handler("no message id available".into()))?;
        self.api.delete_message(chat_id, target).await
    }

    /// Command name for `/name args` texts, lowercased; `None` otherwise.
    pub fn command(&self) -> Option<String> {
        let text = self.text()?;
        let rest = text.strip_prefix('/')?;
        rest.split_whitespace().next().map(str::to_lowercase)
    }

    /// Whitespace-split arguments following the command token.
    pub fn command_args(&self) -> Vec<String> {
        match self.text() {
            Some(text) if text.starts_with('/') => text
                .split_whitespace()
                .skip(1)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Attaches the scene router. Called by the stage middleware on every
    /// update before anything else runs.
    pub fn set_scene_manager(&mut self, manager: Arc<dyn SceneManager>) {
        self.scene_manager = Some(manager);
    }

    pub fn scene_manager(&self) -> Option<Arc<dyn SceneManager>> {
        self.scene_manager.clone()
    }

    /// Id recorded in the reserved scene key, regardless of registration or
    /// TTL expiry. Routing decisions go through the Stage instead.
    pub fn active_scene_id(&self) -> Option<&str> {
        self.session
            .get(SCENE_SESSION_KEY)
            .and_then(|record| record.get("id"))
            .and_then(Value::as_str)
    }

    /// Enters the named scene via the attached scene manager. Returns
    /// `Ok(false)` when no manager is attached or the id is unregistered.
    pub async fn enter_scene(&mut self, scene_id: &str) -> Result<bool> {
        match self.scene_manager.clone() {
            Some(manager) => manager.enter(scene_id, self).await,
            None => Ok(false),
        }
    }

    /// Leaves the active scene, if any.
    pub async fn leave_scene(&mut self) -> Result<bool> {
        match self.scene_manager.clone() {
            Some(manager) => manager.leave(self).await,
            None => Ok(false),
        }
    }

    /// Leaves and re-enters the active scene, if any.
    pub async fn reenter_scene(&mut self) -> Result<bool> {
        match self.scene_manager.clone() {
            Some(manager) => manager.reenter(self).await,
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Notification;
    use serde_json::json;

    struct NoopApi;

    #[async_trait]
    impl Api for NoopApi {
        async fn send_message(&self, _chat_id: &str, _text: &str) -> Result<Value> {
            Ok(json!({"idMessage": "1"}))
        }
        async fn send_file_by_url(
            &self,
            _chat_id: &str,
            _url: &str,
            _file_name: &str,
            _caption: Option<&str>,
        ) -> Result<Value> {
            Ok(json!({}))
        }
        async fn send_location(
            &self,
            _chat_id: &str,
            _latitude: f64,
            _longitude: f64,
            _name: &str,
            _address: &str,
        ) -> Result<Value> {
            Ok(json!({}))
        }
        async fn send_contact(&self, _chat_id: &str, _contact: &Contact) -> Result<Value> {
            Ok(json!({}))
        }
        async fn delete_message(&self, _chat_id: &str, _message_id: &str) -> Result<Value> {
            Ok(json!({}))
        }
        async fn receive_notification(&self) -> Result<Option<Notification>> {
            Ok(None)
        }
        async fn delete_notification(&self, _receipt_id: i64) -> Result<()> {
            Ok(())
        }
    }

    fn message_update(text: &str) -> Value {
        json!({
            "timestamp": 1700000000,
            "messageData": {
                "idMessage": "msg-1",
                "typeMessage": "textMessage",
                "textMessageData": {"textMessage": text}
            },
            "senderData": {
                "chatId": "123@c.us",
                "sender": "123@c.us",
                "senderName": "Alice"
            }
        })
    }

    fn make_ctx(update: Value) -> Context {
        Context::from_update(update, Arc::new(NoopApi))
    }

    #[test]
    fn test_parses_message_update() {
        let ctx = make_ctx(message_update("hello"));
        assert_eq!(ctx.kind(), UpdateKind::Message);
        assert_eq!(ctx.chat_id(), "123@c.us");
        assert_eq!(ctx.text(), Some("hello"));
        let message = ctx.message.as_ref().unwrap();
        assert_eq!(message.sender_name.as_deref(), Some("Alice"));
        assert_eq!(message.timestamp, Some(1700000000));
    }

    #[test]
    fn test_parses_callback_query() {
        let ctx = make_ctx(json!({
            "callbackQuery": {"id": "cb-1", "data": "confirm", "chatId": "123@c.us"}
        }));
        assert_eq!(ctx.kind(), UpdateKind::CallbackQuery);
        assert_eq!(ctx.callback_query.as_ref().unwrap().data, "confirm");
    }

    #[test]
    fn test_parses_status_update() {
        let ctx = make_ctx(json!({"status": "delivered", "chatId": "123@c.us"}));
        assert_eq!(ctx.kind(), UpdateKind::Status);
        assert_eq!(ctx.status.as_deref(), Some("delivered"));
    }

    #[test]
    fn test_unknown_update_has_empty_chat_id() {
        let ctx = make_ctx(json!({"something": "else"}));
        assert_eq!(ctx.kind(), UpdateKind::Unknown);
        assert_eq!(ctx.chat_id(), "");
    }

    #[test]
    fn test_command_parsing() {
        let ctx = make_ctx(message_update("/Start now please"));
        assert_eq!(ctx.command().as_deref(), Some("start"));
        assert_eq!(ctx.command_args(), vec!["now", "please"]);

        let plain = make_ctx(message_update("no command"));
        assert_eq!(plain.command(), None);
        assert!(plain.command_args().is_empty());
    }

    #[tokio::test]
    async fn test_reply_without_chat_id_fails() {
        let ctx = make_ctx(json!({}));
        assert!(ctx.reply("hi").await.is_err());
    }
}
