//! Messaging provider abstraction.
//!
//! [`Api`] is transport-agnostic; the `sdkwa-client` crate implements it over
//! HTTP. Tests substitute an in-memory fake.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{Contact, Notification};

/// Operations consumed from the messaging provider. All calls are async and
/// return the provider's raw JSON result, or fail with `BotError::Api`.
#[async_trait]
pub trait Api: Send + Sync {
    /// Sends a text message to the given chat.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<Value>;

    /// Sends a file (photo, document, audio) by URL, with an optional caption.
    async fn send_file_by_url(
        &self,
        chat_id: &str,
        url: &str,
        file_name: &str,
        caption: Option<&str>,
    ) -> Result<Value>;

    /// Sends a geographic location.
    async fn send_location(
        &self,
        chat_id: &str,
        latitude: f64,
        longitude: f64,
        name: &str,
        address: &str,
    ) -> Result<Value>;

    /// Sends a contact card.
    async fn send_contact(&self, chat_id: &str, contact: &Contact) -> Result<Value>;

    /// Deletes a previously sent message.
    async fn delete_message(&self, chat_id: &str, message_id: &str) -> Result<Value>;

    /// Fetches the next pending update, if any. Does not acknowledge it.
    async fn receive_notification(&self) -> Result<Option<Notification>>;

    /// Acknowledges (removes) a fetched update from the provider queue.
    async fn delete_notification(&self, receipt_id: i64) -> Result<()>;
}
