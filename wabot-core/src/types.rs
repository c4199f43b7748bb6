//! Core update types: classification tag, message view, callback query, text match.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of an incoming update, computed once at [`Context`](crate::Context)
/// construction. Anything the parser does not recognize is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Message,
    CallbackQuery,
    Status,
    Unknown,
}

/// Structured view of an inbound WhatsApp message.
///
/// `raw` keeps the provider's `messageData` payload for handlers that need
/// fields the view does not expose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub chat_id: String,
    pub text: Option<String>,
    pub timestamp: Option<i64>,
    pub sender_name: Option<String>,
    pub sender_phone: Option<String>,
    pub message_type: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub caption: Option<String>,
    pub quoted_message_id: Option<String>,
    pub raw: Value,
}

/// Inline-keyboard callback payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub data: String,
}

/// Result of a `hears` pattern match, exposed on the Context for handlers.
///
/// Owns its data instead of borrowing from the message text, so it can live
/// on the Context for the rest of the dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    /// Source pattern that matched.
    pub pattern: String,
    /// Full matched text.
    pub matched: String,
    /// Capture groups (group 0 excluded), `None` for groups that did not participate.
    pub captures: Vec<Option<String>>,
}

/// Contact card payload for `send_contact`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub phone: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub company: Option<String>,
}

impl Contact {
    pub fn new(phone: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            first_name: first_name.into(),
            last_name: None,
            company: None,
        }
    }
}

/// A fetched-and-not-yet-acknowledged update from the provider's notification queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub receipt_id: i64,
    pub body: Value,
}
