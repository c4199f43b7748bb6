//! # SDKWA WhatsApp API client
//!
//! HTTP implementation of the core [`Api`] trait against the SDKWA REST API.
//! Every call targets `{host}/waInstance{idInstance}/{method}/{apiToken}`
//! with camelCase JSON bodies. Provides token masking for safe logging.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use wabot_core::{Api, BotError, Contact, Notification, Result};

/// Default API host for hosted SDKWA instances.
pub const DEFAULT_API_HOST: &str = "https://api.sdkwa.pro";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Masks an API token for safe logging: first 7 chars + "***" + last 4 chars.
/// Tokens of length <= 11 are fully masked to avoid leaking any part.
/// Counts characters, not bytes, so multibyte tokens never split mid-char.
pub fn mask_token(token: &str) -> String {
    let len = token.chars().count();
    if len <= 11 {
        "***".to_string()
    } else {
        let head: String = token.chars().take(7).collect();
        let tail: String = token.chars().skip(len - 4).collect();
        format!("{head}***{tail}")
    }
}

/// WhatsApp API client bound to one SDKWA instance.
pub struct SdkwaClient {
    http: reqwest::Client,
    api_host: String,
    id_instance: String,
    api_token: String,
}

impl SdkwaClient {
    /// Builds a client against the default API host.
    pub fn new(id_instance: impl Into<String>, api_token: impl Into<String>) -> Result<Self> {
        Self::with_host(DEFAULT_API_HOST, id_instance, api_token)
    }

    /// Builds a client against a custom host (self-hosted instances, proxies).
    pub fn with_host(
        api_host: impl Into<String>,
        id_instance: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BotError::Api(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            api_host: api_host.into().trim_end_matches('/').to_string(),
            id_instance: id_instance.into(),
            api_token: api_token.into(),
        })
    }

    pub fn id_instance(&self) -> &str {
        &self.id_instance
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/waInstance{}/{}/{}",
            self.api_host, self.id_instance, method, self.api_token
        )
    }

    async fn post(&self, method: &str, body: Value) -> Result<Value> {
        debug!(
            method = %method,
            instance = %self.id_instance,
            token = %mask_token(&self.api_token),
            "step: api request"
        );
        let response = self
            .http
            .post(self.url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| BotError::Api(format!("{method} request failed: {e}")))?;
        Self::parse_response(method, response).await
    }

    async fn parse_response(method: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BotError::Api(format!("{method} response read failed: {e}")))?;
        if !status.is_success() {
            warn!(method = %method, status = %status, "api request rejected");
            return Err(BotError::Api(format!(
                "{method} returned {status}: {text}"
            )));
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| BotError::Api(format!("{method} returned invalid JSON: {e}")))
    }
}

#[async_trait]
impl Api for SdkwaClient {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<Value> {
        self.post(
            "sendMessage",
            json!({"chatId": chat_id, "message": text}),
        )
        .await
    }

    async fn send_file_by_url(
        &self,
        chat_id: &str,
        url: &str,
        file_name: &str,
        caption: Option<&str>,
    ) -> Result<Value> {
        let mut body = json!({
            "chatId": chat_id,
            "urlFile": url,
            "fileName": file_name,
        });
        if let Some(caption) = caption {
            body["caption"] = json!(caption);
        }
        self.post("sendFileByUrl", body).await
    }

    async fn send_location(
        &self,
        chat_id: &str,
        latitude: f64,
        longitude: f64,
        name: &str,
        address: &str,
    ) -> Result<Value> {
        self.post(
            "sendLocation",
            json!({
                "chatId": chat_id,
                "latitude": latitude,
                "longitude": longitude,
                "nameLocation": name,
                "address": address,
            }),
        )
        .await
    }

    async fn send_contact(&self, chat_id: &str, contact: &Contact) -> Result<Value> {
        let mut contact_body = json!({
            "phoneContact": contact.phone,
            "firstName": contact.first_name,
        });
        if let Some(last_name) = &contact.last_name {
            contact_body["lastName"] = json!(last_name);
        }
        if let Some(company) = &contact.company {
            contact_body["company"] = json!(company);
        }
        self.post(
            "sendContact",
            json!({"chatId": chat_id, "contact": contact_body}),
        )
        .await
    }

    async fn delete_message(&self, chat_id: &str, message_id: &str) -> Result<Value> {
        self.post(
            "deleteMessage",
            json!({"chatId": chat_id, "idMessage": message_id}),
        )
        .await
    }

    /// Long-polls the instance for the oldest pending notification.
    /// `Ok(None)` means the queue is empty.
    async fn receive_notification(&self) -> Result<Option<Notification>> {
        let response = self
            .http
            .get(self.url("receiveNotification"))
            .send()
            .await
            .map_err(|e| BotError::Api(format!("receiveNotification request failed: {e}")))?;
        let value = Self::parse_response("receiveNotification", response).await?;
        if value.is_null() {
            return Ok(None);
        }
        let receipt_id = value
            .get("receiptId")
            .and_then(Value::as_i64)
            .ok_or_else(|| BotError::Api("notification missing receiptId".into()))?;
        let body = value.get("body").cloned().unwrap_or(Value::Null);
        Ok(Some(Notification { receipt_id, body }))
    }

    /// Acknowledges a consumed notification so it is not delivered again.
    async fn delete_notification(&self, receipt_id: i64) -> Result<()> {
        let url = format!("{}/{}", self.url("deleteNotification"), receipt_id);
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| BotError::Api(format!("deleteNotification request failed: {e}")))?;
        Self::parse_response("deleteNotification", response).await?;
        Ok(())
    }
}
