//! Minimal Telegram Bot API client: the handful of methods the tracker uses.
//!
//! Every call is `POST {base}/bot{token}/{method}` with a JSON body. The bot
//! token is part of the URL, so transport errors are stripped of their URL
//! before they are surfaced or logged.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::format::Reply;

pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// Request timeout for everything except getUpdates.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(20);

/// Extra client-side slack on top of the server-side long-poll timeout.
const POLL_SLACK: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelegramError {
    /// Request never produced an HTTP response.
    Transport(String),
    /// Telegram answered `ok: false` (or a non-2xx status).
    Api { status: u16, description: String },
    /// Response body did not match the Bot API envelope.
    Decode(String),
}

impl fmt::Display for TelegramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelegramError::Transport(msg) => write!(f, "telegram transport error: {msg}"),
            TelegramError::Api {
                status,
                description,
            } => write!(f, "telegram api error status={status}: {description}"),
            TelegramError::Decode(msg) => write!(f, "telegram decode error: {msg}"),
        }
    }
}

impl std::error::Error for TelegramError {}

impl From<TelegramError> for plw_runtime::NotifyError {
    fn from(e: TelegramError) -> Self {
        match e {
            TelegramError::Api {
                status,
                description,
            } => plw_runtime::NotifyError::Rejected {
                status,
                message: description,
            },
            other => plw_runtime::NotifyError::Transport(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<u16>,
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Bot API client. The token is passed in by the caller; do not log it.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
    send_timeout: Duration,
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("base_url", &self.base_url)
            .field("bot_token", &"<REDACTED>")
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

impl TelegramClient {
    pub fn new(bot_token: String) -> Self {
        Self::new_with_base_url(bot_token, DEFAULT_API_BASE_URL.to_string())
    }

    pub fn new_with_base_url(bot_token: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            bot_token,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base_url.trim_end_matches('/'),
            self.bot_token,
            method
        )
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<T, TelegramError> {
        let resp = self
            .http
            .post(self.method_url(method))
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TelegramError::Transport(format!("{method}: {}", e.without_url())))?;
        let status = resp.status().as_u16();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| TelegramError::Transport(format!("{method}: {}", e.without_url())))?;

        let envelope: Envelope<T> = serde_json::from_slice(&bytes)
            .map_err(|e| TelegramError::Decode(format!("{method}: {e}")))?;

        if !envelope.ok {
            return Err(TelegramError::Api {
                status: envelope.error_code.unwrap_or(status),
                description: envelope
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        envelope
            .result
            .ok_or_else(|| TelegramError::Decode(format!("{method}: ok without result")))
    }

    fn with_parse_mode(mut body: serde_json::Value, reply: &Reply) -> serde_json::Value {
        if reply.markdown {
            body["parse_mode"] = json!("Markdown");
        }
        body
    }

    /// Send a text message; returns the new message id.
    pub async fn send_message(&self, chat_id: i64, reply: &Reply) -> Result<i64, TelegramError> {
        let body = Self::with_parse_mode(
            json!({
                "chat_id": chat_id,
                "text": reply.text,
                "disable_web_page_preview": false,
            }),
            reply,
        );
        let msg: Message = self.call("sendMessage", body, self.send_timeout).await?;
        Ok(msg.message_id)
    }

    /// Send a photo by URL with `reply` as its caption.
    pub async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &Reply,
    ) -> Result<i64, TelegramError> {
        let body = Self::with_parse_mode(
            json!({
                "chat_id": chat_id,
                "photo": photo_url,
                "caption": caption.text,
            }),
            caption,
        );
        let msg: Message = self.call("sendPhoto", body, self.send_timeout).await?;
        Ok(msg.message_id)
    }

    /// Replace the text of a message sent earlier by the bot.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        reply: &Reply,
    ) -> Result<(), TelegramError> {
        let body = Self::with_parse_mode(
            json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "text": reply.text,
                "disable_web_page_preview": false,
            }),
            reply,
        );
        // editMessageText returns the edited Message (or `true` for inline messages).
        let _: serde_json::Value = self.call("editMessageText", body, self.send_timeout).await?;
        Ok(())
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        poll_timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        let mut body = json!({
            "timeout": poll_timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        if let Some(o) = offset {
            body["offset"] = json!(o);
        }
        self.call("getUpdates", body, poll_timeout + POLL_SLACK)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let c = TelegramClient::new("123:secret".to_string());
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("REDACTED"));
    }

    #[test]
    fn method_url_embeds_token_once() {
        let c = TelegramClient::new_with_base_url("t0k".to_string(), "http://h/".to_string());
        assert_eq!(c.method_url("getUpdates"), "http://h/bott0k/getUpdates");
    }

    #[test]
    fn api_errors_become_rejections() {
        let e: plw_runtime::NotifyError = TelegramError::Api {
            status: 403,
            description: "bot was kicked".to_string(),
        }
        .into();
        assert_eq!(
            e,
            plw_runtime::NotifyError::Rejected {
                status: 403,
                message: "bot was kicked".to_string()
            }
        );
    }

    #[test]
    fn update_without_message_decodes() {
        let u: Update = serde_json::from_str(r#"{"update_id": 7, "edited_message": {}}"#).unwrap();
        assert_eq!(u.update_id, 7);
        assert!(u.message.is_none());
    }
}
