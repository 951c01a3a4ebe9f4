//! Notifier implementations wired by the daemon.

use std::sync::Arc;

use plw_runtime::{NotifyError, Notifier};
use plw_schemas::{DiffEvent, SubscriberKey};
use tokio::sync::broadcast;
use tracing::debug;

use crate::format::{render_event, EventMessage};
use crate::state::BusMsg;
use crate::telegram::TelegramClient;

/// Delivers diff events to Telegram chats.
///
/// Events with artwork go out as a photo with caption. If Telegram refuses
/// the photo (dead image URL, oversized file) the same text is sent as a
/// plain message instead.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Arc<TelegramClient>,
}

impl TelegramNotifier {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(
        &self,
        subscriber: &SubscriberKey,
        event: &DiffEvent,
    ) -> Result<(), NotifyError> {
        let chat_id = subscriber.chat_id;
        match render_event(event) {
            EventMessage::Photo { photo_url, caption } => {
                match self.client.send_photo(chat_id, &photo_url, &caption).await {
                    Ok(_) => Ok(()),
                    Err(e) => {
                        debug!(track_id = %event.track_id, error = %e, "sendPhoto failed; sending text");
                        self.client.send_message(chat_id, &caption).await?;
                        Ok(())
                    }
                }
            }
            EventMessage::Text(reply) => {
                self.client.send_message(chat_id, &reply).await?;
                Ok(())
            }
        }
    }
}

/// Publishes every event on the SSE bus, then hands it to `inner`.
pub struct BusNotifier {
    inner: Arc<dyn Notifier>,
    bus: broadcast::Sender<BusMsg>,
}

impl BusNotifier {
    pub fn new(inner: Arc<dyn Notifier>, bus: broadcast::Sender<BusMsg>) -> Self {
        Self { inner, bus }
    }
}

#[async_trait::async_trait]
impl Notifier for BusNotifier {
    async fn notify(
        &self,
        subscriber: &SubscriberKey,
        event: &DiffEvent,
    ) -> Result<(), NotifyError> {
        // No receivers is not an error.
        let _ = self.bus.send(BusMsg::Diff {
            platform: subscriber.platform.clone(),
            chat_id: subscriber.chat_id,
            event: event.clone(),
        });
        self.inner.notify(subscriber, event).await
    }
}
