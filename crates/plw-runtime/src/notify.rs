use plw_schemas::{DiffEvent, SubscriberKey};
use tracing::info;

use crate::NotifyError;

/// Delivers one diff event to a subscriber.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subscriber: &SubscriberKey, event: &DiffEvent)
        -> Result<(), NotifyError>;
}

/// Writes events to the log instead of a chat. Used when no bot token is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        subscriber: &SubscriberKey,
        event: &DiffEvent,
    ) -> Result<(), NotifyError> {
        let name = event.meta.as_ref().map(|m| m.name.as_str()).unwrap_or("<unknown>");
        info!(
            subscriber = %subscriber,
            kind = event.kind.as_str(),
            track_id = %event.track_id,
            track = name,
            "playlist change"
        );
        Ok(())
    }
}
