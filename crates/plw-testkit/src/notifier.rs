use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use plw_runtime::{NotifyError, Notifier};
use plw_schemas::{DiffEvent, SubscriberKey};

/// Records every delivery attempt; can be told to fail, or to never answer
/// for chosen subscribers.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(SubscriberKey, DiffEvent)>>,
    fail: AtomicBool,
    stalled: Mutex<HashSet<SubscriberKey>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Deliveries to `subscriber` hang forever from now on.
    pub fn stall(&self, subscriber: &SubscriberKey) {
        self.stalled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subscriber.clone());
    }

    /// Successfully delivered events, in delivery order.
    pub fn delivered(&self) -> Vec<(SubscriberKey, DiffEvent)> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events(&self) -> Vec<DiffEvent> {
        self.delivered().into_iter().map(|(_, e)| e).collect()
    }

    pub fn clear(&self) {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        subscriber: &SubscriberKey,
        event: &DiffEvent,
    ) -> Result<(), NotifyError> {
        let stalled = self
            .stalled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(subscriber);
        if stalled {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("injected notify failure".to_string()));
        }
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((subscriber.clone(), event.clone()));
        Ok(())
    }
}
