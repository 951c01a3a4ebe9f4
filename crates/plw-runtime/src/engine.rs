//! Subscription lifecycle and the per-subscription reconcile transaction.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use plw_catalog::{CatalogError, MembershipFetcher};
use plw_reconcile::{reconcile_membership, ReconcileAction};
use plw_schemas::{
    DiffEvent, DiffKind, MembershipSnapshot, PlaylistId, PlaylistInfo, SubscriberKey, Subscription,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{KeyedLocks, Notifier, NotifyError, StateStore, SubscriptionCache, TrackerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Upper bound on the catalog calls of one operation, taken together.
    pub fetch_timeout: Duration,
    /// Upper bound on delivering one event.
    pub notify_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(60),
            notify_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of [`TrackerEngine::set_tracking`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingStarted {
    pub playlist: PlaylistInfo,
    /// Number of tracks recorded as the baseline (no events were emitted).
    pub baseline_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrackingStatus {
    Tracking {
        playlist_id: PlaylistId,
        track_count: usize,
    },
    NotTracking,
}

/// Outcome of one scheduler cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Subscriptions reconciled successfully.
    pub checked: usize,
    /// Diff events produced across all subscriptions.
    pub events: usize,
    /// Subscriptions whose reconcile failed; retried next cycle.
    pub failed: usize,
}

pub struct TrackerEngine {
    catalog: Arc<dyn MembershipFetcher>,
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    cache: SubscriptionCache,
    locks: KeyedLocks,
    settings: EngineSettings,
}

impl TrackerEngine {
    pub fn new(
        catalog: Arc<dyn MembershipFetcher>,
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            catalog,
            store,
            notifier,
            cache: SubscriptionCache::new(),
            locks: KeyedLocks::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn cache(&self) -> &SubscriptionCache {
        &self.cache
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start (or replace) tracking for `subscriber`.
    ///
    /// The full current membership becomes the baseline; no events are
    /// emitted for tracks already present. A previously tracked playlist and
    /// its snapshot are discarded.
    pub async fn set_tracking(
        &self,
        subscriber: &SubscriberKey,
        reference: &str,
    ) -> Result<TrackingStarted, TrackerError> {
        let playlist = PlaylistId::parse(reference)?;
        let span = info_span!(
            "set_tracking",
            platform = %subscriber.platform,
            chat_id = subscriber.chat_id,
            playlist_id = %playlist
        );

        async {
            let _guard = self.locks.acquire(subscriber).await;

            let deadline = self.fetch_deadline();
            let (info, membership) = self
                .bounded(deadline, "playlist lookup", async {
                    let info = self.catalog.fetch_playlist_info(&playlist).await?;
                    let membership = self.catalog.fetch_membership(&playlist).await?;
                    Ok::<_, CatalogError>((info, membership))
                })
                .await?;

            let previous = self.store.load_subscription(subscriber).await?;
            let baseline = MembershipSnapshot::from_membership(&membership);
            let baseline_size = baseline.len();

            // Baseline before subscription: the subscription never points at a
            // playlist whose snapshot is missing.
            self.store
                .save_snapshot(subscriber, &playlist, &baseline)
                .await?;
            self.store
                .save_subscription(&Subscription::new(subscriber.clone(), playlist.clone()))
                .await?;
            self.cache
                .put(subscriber.clone(), playlist.clone(), baseline)
                .await;

            // Tracking has switched at this point; a leftover snapshot is only
            // garbage and goes away with the subscription on stop.
            if let Some(prev) = previous.filter(|p| p.playlist_id != playlist) {
                match self
                    .store
                    .delete_snapshot(subscriber, &prev.playlist_id)
                    .await
                {
                    Ok(_) => {
                        debug!(previous_playlist = %prev.playlist_id, "replaced previous subscription")
                    }
                    Err(e) => warn!(
                        previous_playlist = %prev.playlist_id,
                        error = %e,
                        "previous snapshot cleanup failed"
                    ),
                }
            }

            info!(baseline_size, playlist_name = %info.name, "tracking started");
            Ok::<_, TrackerError>(TrackingStarted {
                playlist: info,
                baseline_size,
            })
        }
        .instrument(span)
        .await
    }

    /// Stop tracking. Idempotent; returns whether anything was removed.
    pub async fn stop_tracking(&self, subscriber: &SubscriberKey) -> Result<bool, TrackerError> {
        let _guard = self.locks.acquire(subscriber).await;
        let removed = self.store.delete_subscription(subscriber).await?;
        self.cache.remove(subscriber).await;
        info!(subscriber = %subscriber, removed, "tracking stopped");
        Ok(removed)
    }

    pub async fn get_status(&self, subscriber: &SubscriberKey) -> Result<TrackingStatus, TrackerError> {
        if let Some(entry) = self.cache.get(subscriber).await {
            return Ok(TrackingStatus::Tracking {
                playlist_id: entry.playlist_id,
                track_count: entry.snapshot.len(),
            });
        }

        // Populate under the lock so a concurrent commit is never overwritten
        // with an older snapshot.
        let _guard = self.locks.acquire(subscriber).await;
        if let Some(entry) = self.cache.get(subscriber).await {
            return Ok(TrackingStatus::Tracking {
                playlist_id: entry.playlist_id,
                track_count: entry.snapshot.len(),
            });
        }

        let Some(sub) = self.store.load_subscription(subscriber).await? else {
            return Ok(TrackingStatus::NotTracking);
        };
        let track_count = match self.store.load_snapshot(subscriber, &sub.playlist_id).await? {
            Some(snapshot) => {
                let n = snapshot.len();
                self.cache
                    .put(subscriber.clone(), sub.playlist_id.clone(), snapshot)
                    .await;
                n
            }
            None => 0,
        };

        Ok(TrackingStatus::Tracking {
            playlist_id: sub.playlist_id,
            track_count,
        })
    }

    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>, TrackerError> {
        Ok(self.store.list_active_subscriptions().await?)
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    /// One fetch-diff-commit-notify pass for `subscriber` on `playlist`.
    ///
    /// Returns the delivered events (Added ascending by id, then Removed
    /// ascending by id). If the subscriber no longer tracks `playlist` the
    /// pass is skipped and nothing is written.
    pub async fn reconcile(
        &self,
        subscriber: &SubscriberKey,
        playlist: &PlaylistId,
    ) -> Result<Vec<DiffEvent>, TrackerError> {
        let span = info_span!(
            "reconcile",
            pass_id = %Uuid::new_v4(),
            platform = %subscriber.platform,
            chat_id = subscriber.chat_id,
            playlist_id = %playlist
        );

        async {
            let _guard = self.locks.acquire(subscriber).await;
            self.reconcile_locked(subscriber, playlist).await
        }
        .instrument(span)
        .await
    }

    async fn reconcile_locked(
        &self,
        subscriber: &SubscriberKey,
        playlist: &PlaylistId,
    ) -> Result<Vec<DiffEvent>, TrackerError> {
        // The cache is written under this same lock by every lifecycle
        // operation, so a matching entry is current. Anything else is
        // settled by the store.
        let cached = self
            .cache
            .get(subscriber)
            .await
            .filter(|entry| &entry.playlist_id == playlist);
        if cached.is_none() {
            match self.store.load_subscription(subscriber).await? {
                Some(sub) if &sub.playlist_id == playlist => {}
                _ => {
                    debug!("subscription no longer active; skipping");
                    return Ok(Vec::new());
                }
            }
        }

        let deadline = self.fetch_deadline();
        let current = self
            .bounded(
                deadline,
                "membership fetch",
                self.catalog.fetch_membership(playlist),
            )
            .await?;

        let previous = match cached.map(|entry| entry.snapshot) {
            Some(snapshot) => {
                debug!("snapshot cache hit");
                Some(snapshot)
            }
            None => {
                debug!("snapshot cache miss; loading from store");
                self.store.load_snapshot(subscriber, playlist).await?
            }
        };

        let mut report = reconcile_membership(previous.as_ref(), &current);
        self.backfill_removed_meta(deadline, &mut report.events).await;

        let action = report.action.clone();
        let added = report.added_count();
        let removed = report.removed_count();
        let track_count = report.next.len();

        // Commit before anything is delivered.
        self.store
            .save_snapshot(subscriber, playlist, &report.next)
            .await?;
        self.cache
            .put(subscriber.clone(), playlist.clone(), report.next)
            .await;

        match action {
            ReconcileAction::Baseline => info!(track_count, "baseline recorded"),
            ReconcileAction::Unchanged => debug!(track_count, "no changes"),
            ReconcileAction::Changed => info!(added, removed, track_count, "playlist changed"),
        }

        for event in &report.events {
            self.deliver(subscriber, event).await;
        }

        Ok(report.events)
    }

    /// On-demand reconcile of whatever `subscriber` tracks. `None` when not
    /// tracking anything.
    pub async fn check_now(
        &self,
        subscriber: &SubscriberKey,
    ) -> Result<Option<Vec<DiffEvent>>, TrackerError> {
        let Some(sub) = self.store.load_subscription(subscriber).await? else {
            return Ok(None);
        };
        self.reconcile(subscriber, &sub.playlist_id).await.map(Some)
    }

    /// One scheduler cycle over every active subscription, sequentially.
    /// Per-subscription failures are logged and counted, never propagated.
    pub async fn reconcile_all(&self) -> Result<CycleReport, TrackerError> {
        let subs = self.store.list_active_subscriptions().await?;
        let mut report = CycleReport::default();

        for sub in subs {
            match self.reconcile(&sub.subscriber, &sub.playlist_id).await {
                Ok(events) => {
                    report.checked += 1;
                    report.events += events.len();
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        subscriber = %sub.subscriber,
                        playlist_id = %sub.playlist_id,
                        error = %e,
                        "reconcile failed; retrying next cycle"
                    );
                }
            }
        }

        info!(
            checked = report.checked,
            events = report.events,
            failed = report.failed,
            "reconcile cycle complete"
        );
        Ok(report)
    }

    /// Rebuild the cache from the store. Returns the number of entries loaded.
    pub async fn warm_cache(&self) -> Result<usize, TrackerError> {
        let subs = self.store.list_active_subscriptions().await?;
        let mut warmed = 0usize;

        for sub in subs {
            let _guard = self.locks.acquire(&sub.subscriber).await;
            if let Some(snapshot) = self
                .store
                .load_snapshot(&sub.subscriber, &sub.playlist_id)
                .await?
            {
                self.cache
                    .put(sub.subscriber.clone(), sub.playlist_id.clone(), snapshot)
                    .await;
                warmed += 1;
            }
        }

        info!(warmed, "subscription cache warmed");
        Ok(warmed)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn fetch_deadline(&self) -> Instant {
        Instant::now() + self.settings.fetch_timeout
    }

    /// Run a catalog call against the operation's shared deadline.
    async fn bounded<T, F>(&self, deadline: Instant, what: &str, fut: F) -> Result<T, TrackerError>
    where
        F: Future<Output = Result<T, CatalogError>>,
    {
        match tokio::time::timeout_at(deadline, fut).await {
            Ok(res) => res.map_err(TrackerError::from),
            Err(_) => Err(TrackerError::Transient(format!(
                "{what} timed out after {:?}",
                self.settings.fetch_timeout
            ))),
        }
    }

    /// Removed tracks without stored metadata get one catalog lookup within
    /// what is left of the pass deadline. Once it is spent, or a lookup fails,
    /// the event keeps `meta: None` and goes out degraded.
    async fn backfill_removed_meta(&self, deadline: Instant, events: &mut [DiffEvent]) {
        for event in events
            .iter_mut()
            .filter(|e| e.kind == DiffKind::Removed && e.meta.is_none())
        {
            if Instant::now() >= deadline {
                debug!(track_id = %event.track_id, "pass deadline reached; skipping track lookup");
                continue;
            }
            let track_id = event.track_id.clone();
            let lookup = self
                .bounded(deadline, "track lookup", self.catalog.fetch_track(&track_id))
                .await;
            match lookup {
                Ok(meta) => event.meta = meta,
                Err(e) => {
                    debug!(track_id = %track_id, error = %e, "removed track metadata unavailable")
                }
            }
        }
    }

    /// At most `notify_timeout` per event; a timeout counts as a transport
    /// failure.
    async fn deliver(&self, subscriber: &SubscriberKey, event: &DiffEvent) {
        let timeout = self.settings.notify_timeout;
        let attempt = self.notifier.notify(subscriber, event);
        let outcome = match tokio::time::timeout(timeout, attempt).await {
            Ok(res) => res,
            Err(_) => Err(NotifyError::Transport(format!(
                "delivery timed out after {timeout:?}"
            ))),
        };
        if let Err(e) = outcome {
            warn!(
                track_id = %event.track_id,
                kind = event.kind.as_str(),
                error = %e,
                "notification failed"
            );
        }
    }
}
