//! Shared runtime state for plw-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The engine owns every
//! subscription and snapshot; this module only carries the bus, build info
//! and the status snapshot that `/v1/status` serves.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use plw_runtime::{CycleReport, TrackerEngine};
use plw_schemas::DiffEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    Status(StatusSnapshot),
    LogLine {
        level: String,
        msg: String,
    },
    /// One scheduler cycle finished.
    Cycle(CycleSummary),
    /// A committed change was handed to the notifier.
    Diff {
        platform: String,
        chat_id: i64,
        event: DiffEvent,
    },
}

/// Bus capacity. Slow SSE clients lag and skip; they never block senders.
pub const BUS_CAPACITY: usize = 1024;

pub fn new_bus() -> broadcast::Sender<BusMsg> {
    let (bus, _rx) = broadcast::channel::<BusMsg>(BUS_CAPACITY);
    bus
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health / status responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// StatusSnapshot
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub finished_at_utc: DateTime<Utc>,
    pub report: CycleReport,
}

/// Point-in-time snapshot of daemon state, returned by GET /v1/status and
/// carried inside SSE `status` events.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub daemon_uptime_secs: u64,
    /// Subscriptions currently held in the engine cache.
    pub active_subscriptions: usize,
    pub check_interval_secs: u64,
    /// "starting" | "running"
    pub state: String,
    pub last_cycle: Option<CycleSummary>,
    /// Cycles that could not even list subscriptions (store down).
    pub failed_cycles: u64,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub status: Arc<RwLock<StatusSnapshot>>,
    pub engine: Arc<TrackerEngine>,
    pub check_interval: Duration,
}

impl AppState {
    pub fn new(
        engine: Arc<TrackerEngine>,
        bus: broadcast::Sender<BusMsg>,
        check_interval: Duration,
    ) -> Self {
        let initial_status = StatusSnapshot {
            daemon_uptime_secs: uptime_secs(),
            active_subscriptions: 0,
            check_interval_secs: check_interval.as_secs(),
            state: "starting".to_string(),
            last_cycle: None,
            failed_cycles: 0,
        };

        Self {
            bus,
            build: BuildInfo {
                service: "plw-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            status: Arc::new(RwLock::new(initial_status)),
            engine,
            check_interval,
        }
    }

    /// Current status with live uptime and cache size.
    pub async fn status_snapshot(&self) -> StatusSnapshot {
        let mut snap = self.status.read().await.clone();
        snap.daemon_uptime_secs = uptime_secs();
        snap.active_subscriptions = self.engine.cache().len().await;
        snap
    }

    /// Run one scheduler cycle and record its outcome.
    pub async fn run_cycle(&self) -> Option<CycleSummary> {
        match self.engine.reconcile_all().await {
            Ok(report) => {
                let summary = CycleSummary {
                    finished_at_utc: Utc::now(),
                    report,
                };
                {
                    let mut st = self.status.write().await;
                    st.state = "running".to_string();
                    st.last_cycle = Some(summary);
                }
                let _ = self.bus.send(BusMsg::Cycle(summary));
                Some(summary)
            }
            Err(e) => {
                warn!(error = %e, "reconcile cycle aborted");
                {
                    let mut st = self.status.write().await;
                    st.failed_cycles += 1;
                }
                let _ = self.bus.send(BusMsg::LogLine {
                    level: "WARN".to_string(),
                    msg: format!("reconcile cycle aborted: {e}"),
                });
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

/// Spawn the scheduler: wait `initial_delay`, then run one cycle every
/// `state.check_interval`.
///
/// Cycles never overlap: a cycle that runs past the interval delays the next
/// tick instead of bursting to catch up.
pub fn spawn_reconcile_tick(state: Arc<AppState>, initial_delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(initial_delay).await;
        info!(interval = ?state.check_interval, "scheduler started");

        let mut ticker = tokio::time::interval(state.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            state.run_cycle().await;
        }
    });
}
