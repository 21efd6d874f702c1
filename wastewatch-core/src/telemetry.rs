//! Fixed-interval polling of the backend health endpoint.
//!
//! A [`TelemetryPoller`] moves through `Idle -> Polling -> Stopped`. While polling it fetches one
//! snapshot immediately and then one per interval. Results are published through a
//! [`tokio::sync::watch`] channel; once the poller is stopped nothing is published any more,
//! not even the result of a fetch that was already in flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::model::HealthSnapshot;
use crate::ports::{HealthPort, PortError};

/// Default delay between two health samples.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Lifecycle of a poller.
pub enum PollPhase {
    /// Created, never activated.
    #[default]
    Idle,
    /// Fetching on a timer.
    Polling,
    /// Deactivated; state is frozen.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Default)]
/// What the monitor screen displays.
pub struct TelemetryState {
    /// Lifecycle phase.
    pub phase: PollPhase,
    /// Last successful sample; survives failures.
    pub snapshot: Option<HealthSnapshot>,
    /// Message of the latest failure, cleared by the next success.
    pub error: Option<String>,
    /// When `snapshot` was taken.
    pub last_updated: Option<DateTime<Utc>>,
    /// Failures since the last success.
    pub consecutive_failures: u32,
}

/// Owner of the background health polling task.
pub struct TelemetryPoller {
    port: Arc<dyn HealthPort>,
    interval: Duration,
    state: Arc<watch::Sender<TelemetryState>>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl TelemetryPoller {
    /// Idle poller sampling `port` every `interval`. A zero interval is raised to one
    /// millisecond.
    #[must_use]
    pub fn new(port: Arc<dyn HealthPort>, interval: Duration) -> Self {
        let (state, _) = watch::channel(TelemetryState::default());
        Self {
            port,
            interval: interval.max(Duration::from_millis(1)),
            state: Arc::new(state),
            cancel: None,
            task: None,
        }
    }

    /// Receiver that observes every published state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TelemetryState> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> TelemetryState {
        self.state.borrow().clone()
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> PollPhase {
        self.state.borrow().phase
    }

    /// Start polling. Must be called from within a Tokio runtime.
    ///
    /// Activating an already polling poller does nothing; activating a stopped one starts a
    /// fresh loop that keeps the last snapshot.
    pub fn activate(&mut self) {
        if self.phase() == PollPhase::Polling {
            return;
        }
        let cancel = CancellationToken::new();
        self.state.send_modify(|state| state.phase = PollPhase::Polling);
        debug!(interval_ms = self.interval.as_millis(), "telemetry polling started");
        self.task = Some(tokio::spawn(poll_loop(
            Arc::clone(&self.port),
            self.interval,
            Arc::clone(&self.state),
            cancel.clone(),
        )));
        self.cancel = Some(cancel);
    }

    /// Stop polling. No fetch starts afterwards and no in-flight result is published.
    pub fn deactivate(&mut self) {
        let was_polling = self.state.send_if_modified(|state| {
            if state.phase == PollPhase::Polling {
                state.phase = PollPhase::Stopped;
                true
            } else {
                false
            }
        });
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if was_polling {
            debug!("telemetry polling stopped");
        }
    }
}

impl Drop for TelemetryPoller {
    fn drop(&mut self) {
        self.deactivate();
    }
}

async fn poll_loop(
    port: Arc<dyn HealthPort>,
    interval: Duration,
    state: Arc<watch::Sender<TelemetryState>>,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = port.health() => result,
        };
        apply(&state, &cancel, result);
    }
}

fn apply(
    state: &watch::Sender<TelemetryState>,
    cancel: &CancellationToken,
    result: Result<HealthSnapshot, PortError>,
) -> bool {
    state.send_if_modified(|current| {
        if current.phase != PollPhase::Polling || cancel.is_cancelled() {
            debug!("dropping health sample after deactivation");
            return false;
        }
        match result {
            Ok(snapshot) => {
                debug!(threads = snapshot.active_threads, "health sample");
                current.snapshot = Some(snapshot);
                current.error = None;
                current.last_updated = Some(Utc::now());
                current.consecutive_failures = 0;
            }
            Err(err) => {
                warn!(error = %err, "health poll failed");
                current.error = Some(err.to_string());
                current.consecutive_failures = current.consecutive_failures.saturating_add(1);
            }
        }
        true
    })
}
