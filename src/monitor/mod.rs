//! Backend liveness monitor: on-demand checks, observable state and completion-relative polling.

mod poller;
mod state;

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use tokio::{runtime::Handle, sync::watch};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::{
    config::MonitorConfig,
    dto::health::HealthStatus,
    error::CheckResult,
    probe::{HealthProbe, HttpHealthProbe},
};

pub use self::state::MonitorState;
use self::poller::PollHandle;

/// Tracks the health of the consultation backend.
///
/// State is published through a [`watch`] channel so a status banner can react to every
/// transition. Call [`HealthMonitor::dispose`] (or drop the monitor) when the owning view goes
/// away; pending polls are cancelled then.
pub struct HealthMonitor {
    config: MonitorConfig,
    shared: Arc<Shared>,
    poller: Mutex<Option<PollHandle>>,
}

impl HealthMonitor {
    /// Create a monitor probing `{backend_url}/health` over HTTP.
    ///
    /// With `auto_check_on_start` a check is spawned right away (and polling starts when an
    /// interval is configured). Outside a tokio runtime the automatic start is skipped.
    pub fn new(config: MonitorConfig) -> CheckResult<Self> {
        let probe = HttpHealthProbe::new(&config.backend_url)?;
        Ok(Self::with_probe(config, Arc::new(probe)))
    }

    /// Create a monitor around an arbitrary probe implementation.
    pub fn with_probe(config: MonitorConfig, probe: Arc<dyn HealthProbe>) -> Self {
        let (state_tx, _rx) = watch::channel(MonitorState::default());
        let monitor = Self {
            config,
            shared: Arc::new(Shared {
                probe,
                state: state_tx,
                in_flight: AtomicUsize::new(0),
            }),
            poller: Mutex::new(None),
        };

        if monitor.config.auto_check_on_start {
            if monitor.config.poll_interval.is_zero() {
                if let Some(runtime) = current_runtime("initial health check") {
                    let shared = monitor.shared.clone();
                    runtime.spawn(async move { shared.check().await });
                }
            } else {
                monitor.install_poller(true);
            }
        }

        monitor
    }

    /// Configuration the monitor was created with.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run one health check and record its outcome.
    ///
    /// Failures never escape: they are turned into `is_healthy = false` and a `last_error`
    /// description. Concurrent calls are not deduplicated.
    pub async fn check_health(&self) {
        self.shared.check().await;
    }

    /// Start polling every `poll_interval` after each completed check.
    ///
    /// Does nothing when already polling, when the interval is zero or outside a tokio runtime.
    pub fn start_polling(&self) {
        self.install_poller(false);
    }

    /// Cancel the pending scheduled check, if any. An in-flight check still completes.
    pub fn stop_polling(&self) {
        let handle = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if handle.is_some() {
            info!(url = self.shared.probe.target(), "stopped health polling");
        }
    }

    /// Whether a polling task is currently installed.
    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Release timers owned by the monitor. Safe to call more than once.
    pub fn dispose(&self) {
        self.stop_polling();
    }

    /// Whether the last check succeeded and reported `healthy`.
    pub fn is_healthy(&self) -> bool {
        self.shared.state.borrow().is_healthy
    }

    /// Whether a check is currently outstanding.
    pub fn is_checking(&self) -> bool {
        self.shared.state.borrow().is_checking
    }

    /// Body of the last successful check.
    pub fn last_status(&self) -> Option<HealthStatus> {
        self.shared.state.borrow().last_status.clone()
    }

    /// Description of the last failed check.
    pub fn last_error(&self) -> Option<String> {
        self.shared.state.borrow().last_error.clone()
    }

    /// Copy of the full observable state.
    pub fn snapshot(&self) -> MonitorState {
        self.shared.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.shared.state.subscribe()
    }

    /// Stream of states, starting with the current one.
    pub fn updates(&self) -> WatchStream<MonitorState> {
        WatchStream::new(self.subscribe())
    }

    fn install_poller(&self, check_first: bool) {
        let interval = self.config.poll_interval;
        if interval.is_zero() {
            debug!("poll interval is zero; polling disabled");
            return;
        }

        let mut guard = self.poller.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return;
        }

        let Some(runtime) = current_runtime("health polling") else {
            return;
        };

        let shared = self.shared.clone();
        *guard = Some(PollHandle::spawn(&runtime, interval, check_first, move || {
            let shared = shared.clone();
            async move { shared.check().await }
        }));
        info!(
            url = self.shared.probe.target(),
            interval_ms = interval.as_millis() as u64,
            "started health polling"
        );
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Handle to the ambient tokio runtime, or `None` (logged) when called outside of one.
fn current_runtime(purpose: &'static str) -> Option<Handle> {
    match Handle::try_current() {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!(purpose, error = %err, "no tokio runtime available; not scheduling");
            None
        }
    }
}

/// State shared between the monitor handle and its polling task.
struct Shared {
    probe: Arc<dyn HealthProbe>,
    state: watch::Sender<MonitorState>,
    /// Number of outstanding checks; only updated while the state is being modified.
    in_flight: AtomicUsize,
}

impl Shared {
    async fn check(&self) {
        let guard = InFlight::enter(self);
        debug!(url = self.probe.target(), "checking backend health");

        let outcome = match self.probe.probe().await {
            Ok(payload) => HealthStatus::from_payload(&payload),
            Err(err) => Err(err),
        };

        match &outcome {
            Ok(status) => debug!(
                status = %status.status,
                database = status.database_ok,
                llm = status.llm_ok,
                "health check completed"
            ),
            Err(err) => warn!(
                url = self.probe.target(),
                error = %err.describe(),
                "health check failed"
            ),
        }

        let was_healthy = self.state.borrow().is_healthy;
        guard.complete(outcome);
        let is_healthy = self.state.borrow().is_healthy;

        if was_healthy && !is_healthy {
            warn!(url = self.probe.target(), "backend no longer healthy");
        } else if !was_healthy && is_healthy {
            info!(url = self.probe.target(), "backend healthy");
        }
    }

    fn leave(&self, outcome: Option<CheckResult<HealthStatus>>) {
        self.state.send_modify(|state| {
            let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            if let Some(outcome) = outcome {
                state.record(outcome);
            }
            state.is_checking = remaining > 0;
        });
    }
}

/// Marks a check as outstanding until it completes or its future is dropped.
struct InFlight<'a> {
    shared: &'a Shared,
    done: bool,
}

impl<'a> InFlight<'a> {
    fn enter(shared: &'a Shared) -> Self {
        shared.state.send_modify(|state| {
            shared.in_flight.fetch_add(1, Ordering::SeqCst);
            state.is_checking = true;
        });
        Self {
            shared,
            done: false,
        }
    }

    fn complete(mut self, outcome: CheckResult<HealthStatus>) {
        self.done = true;
        self.shared.leave(Some(outcome));
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.shared.leave(None);
        }
    }
}
