//! Background token refresh.
//!
//! A scheduler keeps one [`TokenStore`] fresh: it refreshes on start unless a
//! valid token exists, then on every interval tick and whenever the
//! [`FocusTrigger`] fires, each time only if the token is absent or stale.
//! Overlapping triggers collapse into the store's in-flight refresh.

use std::sync::Arc;
use std::time::Duration;

use opsdesk_auth::TokenEndpoint;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::store::TokenStore;

/// Default timer period: ten minutes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(600);

/// Scheduler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Timer period.
    pub interval: Duration,
    /// Staleness threshold override; `None` uses the token's own lifetime.
    pub max_age_secs: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_age_secs: None,
        }
    }
}

/// "The user is back" signal, shared by every scheduler that subscribes.
///
/// Signals sent while a scheduler is busy are not lost; it sees them on its
/// next wait.
#[derive(Debug, Clone)]
pub struct FocusTrigger {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for FocusTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusTrigger {
    /// Creates a trigger with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Signals that focus was regained.
    pub fn notify(&self) {
        self.tx.send_modify(|n| *n = n.wrapping_add(1));
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

/// Why a staleness check ran.
#[derive(Debug, Clone, Copy)]
enum Cause {
    Start,
    Timer,
    Focus,
}

/// Refresh loop for one token store.
pub struct RefreshScheduler<E> {
    store: Arc<TokenStore<E>>,
    config: SchedulerConfig,
}

impl<E: TokenEndpoint + 'static> RefreshScheduler<E> {
    /// Creates a scheduler for `store`.
    #[must_use]
    pub const fn new(store: Arc<TokenStore<E>>, config: SchedulerConfig) -> Self {
        Self { store, config }
    }

    /// Spawns the loop on the current runtime. It runs until `shutdown` fires.
    pub fn spawn(
        store: Arc<TokenStore<E>>,
        config: SchedulerConfig,
        trigger: &FocusTrigger,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let focus = trigger.subscribe();
        let scheduler = Self::new(store, config);
        tokio::spawn(async move { scheduler.run(focus, shutdown).await })
    }

    async fn run(self, mut focus: watch::Receiver<u64>, shutdown: CancellationToken) {
        let name = self.store.endpoint().name().to_string();
        info!(
            "Starting {name} token scheduler ({}s interval)",
            self.config.interval.as_secs()
        );

        tokio::select! {
            () = shutdown.cancelled() => return,
            () = self.check(Cause::Start) => {}
        }

        let mut ticker = interval_at(Instant::now() + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut focus_open = true;

        loop {
            let cause = tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => Cause::Timer,
                changed = focus.changed(), if focus_open => {
                    if changed.is_err() {
                        debug!("Focus trigger dropped; {name} scheduler continues on timer only");
                        focus_open = false;
                        continue;
                    }
                    Cause::Focus
                }
            };
            // A refresh in flight is abandoned on shutdown; the store keeps
            // its previous record.
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = self.check(cause) => {}
            }
        }
        info!("Stopping {name} token scheduler");
    }

    async fn check(&self, cause: Cause) {
        if self.store.is_expired(self.config.max_age_secs) {
            debug!(?cause, "{} token absent or stale, refreshing", self.store.endpoint().name());
            self.store.refresh().await;
        } else {
            debug!(?cause, "{} token still valid", self.store.endpoint().name());
        }
    }
}
