use crate::notify::Alert;
use crate::orchestrator::{Orchestrator, SourceFetcher, TokenSource};
use redwatch_core::{MAX_POLL_INTERVAL_MINUTES, MIN_POLL_INTERVAL_MINUTES};
use std::sync::Arc;
use std::time::Duration;
use storage::StateStore;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// User asked for an immediate refresh.
    Manual,
    /// Settings changed; re-arm the timer and poll right away.
    ConfigChanged { poll_interval_minutes: u64 },
    Shutdown,
}

/// Cloneable handle for sending triggers into a running scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<Trigger>,
}

impl SchedulerHandle {
    pub async fn manual_refresh(&self) {
        let _ = self.tx.send(Trigger::Manual).await;
    }

    pub async fn config_changed(&self, poll_interval_minutes: u64) {
        let _ = self
            .tx
            .send(Trigger::ConfigChanged {
                poll_interval_minutes,
            })
            .await;
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(Trigger::Shutdown).await;
    }
}

/// The single owned timer. One registered callback path into the
/// orchestrator; overlapping trigger sources all funnel through here
/// and through the orchestrator's in-flight guard.
pub struct Scheduler<T, F, S, A>
where
    T: TokenSource,
    F: SourceFetcher,
    S: StateStore,
    A: Alert,
{
    orchestrator: Arc<Orchestrator<T, F, S, A>>,
    poll_interval: Duration,
    rx: mpsc::Receiver<Trigger>,
}

impl<T, F, S, A> Scheduler<T, F, S, A>
where
    T: TokenSource,
    F: SourceFetcher,
    S: StateStore,
    A: Alert,
{
    pub fn new(
        orchestrator: Arc<Orchestrator<T, F, S, A>>,
        poll_interval_minutes: u64,
    ) -> (Self, SchedulerHandle) {
        let (tx, rx) = mpsc::channel(16);
        (
            Self {
                orchestrator,
                poll_interval: interval_duration(poll_interval_minutes),
                rx,
            },
            SchedulerHandle { tx },
        )
    }

    /// Runs until shutdown. A failed cycle is reported on the status
    /// channel and the next tick still fires.
    pub async fn run(mut self) {
        info!("scheduler started, polling every {:?}", self.poll_interval);

        // Startup counts as a trigger: poll once before the first tick.
        self.orchestrator.trigger().await;

        let mut ticker = new_ticker(self.poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.orchestrator.trigger().await;
                }
                trigger = self.rx.recv() => match trigger {
                    Some(Trigger::Manual) => {
                        info!("manual refresh requested");
                        self.orchestrator.trigger().await;
                    }
                    Some(Trigger::ConfigChanged { poll_interval_minutes }) => {
                        self.poll_interval = interval_duration(poll_interval_minutes);
                        info!("poll interval changed to {:?}", self.poll_interval);
                        ticker = new_ticker(self.poll_interval);
                        self.orchestrator.trigger().await;
                    }
                    Some(Trigger::Shutdown) | None => {
                        info!("scheduler stopping");
                        break;
                    }
                }
            }
        }
    }
}

fn interval_duration(minutes: u64) -> Duration {
    let clamped = minutes.clamp(MIN_POLL_INTERVAL_MINUTES, MAX_POLL_INTERVAL_MINUTES);
    if clamped != minutes {
        warn!("poll interval {minutes}m out of range, using {clamped}m");
    }
    Duration::from_secs(clamped * 60)
}

fn new_ticker(period: Duration) -> tokio::time::Interval {
    // First tick is one full period out; the startup/config-change
    // cycle has already run by the time the ticker is armed.
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
