use crate::notify::{Alert, Notifier};
use crate::reconcile::{reconcile, ReconcilePolicy};
use crate::status::{StatusChannel, StatusEvent};
use chrono::Utc;
use redwatch_core::{CoreError, Credentials, ErrorExt, FeedError, FeedSource, History, Post, Token};
use reddit_client::auth::{CredentialCheck, TokenManager};
use reddit_client::feed::FeedFetcher;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use storage::{StateStore, TrackerState};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// Token acquisition seam. The real implementation is
/// [`TokenManager`]; tests substitute a scripted one.
pub trait TokenSource: Send + Sync {
    fn get_valid_token(&self) -> impl Future<Output = Result<Token, CoreError>> + Send;
    fn invalidate(&self) -> impl Future<Output = ()> + Send;
    fn current(&self) -> impl Future<Output = Option<Token>> + Send;
    fn test_credentials(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = CredentialCheck> + Send;
}

impl TokenSource for TokenManager {
    async fn get_valid_token(&self) -> Result<Token, CoreError> {
        TokenManager::get_valid_token(self).await
    }

    async fn invalidate(&self) {
        TokenManager::invalidate(self).await
    }

    async fn current(&self) -> Option<Token> {
        TokenManager::current(self).await
    }

    async fn test_credentials(&self, credentials: &Credentials) -> CredentialCheck {
        TokenManager::test_credentials(self, credentials).await
    }
}

/// Per-source fetch seam.
pub trait SourceFetcher: Send + Sync {
    fn fetch_source(
        &self,
        source: &FeedSource,
        token: &Token,
    ) -> impl Future<Output = Result<Vec<Post>, CoreError>> + Send;
}

impl SourceFetcher for FeedFetcher {
    async fn fetch_source(
        &self,
        source: &FeedSource,
        token: &Token,
    ) -> Result<Vec<Post>, CoreError> {
        FeedFetcher::fetch_source(self, source, token).await
    }
}

/// Where the current cycle is. Observable through a watch channel so
/// a front end can show progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    FetchingToken,
    FetchingSources,
    Reconciling,
    Persisting,
    Failed,
}

/// Drives one poll cycle end to end and owns the serialization
/// guarantee: at most one cycle reads and writes SeenSet/History at a
/// time, and a trigger arriving mid-cycle coalesces into a single
/// follow-up run.
pub struct Orchestrator<T, F, S, A>
where
    T: TokenSource,
    F: SourceFetcher,
    S: StateStore,
    A: Alert,
{
    tokens: T,
    fetcher: F,
    store: S,
    notifier: Notifier<A>,
    status: StatusChannel,
    sources: Vec<FeedSource>,
    policy: ReconcilePolicy,
    cycle_lock: Mutex<()>,
    rerun_queued: AtomicBool,
    phase: watch::Sender<CyclePhase>,
}

impl<T, F, S, A> Orchestrator<T, F, S, A>
where
    T: TokenSource,
    F: SourceFetcher,
    S: StateStore,
    A: Alert,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tokens: T,
        fetcher: F,
        store: S,
        notifier: Notifier<A>,
        status: StatusChannel,
        sources: Vec<FeedSource>,
        policy: ReconcilePolicy,
    ) -> Self {
        let (phase, _) = watch::channel(CyclePhase::Idle);
        Self {
            tokens,
            fetcher,
            store,
            notifier,
            status,
            sources,
            policy,
            cycle_lock: Mutex::new(()),
            rerun_queued: AtomicBool::new(false),
            phase,
        }
    }

    /// Runs a cycle and reports the number of accepted posts. Waits
    /// its turn if a cycle is already in flight; used by manual
    /// refresh, which wants a synchronous answer.
    pub async fn run_cycle(&self) -> Result<usize, CoreError> {
        let _guard = self.cycle_lock.lock().await;
        self.execute_cycle().await
    }

    /// Background entry point. If a cycle is already running, queues
    /// at most one follow-up run instead of piling up; otherwise runs
    /// now and then drains any follow-up queued meanwhile.
    pub async fn trigger(&self) {
        match self.cycle_lock.try_lock() {
            Ok(_guard) => loop {
                let _ = self.execute_cycle().await;
                if !self.rerun_queued.swap(false, Ordering::SeqCst) {
                    break;
                }
                debug!("running coalesced follow-up cycle");
            },
            Err(_) => {
                self.rerun_queued.store(true, Ordering::SeqCst);
                debug!("cycle already in flight, queued one follow-up");
            }
        }
    }

    /// Credential test for the configuration surface; never touches
    /// the pipeline's cached token or persisted state.
    pub async fn check_credentials(&self, credentials: &Credentials) -> CredentialCheck {
        let check = self.tokens.test_credentials(credentials).await;
        match &check.error {
            None => self.status.emit(StatusEvent::CredentialsVerified),
            Some(error) => self.status.emit(StatusEvent::Error {
                message: error.clone(),
            }),
        }
        check
    }

    /// Read access for the display layer.
    pub async fn history(&self) -> Result<History, CoreError> {
        Ok(self.store.load().await?.history)
    }

    pub fn clear_badge(&self) {
        self.notifier.clear_badge();
    }

    pub fn badge_count(&self) -> usize {
        self.notifier.badge_count()
    }

    pub fn phase_watch(&self) -> watch::Receiver<CyclePhase> {
        self.phase.subscribe()
    }

    async fn execute_cycle(&self) -> Result<usize, CoreError> {
        let result = self.cycle_inner().await;
        match &result {
            Ok(accepted) => {
                info!("poll cycle completed with {accepted} new posts");
                self.status.emit(StatusEvent::CycleCompleted {
                    accepted: *accepted,
                });
            }
            Err(err) => {
                warn!("poll cycle failed: {err}");
                self.set_phase(CyclePhase::Failed);
                self.status.emit(StatusEvent::Error {
                    message: err.user_friendly_message(),
                });
            }
        }
        self.set_phase(CyclePhase::Idle);
        result
    }

    async fn cycle_inner(&self) -> Result<usize, CoreError> {
        self.set_phase(CyclePhase::FetchingToken);
        let token = self.tokens.get_valid_token().await?;

        let state = self.store.load().await?;

        self.set_phase(CyclePhase::FetchingSources);
        let fetches = self
            .sources
            .iter()
            .map(|source| self.fetcher.fetch_source(source, &token));
        let results = futures::future::join_all(fetches).await;

        let mut candidates: Vec<Post> = Vec::new();
        let mut token_rejected = false;
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(posts) => candidates.extend(posts),
                Err(err) => {
                    // One bad source never aborts the cycle.
                    warn!("source {} failed: {err}", source.display_name());
                    if matches!(err, CoreError::Feed(FeedError::Unauthorized { .. })) {
                        token_rejected = true;
                    }
                    self.status.emit(StatusEvent::Error {
                        message: err.user_friendly_message(),
                    });
                }
            }
        }
        if token_rejected {
            self.tokens.invalidate().await;
        }

        self.set_phase(CyclePhase::Reconciling);
        let outcome = reconcile(candidates, &state.seen, &state.history, &self.policy);

        self.set_phase(CyclePhase::Persisting);
        let new_state = TrackerState {
            token: self.tokens.current().await,
            seen: outcome.seen,
            history: outcome.history,
            last_check: Utc::now().timestamp(),
        };
        // All-or-nothing: if this fails, the previous snapshot (and
        // its LastCheckTime) stays in force and no notification fires.
        self.store.store(&new_state).await?;

        self.notifier.notify(&outcome.accepted);
        Ok(outcome.accepted.len())
    }

    fn set_phase(&self, phase: CyclePhase) {
        self.phase.send_replace(phase);
    }
}
