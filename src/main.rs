use anyhow::Context;
use reddit_client::{FeedFetcher, TokenManager};
use redwatch_core::AppConfig;
use std::sync::Arc;
use storage::{JsonStateStore, StateStore};
use tracker::{
    DesktopAlert, Notifier, Orchestrator, ReconcilePolicy, Scheduler, StatusChannel,
};

const DEFAULT_CONFIG_PATH: &str = "redwatch.toml";
const DEFAULT_STATE_PATH: &str = "redwatch-state.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redwatch=info,tracker=info,reddit_client=info,storage=info".into()),
        )
        .init();

    tracing::info!("starting redwatch");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("loading configuration from {config_path}"))?;

    let store = Arc::new(JsonStateStore::new(DEFAULT_STATE_PATH));
    let state = store.load().await.context("loading persisted state")?;

    let tokens = TokenManager::new(config.credentials())
        .context("building token manager")?
        .with_cached_token(state.token);
    let fetcher = FeedFetcher::new().context("building feed fetcher")?;

    let status = StatusChannel::default();
    let (notifier, mut badge_rx) = Notifier::new(
        DesktopAlert,
        config.sound_enabled,
        config.notification_volume,
        status.clone(),
    );

    let orchestrator = Arc::new(Orchestrator::new(
        tokens,
        fetcher,
        store,
        notifier,
        status.clone(),
        config.feed_sources(),
        ReconcilePolicy::from_config(&config),
    ));

    let (scheduler, handle) = Scheduler::new(orchestrator, config.poll_interval_minutes);

    let mut status_rx = status.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = status_rx.recv().await {
            tracing::info!("{event}");
        }
    });
    tokio::spawn(async move {
        while badge_rx.changed().await.is_ok() {
            let count = *badge_rx.borrow();
            if count > 0 {
                tracing::info!("badge count: {count}");
            }
        }
    });

    let scheduler_task = tokio::spawn(scheduler.run());

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutdown requested");
    handle.shutdown().await;
    let _ = scheduler_task.await;

    Ok(())
}
