use crate::status::{StatusChannel, StatusEvent};
use notify_rust::Notification;
use redwatch_core::{CoreError, Post};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Seam for the visual/sound alert so tests can observe raises
/// without a desktop session.
pub trait Alert: Send + Sync {
    fn raise(&self, count: usize, titles: &[String]) -> Result<(), CoreError>;
}

/// Desktop notification via the platform notification service.
#[derive(Debug, Default)]
pub struct DesktopAlert;

impl Alert for DesktopAlert {
    fn raise(&self, count: usize, titles: &[String]) -> Result<(), CoreError> {
        let summary = if count == 1 {
            "1 new post".to_string()
        } else {
            format!("{count} new posts")
        };
        let body = titles.first().map(String::as_str).unwrap_or_default();

        Notification::new()
            .appname("redwatch")
            .summary(&summary)
            .body(body)
            .show()
            .map_err(|e| CoreError::Internal {
                message: format!("desktop notification failed: {e}"),
            })?;
        Ok(())
    }
}

/// Raises the per-cycle side effects for newly accepted posts: badge
/// count, at most one alert, and a status event for the sound layer.
/// Idempotence per cycle is the orchestrator's job; it calls this
/// exactly once per cycle and only with a non-empty set.
#[derive(Debug)]
pub struct Notifier<A: Alert> {
    badge: watch::Sender<usize>,
    alert: A,
    sound_enabled: bool,
    volume: u8,
    status: StatusChannel,
}

impl<A: Alert> Notifier<A> {
    pub fn new(
        alert: A,
        sound_enabled: bool,
        volume: u8,
        status: StatusChannel,
    ) -> (Self, watch::Receiver<usize>) {
        let (badge, badge_rx) = watch::channel(0);
        (
            Self {
                badge,
                alert,
                sound_enabled,
                volume,
                status,
            },
            badge_rx,
        )
    }

    pub fn notify(&self, accepted: &[Post]) {
        if accepted.is_empty() {
            return;
        }

        self.badge.send_replace(accepted.len());
        debug!("badge set to {}", accepted.len());

        let titles: Vec<String> = accepted.iter().map(|p| p.title.clone()).collect();
        if self.sound_enabled {
            if let Err(err) = self.alert.raise(accepted.len(), &titles) {
                // A failed alert must not fail the cycle; state is
                // already committed.
                warn!("could not raise alert: {err}");
            }
        }

        self.status.emit(StatusEvent::NotificationRaised {
            count: accepted.len(),
            titles,
            volume: self.volume,
        });
    }

    /// Called by the display layer once the user has seen the list.
    pub fn clear_badge(&self) {
        self.badge.send_replace(0);
    }

    pub fn badge_count(&self) -> usize {
        *self.badge.borrow()
    }
}
