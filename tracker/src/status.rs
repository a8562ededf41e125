use std::fmt;
use tokio::sync::broadcast;

/// Human-facing status stream: one event per completed operation or
/// surfaced failure. Consumed by whatever front end is attached.
#[derive(Debug, Clone)]
pub enum StatusEvent {
    CredentialsVerified,
    CycleCompleted { accepted: usize },
    NotificationRaised {
        count: usize,
        titles: Vec<String>,
        volume: u8,
    },
    Error { message: String },
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::CredentialsVerified => write!(f, "credentials verified"),
            StatusEvent::CycleCompleted { accepted } => {
                write!(f, "fetch completed: {accepted} new posts")
            }
            StatusEvent::NotificationRaised { count, .. } => {
                write!(f, "notified about {count} new posts")
            }
            StatusEvent::Error { message } => write!(f, "error: {message}"),
        }
    }
}

/// Broadcast fan-out for status events. Emitting with no subscribers
/// is fine; background cycles must never block on a listener.
#[derive(Debug, Clone)]
pub struct StatusChannel {
    tx: broadcast::Sender<StatusEvent>,
}

impl StatusChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: StatusEvent) {
        // Send only fails when nobody is listening, which is fine.
        let _ = self.tx.send(event);
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_all_subscribers() {
        let channel = StatusChannel::new(8);
        let mut first = channel.subscribe();
        let mut second = channel.subscribe();

        channel.emit(StatusEvent::CredentialsVerified);

        assert!(matches!(
            first.recv().await.unwrap(),
            StatusEvent::CredentialsVerified
        ));
        assert!(matches!(
            second.recv().await.unwrap(),
            StatusEvent::CredentialsVerified
        ));
    }

    #[test]
    fn emitting_without_subscribers_does_not_panic() {
        let channel = StatusChannel::new(8);
        channel.emit(StatusEvent::CycleCompleted { accepted: 0 });
    }

    #[test]
    fn display_matches_status_strings() {
        assert_eq!(
            StatusEvent::CredentialsVerified.to_string(),
            "credentials verified"
        );
        assert_eq!(
            StatusEvent::Error {
                message: "invalid credentials (401)".to_string()
            }
            .to_string(),
            "error: invalid credentials (401)"
        );
    }
}
