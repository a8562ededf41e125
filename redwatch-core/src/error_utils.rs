use crate::error::*;
use std::time::Duration;

pub trait ErrorExt {
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
}

impl ErrorExt for CoreError {
    fn is_retryable(&self) -> bool {
        match self {
            CoreError::Auth(e) => e.is_retryable(),
            CoreError::Feed(e) => e.is_retryable(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::Feed(FeedError::RateLimited { retry_after, .. }) => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Auth(e) => e.user_friendly_message(),
            CoreError::Feed(e) => e.user_friendly_message(),
            CoreError::Storage(e) => format!("tracker state problem: {e}"),
            CoreError::Config(e) => format!("configuration problem: {e}"),
            CoreError::Network(_) => "network connection error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ErrorExt for AuthError {
    fn is_retryable(&self) -> bool {
        // A rejected exchange is permanent until credentials change; a
        // timed-out one may succeed on the next cycle.
        matches!(self, AuthError::Timeout)
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            AuthError::MissingCredentials => "API credentials are missing".to_string(),
            AuthError::Rejected { status, .. } => format!("invalid credentials ({status})"),
            AuthError::Timeout => "credential check timed out".to_string(),
            AuthError::MalformedResponse { .. } => {
                "unexpected response from the auth endpoint".to_string()
            }
        }
    }
}

impl ErrorExt for FeedError {
    fn is_retryable(&self) -> bool {
        match self {
            FeedError::Timeout { .. } => true,
            FeedError::RateLimited { .. } => true,
            FeedError::ServerError { status, .. } => *status >= 500,
            FeedError::RequestFailed { .. } => false,
            FeedError::Unauthorized { .. } => false,
            FeedError::MalformedListing { .. } => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            FeedError::RateLimited { retry_after, .. } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            FeedError::RequestFailed { source_name: source, status } => {
                format!("could not fetch {source} ({status})")
            }
            FeedError::Timeout { source_name: source } => format!("fetching {source} timed out"),
            FeedError::Unauthorized { source_name: source } => {
                format!("authorization expired while fetching {source}")
            }
            FeedError::RateLimited { source_name: source, .. } => format!("rate limited fetching {source}"),
            FeedError::ServerError { source_name: source, status } => {
                format!("{source} returned a server error ({status})")
            }
            FeedError::MalformedListing { source_name: source, .. } => {
                format!("could not understand the response from {source}")
            }
        }
    }
}
