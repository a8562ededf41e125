use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use crate::retry::{calculate_delay, get_retry_strategy, RetryConfig, RetryStrategy};
use crate::{REQUEST_TIMEOUT_SECS, USER_AGENT};
use redwatch_core::{CoreError, FeedError, FeedSource, Post, Token};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Reddit listing envelope: `{"kind": "Listing", "data": {"children": [...]}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub kind: String,
    pub data: ListingData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingData {
    pub children: Vec<ListingChild>,
    pub after: Option<String>,
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingChild {
    pub kind: String,
    pub data: ListingPostData,
}

/// Raw post payload as the API reports it. Normalized into
/// [`Post`] before it leaves this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub author: String,
    pub subreddit: String,
    pub url: String,
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub num_comments: u32,
    #[serde(default)]
    pub is_self: bool,
}

impl From<ListingPostData> for Post {
    fn from(data: ListingPostData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            author: data.author,
            source_name: format!("r/{}", data.subreddit),
            url: data.url,
            permalink: data.permalink,
            created_at: data.created_utc as i64,
            comment_count: data.num_comments,
            content: if data.is_self && !data.selftext.is_empty() {
                Some(data.selftext)
            } else {
                None
            },
        }
    }
}

/// Fetches one configured feed endpoint and normalizes its response.
/// Pure transform of a network response into candidates; no dedup or
/// persistence happens here.
#[derive(Debug)]
pub struct FeedFetcher {
    http: Client,
    rate_limiter: Arc<RateLimiter>,
    retry: RetryConfig,
    fetch_timeout: Duration,
}

impl FeedFetcher {
    pub fn new() -> Result<Self, CoreError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::reddit_oauth())),
            retry: RetryConfig::reddit(),
            fetch_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        })
    }

    /// A failure here is scoped to this source; the orchestrator
    /// carries on with the rest. Transient errors are retried with
    /// backoff before giving up.
    pub async fn fetch_source(
        &self,
        source: &FeedSource,
        token: &Token,
    ) -> Result<Vec<Post>, CoreError> {
        let mut attempt = 1;
        loop {
            let result = match timeout(self.fetch_timeout, self.fetch_once(source, token)).await {
                Ok(result) => result,
                Err(_) => Err(FeedError::Timeout {
                    source_name: source.display_name(),
                }
                .into()),
            };

            let err = match result {
                Ok(posts) => return Ok(posts),
                Err(err) => err,
            };

            if attempt >= self.retry.max_attempts {
                return Err(err);
            }
            match get_retry_strategy(&err) {
                RetryStrategy::NoRetry => return Err(err),
                RetryStrategy::RetryWithDelay(delay) => {
                    warn!("fetch of {} rate limited, retrying in {:?}", source.url, delay);
                    sleep(delay).await;
                }
                RetryStrategy::Retry => {
                    let delay = calculate_delay(attempt, &self.retry);
                    debug!(
                        "fetch of {} failed ({err}), retry {attempt} in {:?}",
                        source.url, delay
                    );
                    sleep(delay).await;
                }
            }
            attempt += 1;
        }
    }

    async fn fetch_once(&self, source: &FeedSource, token: &Token) -> Result<Vec<Post>, CoreError> {
        let _permit = self.rate_limiter.acquire_permit().await;
        let name = source.display_name();

        debug!("fetching {}", source.url);
        let response = self
            .http
            .get(&source.url)
            .bearer_auth(&token.access_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| -> CoreError {
                if e.is_timeout() {
                    FeedError::Timeout {
                        source_name: name.clone(),
                    }
                    .into()
                } else {
                    e.into()
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = match status.as_u16() {
                401 => FeedError::Unauthorized { source_name: name },
                429 => {
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(60);
                    FeedError::RateLimited {
                        source_name: name,
                        retry_after,
                    }
                }
                code if status.is_server_error() => FeedError::ServerError {
                    source_name: name,
                    status: code,
                },
                code => FeedError::RequestFailed {
                    source_name: name,
                    status: code,
                },
            };
            return Err(err.into());
        }

        let listing: Listing = response.json().await.map_err(|e| {
            CoreError::from(FeedError::MalformedListing {
                source_name: name.clone(),
                details: e.to_string(),
            })
        })?;

        let posts: Vec<Post> = listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.into())
            .collect();

        info!("retrieved {} posts from {}", posts.len(), name);
        Ok(posts)
    }
}
