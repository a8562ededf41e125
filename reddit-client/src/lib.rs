pub mod auth;
pub mod feed;
pub mod rate_limiter;
pub mod retry;

#[cfg(test)]
mod tests;

pub use auth::{CredentialCheck, TokenManager};
pub use feed::{FeedFetcher, Listing, ListingChild, ListingData, ListingPostData};

/// Fixed auth endpoint for the password-grant exchange.
pub const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Fixed User-Agent sent on every request, auth and fetch alike.
pub const USER_AGENT: &str = "RedditTracker/1.0";

/// Upper bound on any single HTTP request.
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 30;
