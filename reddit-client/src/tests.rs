use crate::auth::TokenManager;
use crate::feed::{Listing, ListingPostData};
use chrono::{Duration, Utc};
use redwatch_core::{AuthError, CoreError, Credentials, Post, Token};

fn complete_credentials() -> Credentials {
    Credentials {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        username: "watcher".to_string(),
        password: "hunter2".to_string(),
    }
}

fn valid_token() -> Token {
    Token {
        access_token: "cached-token".to_string(),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

fn expired_token() -> Token {
    Token {
        access_token: "stale-token".to_string(),
        expires_at: Utc::now() - Duration::hours(1),
    }
}

#[tokio::test]
async fn cached_token_is_reused_without_network() {
    // Credentials are empty, so any exchange attempt would fail with
    // MissingCredentials before touching the network. Getting the
    // token back proves the cache fast path.
    let manager = TokenManager::new(Credentials::default())
        .unwrap()
        .with_cached_token(Some(valid_token()));

    let token = manager.get_valid_token().await.unwrap();
    assert_eq!(token.access_token, "cached-token");
}

#[tokio::test]
async fn missing_credentials_fail_before_any_exchange() {
    let manager = TokenManager::new(Credentials::default()).unwrap();
    let err = manager.get_valid_token().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Auth(AuthError::MissingCredentials)
    ));
}

#[tokio::test]
async fn expired_seed_token_is_discarded() {
    let manager = TokenManager::new(Credentials::default())
        .unwrap()
        .with_cached_token(Some(expired_token()));

    assert!(manager.current().await.is_none());
    // With the stale token gone and no credentials, the refresh path
    // reports missing credentials rather than reusing it.
    let err = manager.get_valid_token().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Auth(AuthError::MissingCredentials)
    ));
}

#[tokio::test]
async fn invalidate_drops_the_cached_token() {
    let manager = TokenManager::new(complete_credentials())
        .unwrap()
        .with_cached_token(Some(valid_token()));

    assert!(manager.current().await.is_some());
    manager.invalidate().await;
    assert!(manager.current().await.is_none());
}

#[tokio::test]
async fn credential_test_rejects_incomplete_set_locally() {
    let manager = TokenManager::new(complete_credentials()).unwrap();

    let check = manager.test_credentials(&Credentials::default()).await;
    assert!(!check.success);
    assert!(check.error.unwrap().contains("missing"));
    // The pipeline's own cache is untouched by a credential test.
    assert!(manager.current().await.is_none());
}

#[test]
fn listing_parses_and_normalizes() {
    let raw = r#"{
        "kind": "Listing",
        "data": {
            "children": [
                {
                    "kind": "t3",
                    "data": {
                        "id": "abc123",
                        "title": "A question about lifetimes",
                        "selftext": "How do I...",
                        "author": "rustacean",
                        "subreddit": "rust",
                        "url": "https://www.reddit.com/r/rust/comments/abc123",
                        "permalink": "/r/rust/comments/abc123",
                        "created_utc": 1700000000.5,
                        "num_comments": 3,
                        "is_self": true
                    }
                }
            ],
            "after": null,
            "before": null
        }
    }"#;

    let listing: Listing = serde_json::from_str(raw).unwrap();
    assert_eq!(listing.kind, "Listing");
    assert_eq!(listing.data.children.len(), 1);

    let post: Post = listing.data.children[0].data.clone().into();
    assert_eq!(post.id, "abc123");
    assert_eq!(post.source_name, "r/rust");
    assert_eq!(post.created_at, 1700000000);
    assert_eq!(post.comment_count, 3);
    assert_eq!(post.content.as_deref(), Some("How do I..."));
}

#[test]
fn listing_defaults_for_sparse_payloads() {
    let raw = r#"{
        "id": "xyz",
        "title": "Link post",
        "author": "someone",
        "subreddit": "programming",
        "url": "https://example.com/article",
        "permalink": "/r/programming/comments/xyz",
        "created_utc": 1700000100.0
    }"#;

    let data: ListingPostData = serde_json::from_str(raw).unwrap();
    let post: Post = data.into();
    assert_eq!(post.comment_count, 0);
    assert!(post.content.is_none());
}

#[test]
fn link_posts_carry_no_content() {
    let data = ListingPostData {
        id: "id1".to_string(),
        title: "title".to_string(),
        selftext: "ignored".to_string(),
        author: "a".to_string(),
        subreddit: "rust".to_string(),
        url: "https://example.com".to_string(),
        permalink: "/r/rust/comments/id1".to_string(),
        created_utc: 100.0,
        num_comments: 0,
        is_self: false,
    };

    let post: Post = data.into();
    assert!(post.content.is_none());
}
