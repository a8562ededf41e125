use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Credentials for the password-grant token exchange. All four fields
/// must be present for the set to be usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty()
            && !self.client_secret.is_empty()
            && !self.username.is_empty()
            && !self.password.is_empty()
    }
}

/// An access token and its expiry. Never mutated, only replaced
/// wholesale by the token manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }
}

/// One configured feed endpoint to poll, e.g. a subreddit's /new
/// listing. Order of the configured set is preserved for iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub url: String,
}

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Human-readable name for status messages, derived from the
    /// `/r/<name>/` path segment when present.
    pub fn display_name(&self) -> String {
        if let Some(idx) = self.url.find("/r/") {
            let rest = &self.url[idx + 3..];
            let name = rest.split('/').next().unwrap_or(rest);
            if !name.is_empty() {
                return format!("r/{name}");
            }
        }
        self.url.clone()
    }
}

/// A normalized feed item. Identity is `id`; immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub author: String,
    pub source_name: String,
    pub url: String,
    pub permalink: String,
    /// Creation time as reported upstream, epoch seconds.
    pub created_at: i64,
    pub comment_count: u32,
    pub content: Option<String>,
}

/// Which candidates qualify for acceptance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Every fetched post qualifies.
    #[default]
    All,
    /// Only posts nobody has commented on yet.
    ZeroComments,
}

/// Insertion-ordered set of every post id ever accepted. Guards the
/// at-most-once notification guarantee across cycles, even after a
/// post ages out of [`History`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SeenSet {
    order: VecDeque<String>,
    index: HashSet<String>,
}

impl SeenSet {
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Returns false if the id was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if !self.index.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);
        true
    }

    /// Evicts oldest-first down to `cap`, skipping ids still present
    /// in `history` so a post visible in the list cannot be
    /// re-admitted and re-notified later.
    pub fn enforce_cap(&mut self, cap: usize, history: &History) {
        while self.order.len() > cap {
            let victim = self
                .order
                .iter()
                .position(|id| !history.contains(id));
            match victim {
                Some(pos) => {
                    if let Some(id) = self.order.remove(pos) {
                        self.index.remove(&id);
                    }
                }
                // Everything left is still on display; allow overflow.
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl From<Vec<String>> for SeenSet {
    fn from(ids: Vec<String>) -> Self {
        let mut set = SeenSet::default();
        for id in ids {
            set.insert(id);
        }
        set
    }
}

impl From<SeenSet> for Vec<String> {
    fn from(set: SeenSet) -> Self {
        set.order.into()
    }
}

/// Bounded list of accepted posts, newest-first by `created_at`.
/// Mutated only by the reconcile step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    posts: Vec<Post>,
}

impl History {
    pub fn contains(&self, id: &str) -> bool {
        self.posts.iter().any(|p| p.id == id)
    }

    /// Folds newly accepted posts in, re-sorts newest-first and
    /// truncates to `cap` (oldest entries evicted first).
    pub fn merge(&mut self, accepted: &[Post], cap: usize) {
        self.posts.extend_from_slice(accepted);
        self.posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.posts.truncate(cap);
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn post(id: &str, created_at: i64) -> Post {
        Post {
            id: id.to_string(),
            title: format!("post {id}"),
            author: "someone".to_string(),
            source_name: "r/rust".to_string(),
            url: format!("https://example.com/{id}"),
            permalink: format!("/r/rust/comments/{id}"),
            created_at,
            comment_count: 0,
            content: None,
        }
    }

    #[test]
    fn credentials_completeness() {
        let mut creds = Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            username: "user".to_string(),
            password: "pass".to_string(),
        };
        assert!(creds.is_complete());

        creds.password.clear();
        assert!(!creds.is_complete());
        assert!(!Credentials::default().is_complete());
    }

    #[test]
    fn token_usability_is_strict_expiry() {
        let now = Utc::now();
        let token = Token {
            access_token: "abc".to_string(),
            expires_at: now + Duration::seconds(10),
        };
        assert!(token.is_usable_at(now));
        assert!(!token.is_usable_at(now + Duration::seconds(10)));
        assert!(!token.is_usable_at(now + Duration::seconds(11)));
    }

    #[test]
    fn source_display_name_from_path() {
        let source = FeedSource::new("https://oauth.reddit.com/r/rust/new.json?limit=25");
        assert_eq!(source.display_name(), "r/rust");

        let bare = FeedSource::new("https://example.com/feed");
        assert_eq!(bare.display_name(), "https://example.com/feed");
    }

    #[test]
    fn seen_set_dedupes_and_keeps_order() {
        let mut seen = SeenSet::default();
        assert!(seen.insert("a"));
        assert!(seen.insert("b"));
        assert!(!seen.insert("a"));
        assert_eq!(seen.len(), 2);
        assert!(seen.contains("a"));
        assert!(!seen.contains("c"));

        let ids: Vec<String> = seen.into();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn seen_set_eviction_skips_ids_in_history() {
        let mut history = History::default();
        history.merge(&[post("a", 100)], 10);

        let mut seen = SeenSet::default();
        for id in ["a", "b", "c", "d"] {
            seen.insert(id);
        }

        seen.enforce_cap(2, &history);
        assert_eq!(seen.len(), 2);
        // "a" survives despite being oldest because it is still listed
        assert!(seen.contains("a"));
        assert!(seen.contains("d"));
        assert!(!seen.contains("b"));
        assert!(!seen.contains("c"));
    }

    #[test]
    fn seen_set_overflows_rather_than_evicting_displayed_ids() {
        let mut history = History::default();
        history.merge(&[post("a", 100), post("b", 90)], 10);

        let mut seen = SeenSet::default();
        seen.insert("a");
        seen.insert("b");
        seen.enforce_cap(1, &history);
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn seen_set_roundtrips_through_serde() {
        let mut seen = SeenSet::default();
        seen.insert("x");
        seen.insert("y");

        let json = serde_json::to_string(&seen).unwrap();
        let back: SeenSet = serde_json::from_str(&json).unwrap();
        assert!(back.contains("x"));
        assert!(back.contains("y"));
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn history_sorts_newest_first_and_caps() {
        let mut history = History::default();
        history.merge(&[post("old", 50), post("new", 150)], 3);
        history.merge(&[post("mid", 100), post("ancient", 10)], 3);

        let ids: Vec<&str> = history.posts().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
        assert!(!history.contains("ancient"));
    }
}
