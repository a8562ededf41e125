use redwatch_core::{AppConfig, FilterMode, History, Post, SeenSet};
use std::collections::HashSet;

/// Knobs for the reconcile step, fixed for the lifetime of an
/// orchestrator (rebuilt on config change).
#[derive(Debug, Clone)]
pub struct ReconcilePolicy {
    pub filter: FilterMode,
    pub history_cap: usize,
    pub seen_cap: usize,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            filter: FilterMode::All,
            history_cap: 100,
            seen_cap: 1000,
        }
    }
}

impl ReconcilePolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            filter: config.filter,
            history_cap: config.history_cap,
            seen_cap: config.seen_cap,
        }
    }
}

/// What one cycle's reconcile produced: the genuinely new posts and
/// the updated containers to commit.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub accepted: Vec<Post>,
    pub history: History,
    pub seen: SeenSet,
}

pub fn matches_filter(post: &Post, mode: FilterMode) -> bool {
    match mode {
        FilterMode::All => true,
        FilterMode::ZeroComments => post.comment_count == 0,
    }
}

/// The dedup and filter engine. Pure function of its inputs:
/// 1. the filter predicate drops non-qualifying candidates (applied
///    exactly once, here);
/// 2. in-batch duplicates collapse to the first occurrence, so the
///    earliest-known metadata wins;
/// 3. anything already in the seen set is dropped, which is what makes
///    a post surface as new at most once across cycles;
/// 4. survivors are accepted, folded into history (newest-first,
///    capped) and recorded as seen.
pub fn reconcile(
    candidates: Vec<Post>,
    seen: &SeenSet,
    history: &History,
    policy: &ReconcilePolicy,
) -> Outcome {
    let mut in_batch: HashSet<String> = HashSet::new();
    let mut accepted: Vec<Post> = Vec::new();

    for post in candidates {
        if !matches_filter(&post, policy.filter) {
            continue;
        }
        if !in_batch.insert(post.id.clone()) {
            continue;
        }
        if seen.contains(&post.id) {
            continue;
        }
        accepted.push(post);
    }

    let mut history = history.clone();
    let mut seen = seen.clone();
    if !accepted.is_empty() {
        history.merge(&accepted, policy.history_cap);
        for post in &accepted {
            seen.insert(post.id.clone());
        }
        seen.enforce_cap(policy.seen_cap, &history);
    }

    Outcome {
        accepted,
        history,
        seen,
    }
}
