//! Reviewer assignment service
//!
//! [`ReviewService`] is the entry point used by transports. Every operation
//! runs as a single unit of work on the configured [`ReviewStore`] and is
//! retried from a fresh read when the store reports a concurrent
//! modification.

mod cascade;
mod lifecycle;
mod reassign;

pub use cascade::{plan_repairs, RepairPlan};

use std::future::Future;

use tracing::warn;

use crate::config::ServiceConfig;
use crate::model::{AssignmentStats, PullRequest, TeamMember};
use crate::selector::{RandomSource, ThreadRandom};
use crate::store::{ReviewStore, StoreTx};
use crate::Result;

/// Assigns and reassigns reviewers on top of a store
pub struct ReviewService<S> {
    store: S,
    rng: Box<dyn RandomSource>,
    config: ServiceConfig,
}

impl<S: ReviewStore> ReviewService<S> {
    /// Create a service drawing from thread-local randomness
    pub fn new(store: S, config: ServiceConfig) -> Self {
        Self {
            store,
            rng: Box::new(ThreadRandom),
            config,
        }
    }

    /// Replace the random source used for reviewer selection
    pub fn with_random_source(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    /// Get the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Pull requests the user is assigned to review
    pub async fn reviews_for_user(&self, user_id: &str) -> Result<Vec<PullRequest>> {
        let mut tx = self.store.begin().await?;
        tx.get_user(user_id).await?;
        tx.pull_requests_reviewed_by(user_id).await
    }

    /// Toggle a user's active flag.
    ///
    /// Existing assignments are left untouched; only the team deactivation
    /// cascade repairs reviewer lists.
    pub async fn set_user_active(&self, user_id: &str, active: bool) -> Result<TeamMember> {
        let mut tx = self.store.begin().await?;
        let member = tx.set_user_active(user_id, active).await?;
        tx.commit().await?;
        Ok(member)
    }

    /// Pull request counters and per-reviewer assignment counts
    pub async fn stats(&self) -> Result<AssignmentStats> {
        let mut tx = self.store.begin().await?;
        tx.stats().await
    }

    /// Run `attempt` until it succeeds, fails with a non-conflict error, or
    /// the retry budget is spent.
    async fn with_retry<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Err(e) if e.is_conflict() && retries < self.config.max_conflict_retries => {
                    retries += 1;
                    warn!(operation, retries, error = %e, "Concurrent modification, retrying");
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;

    use crate::config::ServiceConfig;
    use crate::model::{PrStatus, PullRequest, TeamMember};
    use crate::selector::tests::ScriptedRandom;
    use crate::store::MemoryStore;

    use super::ReviewService;

    pub(crate) fn member(id: &str, team: &str) -> TeamMember {
        TeamMember::new(id, format!("user-{}", id), team)
    }

    pub(crate) fn open_pr(id: &str, author: &str, reviewers: &[&str]) -> PullRequest {
        PullRequest {
            id: id.into(),
            name: format!("PR {}", id),
            author_id: author.into(),
            status: PrStatus::Open,
            assigned_reviewers: reviewers.iter().map(|r| r.to_string()).collect(),
            created_at: Utc::now(),
            merged_at: None,
            version: 0,
        }
    }

    /// Store with one team holding the given active members
    pub(crate) async fn store_with_team(team: &str, ids: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .upsert_team(team, ids.iter().map(|id| member(id, team)).collect())
            .await;
        store
    }

    pub(crate) fn service(store: MemoryStore, picks: &[usize]) -> ReviewService<MemoryStore> {
        ReviewService::new(store, ServiceConfig::default())
            .with_random_source(Box::new(ScriptedRandom::new(picks)))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use crate::Error;

    #[tokio::test]
    async fn test_reviews_for_user() {
        let store = store_with_team("backend", &["a", "b", "c"]).await;
        store.insert_pull_request(open_pr("pr-1", "a", &["b", "c"])).await;
        store.insert_pull_request(open_pr("pr-2", "a", &["c"])).await;
        let service = service(store, &[]);

        let reviews = service.reviews_for_user("b").await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].id, "pr-1");
        assert_eq!(service.reviews_for_user("c").await.unwrap().len(), 2);
        assert!(matches!(
            service.reviews_for_user("nobody").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_set_user_active_leaves_assignments() {
        let store = store_with_team("backend", &["a", "b"]).await;
        store.insert_pull_request(open_pr("pr-1", "a", &["b"])).await;
        let service = service(store.clone(), &[]);

        let member = service.set_user_active("b", false).await.unwrap();
        assert!(!member.is_active);
        assert_eq!(
            store.pull_request("pr-1").await.unwrap().assigned_reviewers,
            vec!["b"]
        );
        assert!(matches!(
            service.set_user_active("zed", true).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stats() {
        let store = store_with_team("backend", &["a", "b", "c"]).await;
        store.insert_pull_request(open_pr("pr-1", "a", &["b", "c"])).await;
        store.insert_pull_request(open_pr("pr-2", "b", &["c"])).await;
        let service = service(store, &[]);
        service.merge_pull_request("pr-2").await.unwrap();

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.pull_requests.total, 2);
        assert_eq!(stats.pull_requests.open, 1);
        assert_eq!(stats.pull_requests.merged, 1);
        assert_eq!(stats.reviewers[0].user_id, "c");
        assert_eq!(stats.reviewers[0].assignments, 2);
        assert_eq!(stats.reviewers[1].user_id, "b");
    }
}
