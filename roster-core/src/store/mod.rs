//! Persistence contract for the assignment engine.
//!
//! The service never talks to a database directly. Each public operation
//! opens one [`StoreTx`] through [`ReviewStore::begin`], performs its reads
//! and writes on it, and calls [`StoreTx::commit`] only on success. Dropping
//! a transaction without committing discards every write made through it.
//!
//! Reviewer-list and status writes carry the `version` they were computed
//! from and fail with [`Error::Conflict`](crate::Error::Conflict) when the
//! row has moved on.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{
    AssignmentStats, NewPullRequest, OpenPullRequest, PullRequest, ReviewerUpdate, TeamMember,
};
use crate::Result;

/// Backend that can open units of work
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Transaction type handed out by this store
    type Tx: StoreTx;

    /// Start a unit of work
    async fn begin(&self) -> Result<Self::Tx>;
}

/// Operations available inside one unit of work
#[async_trait]
pub trait StoreTx: Send {
    /// Active members of `team`, ordered by user id, without `exclude`
    async fn active_team_members(
        &mut self,
        team: &str,
        exclude: Option<&str>,
    ) -> Result<Vec<TeamMember>>;

    /// Look up a user, `NotFound` if unknown
    async fn get_user(&mut self, user_id: &str) -> Result<TeamMember>;

    async fn pr_exists(&mut self, pull_request_id: &str) -> Result<bool>;

    /// Look up a pull request, `NotFound` if unknown
    async fn get_pull_request(&mut self, pull_request_id: &str) -> Result<PullRequest>;

    /// Insert an OPEN pull request, `AlreadyExists` on a duplicate id
    async fn create_pull_request(&mut self, pull_request: NewPullRequest) -> Result<PullRequest>;

    /// Replace the reviewer list if the row is still at `expected_version`
    async fn update_pull_request_reviewers(
        &mut self,
        pull_request_id: &str,
        expected_version: i64,
        reviewers: Vec<String>,
    ) -> Result<PullRequest>;

    /// Transition to MERGED if the row is still at `expected_version`
    async fn mark_merged(
        &mut self,
        pull_request_id: &str,
        expected_version: i64,
        merged_at: DateTime<Utc>,
    ) -> Result<PullRequest>;

    /// OPEN pull requests whose reviewers intersect `reviewer_ids`, ordered by id
    async fn open_pull_requests_referencing_any(
        &mut self,
        reviewer_ids: &[String],
    ) -> Result<Vec<OpenPullRequest>>;

    /// Deactivate every active member of `team` and return their ids, sorted
    async fn deactivate_all_active(&mut self, team: &str) -> Result<Vec<String>>;

    /// Apply all reviewer updates or none of them
    async fn batch_update_reviewers(&mut self, updates: &[ReviewerUpdate]) -> Result<()>;

    /// Set a user's active flag, `NotFound` if unknown
    async fn set_user_active(&mut self, user_id: &str, active: bool) -> Result<TeamMember>;

    /// Pull requests where `user_id` is an assigned reviewer, ordered by id
    async fn pull_requests_reviewed_by(&mut self, user_id: &str) -> Result<Vec<PullRequest>>;

    async fn stats(&mut self) -> Result<AssignmentStats>;

    /// Make every write of this unit of work durable
    async fn commit(self) -> Result<()>;
}
