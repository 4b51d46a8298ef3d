//! Pull request creation and merge

use chrono::Utc;
use tracing::{debug, info};

use super::ReviewService;
use crate::candidates::{build_candidates, ExclusionSet};
use crate::model::{NewPullRequest, PullRequest, MAX_REVIEWERS};
use crate::selector::select_reviewers;
use crate::store::{ReviewStore, StoreTx};
use crate::{Error, Result};

impl<S: ReviewStore> ReviewService<S> {
    /// Open a pull request and assign up to two reviewers from the author's team.
    ///
    /// Fails with `AlreadyExists` if the id is taken and `NotFound` if the
    /// author is unknown. A team with no other active members yields a pull
    /// request with no reviewers.
    pub async fn create_pull_request(
        &self,
        author_id: &str,
        pull_request_id: &str,
        name: &str,
    ) -> Result<PullRequest> {
        self.with_retry("create_pull_request", || {
            self.try_create_pull_request(author_id, pull_request_id, name)
        })
        .await
    }

    async fn try_create_pull_request(
        &self,
        author_id: &str,
        pull_request_id: &str,
        name: &str,
    ) -> Result<PullRequest> {
        let mut tx = self.store.begin().await?;

        if tx.pr_exists(pull_request_id).await? {
            return Err(Error::AlreadyExists(pull_request_id.to_string()));
        }

        let author = tx.get_user(author_id).await?;
        let members = tx
            .active_team_members(&author.team_name, Some(author_id))
            .await?;

        let mut exclusions = ExclusionSet::new();
        exclusions.insert(author_id);
        let candidates = build_candidates(&members, &exclusions);
        let reviewers = select_reviewers(&candidates, MAX_REVIEWERS, self.rng.as_ref());
        debug!(
            pull_request_id,
            team = %author.team_name,
            candidates = candidates.len(),
            "Selected reviewers"
        );

        let pull_request = tx
            .create_pull_request(NewPullRequest {
                id: pull_request_id.to_string(),
                name: name.to_string(),
                author_id: author_id.to_string(),
                assigned_reviewers: reviewers,
                created_at: Utc::now(),
            })
            .await?;
        tx.commit().await?;

        info!(
            pull_request_id,
            author_id,
            reviewers = ?pull_request.assigned_reviewers,
            "Pull request created"
        );
        Ok(pull_request)
    }

    /// Mark a pull request as merged.
    ///
    /// Merging an already merged pull request returns it unchanged without
    /// writing anything.
    pub async fn merge_pull_request(&self, pull_request_id: &str) -> Result<PullRequest> {
        self.with_retry("merge_pull_request", || {
            self.try_merge_pull_request(pull_request_id)
        })
        .await
    }

    async fn try_merge_pull_request(&self, pull_request_id: &str) -> Result<PullRequest> {
        let mut tx = self.store.begin().await?;
        let current = tx.get_pull_request(pull_request_id).await?;
        if current.is_merged() {
            debug!(pull_request_id, "Already merged");
            return Ok(current);
        }

        let merged = tx
            .mark_merged(pull_request_id, current.version, Utc::now())
            .await?;
        tx.commit().await?;

        info!(pull_request_id, "Pull request merged");
        Ok(merged)
    }
}
