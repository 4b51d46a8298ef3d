//! Single reviewer replacement

use tracing::info;

use super::ReviewService;
use crate::candidates::{build_candidates, ExclusionSet};
use crate::model::ReassignmentResult;
use crate::selector::select_reviewers;
use crate::store::{ReviewStore, StoreTx};
use crate::{Error, Result};

impl<S: ReviewStore> ReviewService<S> {
    /// Replace `old_reviewer_id` on an open pull request with another active
    /// member of the old reviewer's team.
    ///
    /// Preconditions are checked in order: the pull request exists, it is not
    /// merged, the old reviewer is assigned to it, the old reviewer is a known
    /// user, and at least one candidate remains. Nothing is written unless all
    /// of them hold.
    pub async fn reassign_reviewer(
        &self,
        pull_request_id: &str,
        old_reviewer_id: &str,
    ) -> Result<ReassignmentResult> {
        self.with_retry("reassign_reviewer", || {
            self.try_reassign_reviewer(pull_request_id, old_reviewer_id)
        })
        .await
    }

    async fn try_reassign_reviewer(
        &self,
        pull_request_id: &str,
        old_reviewer_id: &str,
    ) -> Result<ReassignmentResult> {
        let mut tx = self.store.begin().await?;

        let pull_request = tx.get_pull_request(pull_request_id).await?;
        if pull_request.is_merged() {
            return Err(Error::PrMerged(pull_request_id.to_string()));
        }
        if !pull_request.has_reviewer(old_reviewer_id) {
            return Err(Error::NotAssigned {
                pull_request_id: pull_request_id.to_string(),
                user_id: old_reviewer_id.to_string(),
            });
        }

        let old_reviewer = tx.get_user(old_reviewer_id).await?;
        let members = tx
            .active_team_members(&old_reviewer.team_name, Some(old_reviewer_id))
            .await?;

        let mut exclusions = ExclusionSet::new();
        exclusions
            .insert(old_reviewer_id)
            .insert(&pull_request.author_id)
            .extend(&pull_request.assigned_reviewers);
        let candidates = build_candidates(&members, &exclusions);

        let replaced_by = select_reviewers(&candidates, 1, self.rng.as_ref())
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoCandidate(pull_request_id.to_string()))?;

        let reviewers = pull_request.reviewers_with_replacement(old_reviewer_id, &replaced_by);
        let pull_request = tx
            .update_pull_request_reviewers(pull_request_id, pull_request.version, reviewers)
            .await?;
        tx.commit().await?;

        info!(
            pull_request_id,
            old_reviewer_id,
            new_reviewer_id = %replaced_by,
            "Reviewer reassigned"
        );
        Ok(ReassignmentResult {
            pull_request,
            replaced_by,
        })
    }
}
