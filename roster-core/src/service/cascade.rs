//! Team deactivation cascade
//!
//! Deactivating a team invalidates every open pull request that one of its
//! members reviews. The cascade deactivates the members, then walks each
//! affected pull request authored inside the team and swaps out every
//! deactivated reviewer for a surviving team member. A slot with no
//! surviving candidate is dropped instead of failing the run.

use tracing::{debug, info};

use super::ReviewService;
use crate::candidates::{build_candidates, ExclusionSet};
use crate::model::{DeactivationReport, OpenPullRequest, ReviewerUpdate, Substitution, TeamMember};
use crate::selector::{select_reviewers, RandomSource};
use crate::store::{ReviewStore, StoreTx};
use crate::Result;

/// Reviewer changes computed for one cascade
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairPlan {
    /// New reviewer list for every pull request that changed
    pub updates: Vec<ReviewerUpdate>,
    /// Successful one-for-one swaps
    pub substitutions: Vec<Substitution>,
}

/// Compute the reviewer repairs for `team` without touching the store.
///
/// Pull requests authored outside `team` are left alone. For each
/// deactivated reviewer the exclusions are the reviewer, the author, the
/// current reviewer list and every replacement already chosen for the same
/// pull request, so one pull request never receives the same replacement
/// twice. The same member may still replace reviewers on different pull
/// requests.
pub fn plan_repairs(
    team: &str,
    deactivated: &ExclusionSet,
    open_pull_requests: &[OpenPullRequest],
    pool: &[TeamMember],
    rng: &dyn RandomSource,
) -> RepairPlan {
    let mut plan = RepairPlan::default();

    for open in open_pull_requests {
        let pr = &open.pull_request;
        if open.author_team != team {
            debug!(
                pull_request_id = %pr.id,
                author_team = %open.author_team,
                "Skipping pull request authored outside the team"
            );
            continue;
        }

        let mut reviewers = Vec::with_capacity(pr.assigned_reviewers.len());
        let mut chosen: Vec<String> = Vec::new();
        let mut changed = false;

        for reviewer in &pr.assigned_reviewers {
            if !deactivated.contains(reviewer) {
                reviewers.push(reviewer.clone());
                continue;
            }
            changed = true;

            let mut exclusions = ExclusionSet::new();
            exclusions
                .insert(reviewer)
                .insert(&pr.author_id)
                .extend(&pr.assigned_reviewers)
                .extend(&chosen);
            let candidates = build_candidates(pool, &exclusions);

            match select_reviewers(&candidates, 1, rng).into_iter().next() {
                Some(replacement) => {
                    plan.substitutions.push(Substitution {
                        pull_request_id: pr.id.clone(),
                        old_reviewer_id: reviewer.clone(),
                        new_reviewer_id: replacement.clone(),
                    });
                    reviewers.push(replacement.clone());
                    chosen.push(replacement);
                }
                None => {
                    debug!(
                        pull_request_id = %pr.id,
                        reviewer = %reviewer,
                        "No candidate left, dropping reviewer slot"
                    );
                }
            }
        }

        if changed {
            plan.updates.push(ReviewerUpdate {
                pull_request_id: pr.id.clone(),
                expected_version: pr.version,
                reviewers,
            });
        }
    }

    plan
}

impl<S: ReviewStore> ReviewService<S> {
    /// Deactivate every active member of `team` and repair the open pull
    /// requests they were reviewing.
    ///
    /// Membership changes and reviewer repairs commit together; a team with
    /// no active members returns an empty report without writing.
    pub async fn deactivate_team(&self, team: &str) -> Result<DeactivationReport> {
        self.with_retry("deactivate_team", || self.try_deactivate_team(team))
            .await
    }

    async fn try_deactivate_team(&self, team: &str) -> Result<DeactivationReport> {
        let mut tx = self.store.begin().await?;

        let deactivated_user_ids = tx.deactivate_all_active(team).await?;
        if deactivated_user_ids.is_empty() {
            debug!(team, "No active members to deactivate");
            return Ok(DeactivationReport::default());
        }

        let open = tx
            .open_pull_requests_referencing_any(&deactivated_user_ids)
            .await?;
        let pool = tx.active_team_members(team, None).await?;

        let deactivated: ExclusionSet = deactivated_user_ids.iter().collect();
        let plan = plan_repairs(team, &deactivated, &open, &pool, self.rng.as_ref());

        if !plan.updates.is_empty() {
            tx.batch_update_reviewers(&plan.updates).await?;
        }
        tx.commit().await?;

        info!(
            team,
            deactivated = deactivated_user_ids.len(),
            affected_pull_requests = plan.updates.len(),
            reassigned = plan.substitutions.len(),
            "Team deactivated"
        );
        Ok(DeactivationReport {
            deactivated_user_ids,
            reassignments: plan.substitutions,
        })
    }
}
