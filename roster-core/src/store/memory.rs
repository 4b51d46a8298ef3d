//! In-memory implementation of [`ReviewStore`].
//!
//! A transaction holds the store lock for its whole lifetime and works on a
//! staged copy of the state, so units of work are fully serialized and an
//! uncommitted transaction leaves nothing behind. All state is lost on drop.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{ReviewStore, StoreTx};
use crate::model::{
    AssignmentStats, NewPullRequest, OpenPullRequest, PrCounts, PrStatus, PullRequest,
    ReviewerLoad, ReviewerUpdate, TeamMember,
};
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    teams: BTreeSet<String>,
    users: BTreeMap<String, TeamMember>,
    pull_requests: BTreeMap<String, PullRequest>,
    /// Committed write statements
    writes: usize,
    /// Version-checked writes still to be rejected
    pending_conflicts: usize,
}

/// In-memory store for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the team if missing and insert or replace its members
    pub async fn upsert_team(&self, team: &str, members: Vec<TeamMember>) {
        let mut state = self.state.lock().await;
        state.teams.insert(team.to_string());
        for mut member in members {
            member.team_name = team.to_string();
            state.users.insert(member.user_id.clone(), member);
        }
    }

    /// Insert a pull request as-is, bypassing reviewer selection
    pub async fn insert_pull_request(&self, pull_request: PullRequest) {
        let mut state = self.state.lock().await;
        state
            .pull_requests
            .insert(pull_request.id.clone(), pull_request);
    }

    pub async fn pull_request(&self, id: &str) -> Option<PullRequest> {
        self.state.lock().await.pull_requests.get(id).cloned()
    }

    pub async fn member(&self, user_id: &str) -> Option<TeamMember> {
        self.state.lock().await.users.get(user_id).cloned()
    }

    /// Number of write statements committed so far
    pub async fn write_count(&self) -> usize {
        self.state.lock().await.writes
    }

    /// Reject the next `count` version-checked writes with a conflict
    pub async fn simulate_conflicts(&self, count: usize) {
        self.state.lock().await.pending_conflicts = count;
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx { guard, staged })
    }
}

/// Unit of work over a [`MemoryStore`]
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

impl MemoryTx {
    fn user(&self, user_id: &str) -> Result<&TeamMember> {
        self.staged
            .users
            .get(user_id)
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))
    }

    fn pull_request_mut(&mut self, id: &str) -> Result<&mut PullRequest> {
        self.staged
            .pull_requests
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("pull request {}", id)))
    }

    /// Version check shared by every guarded write
    fn check_version(&mut self, id: &str, expected_version: i64) -> Result<()> {
        if self.guard.pending_conflicts > 0 {
            self.guard.pending_conflicts -= 1;
            return Err(Error::Conflict(format!("pull request {}", id)));
        }
        let current = self.pull_request_mut(id)?.version;
        if current != expected_version {
            return Err(Error::Conflict(format!(
                "pull request {} is at version {}, expected {}",
                id, current, expected_version
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn active_team_members(
        &mut self,
        team: &str,
        exclude: Option<&str>,
    ) -> Result<Vec<TeamMember>> {
        Ok(self
            .staged
            .users
            .values()
            .filter(|u| u.team_name == team && u.is_active)
            .filter(|u| exclude != Some(u.user_id.as_str()))
            .cloned()
            .collect())
    }

    async fn get_user(&mut self, user_id: &str) -> Result<TeamMember> {
        self.user(user_id).cloned()
    }

    async fn pr_exists(&mut self, pull_request_id: &str) -> Result<bool> {
        Ok(self.staged.pull_requests.contains_key(pull_request_id))
    }

    async fn get_pull_request(&mut self, pull_request_id: &str) -> Result<PullRequest> {
        self.pull_request_mut(pull_request_id).map(|pr| pr.clone())
    }

    async fn create_pull_request(&mut self, new: NewPullRequest) -> Result<PullRequest> {
        if self.staged.pull_requests.contains_key(&new.id) {
            return Err(Error::AlreadyExists(new.id));
        }
        // Mirrors the foreign key on author_id
        self.user(&new.author_id)?;

        let pull_request = PullRequest {
            id: new.id.clone(),
            name: new.name,
            author_id: new.author_id,
            status: PrStatus::Open,
            assigned_reviewers: new.assigned_reviewers,
            created_at: new.created_at,
            merged_at: None,
            version: 0,
        };
        self.staged
            .pull_requests
            .insert(new.id, pull_request.clone());
        self.staged.writes += 1;
        Ok(pull_request)
    }

    async fn update_pull_request_reviewers(
        &mut self,
        pull_request_id: &str,
        expected_version: i64,
        reviewers: Vec<String>,
    ) -> Result<PullRequest> {
        self.check_version(pull_request_id, expected_version)?;
        self.staged.writes += 1;
        let pr = self.pull_request_mut(pull_request_id)?;
        pr.assigned_reviewers = reviewers;
        pr.version += 1;
        Ok(pr.clone())
    }

    async fn mark_merged(
        &mut self,
        pull_request_id: &str,
        expected_version: i64,
        merged_at: DateTime<Utc>,
    ) -> Result<PullRequest> {
        self.check_version(pull_request_id, expected_version)?;
        self.staged.writes += 1;
        let pr = self.pull_request_mut(pull_request_id)?;
        pr.status = PrStatus::Merged;
        pr.merged_at = Some(merged_at);
        pr.version += 1;
        Ok(pr.clone())
    }

    async fn open_pull_requests_referencing_any(
        &mut self,
        reviewer_ids: &[String],
    ) -> Result<Vec<OpenPullRequest>> {
        let wanted: BTreeSet<&str> = reviewer_ids.iter().map(String::as_str).collect();
        let mut open = Vec::new();
        for pr in self.staged.pull_requests.values() {
            if pr.status != PrStatus::Open
                || !pr.assigned_reviewers.iter().any(|r| wanted.contains(r.as_str()))
            {
                continue;
            }
            // Inner join semantics: PRs without a known author are not returned
            if let Some(author) = self.staged.users.get(&pr.author_id) {
                open.push(OpenPullRequest {
                    pull_request: pr.clone(),
                    author_team: author.team_name.clone(),
                });
            }
        }
        Ok(open)
    }

    async fn deactivate_all_active(&mut self, team: &str) -> Result<Vec<String>> {
        let mut deactivated = Vec::new();
        for user in self.staged.users.values_mut() {
            if user.team_name == team && user.is_active {
                user.is_active = false;
                deactivated.push(user.user_id.clone());
            }
        }
        if !deactivated.is_empty() {
            self.staged.writes += 1;
        }
        Ok(deactivated)
    }

    async fn batch_update_reviewers(&mut self, updates: &[ReviewerUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        for update in updates {
            self.check_version(&update.pull_request_id, update.expected_version)?;
        }
        for update in updates {
            let pr = self.pull_request_mut(&update.pull_request_id)?;
            pr.assigned_reviewers = update.reviewers.clone();
            pr.version += 1;
        }
        self.staged.writes += 1;
        Ok(())
    }

    async fn set_user_active(&mut self, user_id: &str, active: bool) -> Result<TeamMember> {
        let user = self
            .staged
            .users
            .get_mut(user_id)
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))?;
        user.is_active = active;
        let user = user.clone();
        self.staged.writes += 1;
        Ok(user)
    }

    async fn pull_requests_reviewed_by(&mut self, user_id: &str) -> Result<Vec<PullRequest>> {
        Ok(self
            .staged
            .pull_requests
            .values()
            .filter(|pr| pr.has_reviewer(user_id))
            .cloned()
            .collect())
    }

    async fn stats(&mut self) -> Result<AssignmentStats> {
        let mut counts = PrCounts::default();
        let mut loads: BTreeMap<&str, i64> = BTreeMap::new();
        for pr in self.staged.pull_requests.values() {
            counts.total += 1;
            match pr.status {
                PrStatus::Open => counts.open += 1,
                PrStatus::Merged => counts.merged += 1,
            }
            for reviewer in &pr.assigned_reviewers {
                *loads.entry(reviewer.as_str()).or_default() += 1;
            }
        }

        let mut reviewers: Vec<ReviewerLoad> = loads
            .into_iter()
            .filter_map(|(user_id, assignments)| {
                let user = self.staged.users.get(user_id)?;
                user.is_active.then(|| ReviewerLoad {
                    user_id: user.user_id.clone(),
                    username: user.username.clone(),
                    team_name: user.team_name.clone(),
                    assignments,
                })
            })
            .collect();
        reviewers.sort_by(|a, b| {
            b.assignments
                .cmp(&a.assignments)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        Ok(AssignmentStats {
            pull_requests: counts,
            reviewers,
        })
    }

    async fn commit(self) -> Result<()> {
        let MemoryTx { mut guard, staged } = self;
        // Conflict budget lives on the committed state, not the staged copy
        let pending_conflicts = guard.pending_conflicts;
        *guard = staged;
        guard.pending_conflicts = pending_conflicts;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .upsert_team(
                "backend",
                vec![
                    TeamMember::new("a", "alice", "backend"),
                    TeamMember::new("b", "bob", "backend"),
                    TeamMember::new("c", "carol", "backend").inactive(),
                ],
            )
            .await;
        store
    }

    fn new_pr(id: &str, reviewers: &[&str]) -> NewPullRequest {
        NewPullRequest {
            id: id.into(),
            name: format!("PR {}", id),
            author_id: "a".into(),
            assigned_reviewers: reviewers.iter().map(|r| r.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_uncommitted_writes_discarded() {
        let store = seeded().await;
        {
            let mut tx = store.begin().await.unwrap();
            tx.create_pull_request(new_pr("pr-1", &["b"])).await.unwrap();
            assert!(tx.pr_exists("pr-1").await.unwrap());
        }
        assert!(store.pull_request("pr-1").await.is_none());
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();
        tx.create_pull_request(new_pr("pr-1", &["b"])).await.unwrap();
        tx.commit().await.unwrap();

        let pr = store.pull_request("pr-1").await.unwrap();
        assert_eq!(pr.status, PrStatus::Open);
        assert_eq!(pr.version, 0);
        assert_eq!(store.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_active_members_excludes() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let members = tx.active_team_members("backend", Some("a")).await.unwrap();
        let ids: Vec<_> = members.iter().map(|m| m.user_id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();
        tx.create_pull_request(new_pr("pr-1", &["b"])).await.unwrap();
        tx.update_pull_request_reviewers("pr-1", 0, vec!["a".into()])
            .await
            .unwrap();
        let err = tx
            .update_pull_request_reviewers("pr-1", 0, vec!["b".into()])
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();
        tx.create_pull_request(new_pr("pr-1", &["b"])).await.unwrap();
        tx.create_pull_request(new_pr("pr-2", &["b"])).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let updates = vec![
            ReviewerUpdate {
                pull_request_id: "pr-1".into(),
                expected_version: 0,
                reviewers: vec![],
            },
            ReviewerUpdate {
                pull_request_id: "pr-2".into(),
                expected_version: 5,
                reviewers: vec![],
            },
        ];
        assert!(tx.batch_update_reviewers(&updates).await.is_err());
        let pr = tx.get_pull_request("pr-1").await.unwrap();
        assert_eq!(pr.assigned_reviewers, vec!["b"]);
    }

    #[tokio::test]
    async fn test_open_prs_referencing_any() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();
        tx.create_pull_request(new_pr("pr-1", &["b"])).await.unwrap();
        tx.create_pull_request(new_pr("pr-2", &["c"])).await.unwrap();
        tx.create_pull_request(new_pr("pr-3", &["b"])).await.unwrap();
        tx.mark_merged("pr-3", 0, Utc::now()).await.unwrap();

        let open = tx
            .open_pull_requests_referencing_any(&["b".to_string()])
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].pull_request.id, "pr-1");
        assert_eq!(open[0].author_team, "backend");
    }

    #[tokio::test]
    async fn test_deactivate_all_active() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let ids = tx.deactivate_all_active("backend").await.unwrap();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(tx.deactivate_all_active("backend").await.unwrap().is_empty());
        tx.commit().await.unwrap();
        assert!(!store.member("a").await.unwrap().is_active);
    }
}
