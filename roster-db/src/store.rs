//! SQLite implementation of the review store contract

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roster_core::{
    AssignmentStats, NewPullRequest, OpenPullRequest, PrCounts, PrStatus, PullRequest,
    ReviewStore, ReviewerLoad, ReviewerUpdate, StoreTx, TeamMember,
};
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use crate::error::Error;
use crate::schema::{convert_all, OpenPullRequestRow, PullRequestRow, UserRow};
use crate::SqliteStore;

type CoreResult<T> = roster_core::Result<T>;

#[async_trait]
impl ReviewStore for SqliteStore {
    type Tx = SqliteTx;

    async fn begin(&self) -> CoreResult<SqliteTx> {
        let tx = self.pool().begin().await.map_err(Error::from)?;
        Ok(SqliteTx { tx })
    }
}

/// Unit of work backed by a SQLite transaction.
///
/// Dropping it without calling [`StoreTx::commit`] rolls back.
pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

impl SqliteTx {
    async fn fetch_pull_request(&mut self, id: &str) -> CoreResult<Option<PullRequest>> {
        let row = sqlx::query_as::<_, PullRequestRow>(
            "SELECT * FROM pull_requests WHERE pull_request_id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(Error::from)?;

        Ok(row.map(PullRequest::try_from).transpose()?)
    }

    /// Turn a guarded write that matched no row into `NotFound` or `Conflict`
    async fn guard_failure(&mut self, id: &str, expected_version: i64) -> roster_core::Error {
        match self.fetch_pull_request(id).await {
            Ok(Some(current)) => roster_core::Error::Conflict(format!(
                "pull request {} is at version {}, expected {}",
                id, current.version, expected_version
            )),
            Ok(None) => roster_core::Error::NotFound(format!("pull request {}", id)),
            Err(e) => e,
        }
    }

    async fn write_reviewers(
        &mut self,
        id: &str,
        expected_version: i64,
        reviewers: &[String],
    ) -> CoreResult<()> {
        let reviewers_json = serde_json::to_string(reviewers).map_err(Error::from)?;
        let result = sqlx::query(
            r#"
            UPDATE pull_requests
            SET assigned_reviewers = ?, version = version + 1
            WHERE pull_request_id = ? AND version = ?
            "#,
        )
        .bind(&reviewers_json)
        .bind(id)
        .bind(expected_version)
        .execute(&mut *self.tx)
        .await
        .map_err(Error::from)?;

        if result.rows_affected() == 0 {
            return Err(self.guard_failure(id, expected_version).await);
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn active_team_members(
        &mut self,
        team: &str,
        exclude: Option<&str>,
    ) -> CoreResult<Vec<TeamMember>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, username, team_name, is_active
            FROM users
            WHERE team_name = ? AND is_active = 1 AND (? IS NULL OR user_id != ?)
            ORDER BY user_id
            "#,
        )
        .bind(team)
        .bind(exclude)
        .bind(exclude)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(Error::from)?;

        Ok(rows.into_iter().map(TeamMember::from).collect())
    }

    async fn get_user(&mut self, user_id: &str) -> CoreResult<TeamMember> {
        sqlx::query_as::<_, UserRow>(
            "SELECT user_id, username, team_name, is_active FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(Error::from)?
        .map(TeamMember::from)
        .ok_or_else(|| roster_core::Error::NotFound(format!("user {}", user_id)))
    }

    async fn pr_exists(&mut self, pull_request_id: &str) -> CoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM pull_requests WHERE pull_request_id = ?)",
        )
        .bind(pull_request_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(Error::from)?;
        Ok(exists)
    }

    async fn get_pull_request(&mut self, pull_request_id: &str) -> CoreResult<PullRequest> {
        self.fetch_pull_request(pull_request_id).await?.ok_or_else(|| {
            roster_core::Error::NotFound(format!("pull request {}", pull_request_id))
        })
    }

    async fn create_pull_request(&mut self, new: NewPullRequest) -> CoreResult<PullRequest> {
        let reviewers_json = serde_json::to_string(&new.assigned_reviewers).map_err(Error::from)?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO pull_requests (
                pull_request_id, pull_request_name, author_id, status,
                assigned_reviewers, created_at, merged_at, version
            )
            VALUES (?, ?, ?, ?, ?, ?, NULL, 0)
            "#,
        )
        .bind(&new.id)
        .bind(&new.name)
        .bind(&new.author_id)
        .bind(PrStatus::Open.as_str())
        .bind(&reviewers_json)
        .bind(new.created_at)
        .execute(&mut *self.tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(roster_core::Error::AlreadyExists(new.id));
            }
            Err(e) => return Err(Error::from(e).into()),
        }

        Ok(PullRequest {
            id: new.id,
            name: new.name,
            author_id: new.author_id,
            status: PrStatus::Open,
            assigned_reviewers: new.assigned_reviewers,
            created_at: new.created_at,
            merged_at: None,
            version: 0,
        })
    }

    async fn update_pull_request_reviewers(
        &mut self,
        pull_request_id: &str,
        expected_version: i64,
        reviewers: Vec<String>,
    ) -> CoreResult<PullRequest> {
        self.write_reviewers(pull_request_id, expected_version, &reviewers)
            .await?;
        self.get_pull_request(pull_request_id).await
    }

    async fn mark_merged(
        &mut self,
        pull_request_id: &str,
        expected_version: i64,
        merged_at: DateTime<Utc>,
    ) -> CoreResult<PullRequest> {
        let result = sqlx::query(
            r#"
            UPDATE pull_requests
            SET status = 'MERGED', merged_at = ?, version = version + 1
            WHERE pull_request_id = ? AND version = ? AND status = 'OPEN'
            "#,
        )
        .bind(merged_at)
        .bind(pull_request_id)
        .bind(expected_version)
        .execute(&mut *self.tx)
        .await
        .map_err(Error::from)?;

        if result.rows_affected() == 0 {
            return Err(self.guard_failure(pull_request_id, expected_version).await);
        }
        self.get_pull_request(pull_request_id).await
    }

    async fn open_pull_requests_referencing_any(
        &mut self,
        reviewer_ids: &[String],
    ) -> CoreResult<Vec<OpenPullRequest>> {
        if reviewer_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids_json = serde_json::to_string(reviewer_ids).map_err(Error::from)?;

        let rows = sqlx::query_as::<_, OpenPullRequestRow>(
            r#"
            SELECT pr.*, u.team_name AS author_team
            FROM pull_requests pr
            INNER JOIN users u ON pr.author_id = u.user_id
            WHERE pr.status = 'OPEN'
              AND EXISTS (
                  SELECT 1 FROM json_each(pr.assigned_reviewers) r
                  WHERE r.value IN (SELECT value FROM json_each(?))
              )
            ORDER BY pr.pull_request_id
            "#,
        )
        .bind(&ids_json)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(Error::from)?;

        Ok(convert_all(rows)?)
    }

    async fn deactivate_all_active(&mut self, team: &str) -> CoreResult<Vec<String>> {
        let mut ids = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE users
            SET is_active = 0
            WHERE team_name = ? AND is_active = 1
            RETURNING user_id
            "#,
        )
        .bind(team)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(Error::from)?;

        ids.sort();
        debug!(team, count = ids.len(), "Deactivated team members");
        Ok(ids)
    }

    async fn batch_update_reviewers(&mut self, updates: &[ReviewerUpdate]) -> CoreResult<()> {
        // A failed entry aborts the whole unit of work, so earlier rows never commit
        for update in updates {
            self.write_reviewers(
                &update.pull_request_id,
                update.expected_version,
                &update.reviewers,
            )
            .await?;
        }
        Ok(())
    }

    async fn set_user_active(&mut self, user_id: &str, active: bool) -> CoreResult<TeamMember> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE user_id = ?")
            .bind(active)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(Error::from)?;

        if result.rows_affected() == 0 {
            return Err(roster_core::Error::NotFound(format!("user {}", user_id)));
        }
        self.get_user(user_id).await
    }

    async fn pull_requests_reviewed_by(&mut self, user_id: &str) -> CoreResult<Vec<PullRequest>> {
        let rows = sqlx::query_as::<_, PullRequestRow>(
            r#"
            SELECT * FROM pull_requests
            WHERE EXISTS (
                SELECT 1 FROM json_each(pull_requests.assigned_reviewers) WHERE value = ?
            )
            ORDER BY pull_request_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(Error::from)?;

        Ok(convert_all(rows)?)
    }

    async fn stats(&mut self) -> CoreResult<AssignmentStats> {
        let (total, open, merged) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(status = 'OPEN'), 0),
                COALESCE(SUM(status = 'MERGED'), 0)
            FROM pull_requests
            "#,
        )
        .fetch_one(&mut *self.tx)
        .await
        .map_err(Error::from)?;

        let loads = sqlx::query_as::<_, (String, String, String, i64)>(
            r#"
            SELECT u.user_id, u.username, u.team_name, COUNT(*) AS assignments
            FROM pull_requests pr
            JOIN json_each(pr.assigned_reviewers) r
            JOIN users u ON u.user_id = r.value
            WHERE u.is_active = 1
            GROUP BY u.user_id, u.username, u.team_name
            ORDER BY assignments DESC, u.user_id
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(Error::from)?;

        Ok(AssignmentStats {
            pull_requests: PrCounts {
                total,
                open,
                merged,
            },
            reviewers: loads
                .into_iter()
                .map(|(user_id, username, team_name, assignments)| ReviewerLoad {
                    user_id,
                    username,
                    team_name,
                    assignments,
                })
                .collect(),
        })
    }

    async fn commit(self) -> CoreResult<()> {
        self.tx.commit().await.map_err(Error::from)?;
        Ok(())
    }
}
