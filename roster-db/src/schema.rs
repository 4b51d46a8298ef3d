//! Row types and their mapping onto the domain model

use chrono::{DateTime, Utc};
use roster_core::{OpenPullRequest, PrStatus, PullRequest, TeamMember};

use crate::error::{Error, Result};

/// Row of the `users` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

impl From<UserRow> for TeamMember {
    fn from(row: UserRow) -> Self {
        TeamMember {
            user_id: row.user_id,
            username: row.username,
            team_name: row.team_name,
            is_active: row.is_active,
        }
    }
}

/// Row of the `pull_requests` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct PullRequestRow {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: String,
    pub assigned_reviewers: String, // JSON array
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl TryFrom<PullRequestRow> for PullRequest {
    type Error = Error;

    fn try_from(row: PullRequestRow) -> Result<Self> {
        let status = PrStatus::parse(&row.status).ok_or_else(|| {
            Error::InvalidData(format!(
                "pull request {} has unknown status {}",
                row.pull_request_id, row.status
            ))
        })?;
        Ok(PullRequest {
            assigned_reviewers: serde_json::from_str(&row.assigned_reviewers)?,
            id: row.pull_request_id,
            name: row.pull_request_name,
            author_id: row.author_id,
            status,
            created_at: row.created_at,
            merged_at: row.merged_at,
            version: row.version,
        })
    }
}

/// Pull request joined with its author's team
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct OpenPullRequestRow {
    #[sqlx(flatten)]
    pub pull_request: PullRequestRow,
    pub author_team: String,
}

impl TryFrom<OpenPullRequestRow> for OpenPullRequest {
    type Error = Error;

    fn try_from(row: OpenPullRequestRow) -> Result<Self> {
        Ok(OpenPullRequest {
            pull_request: row.pull_request.try_into()?,
            author_team: row.author_team,
        })
    }
}

/// Convert a batch of rows, failing on the first bad one
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, reviewers: &str) -> PullRequestRow {
        PullRequestRow {
            pull_request_id: "pr-1".into(),
            pull_request_name: "Add cache".into(),
            author_id: "a".into(),
            status: status.into(),
            assigned_reviewers: reviewers.into(),
            created_at: Utc::now(),
            merged_at: None,
            version: 3,
        }
    }

    #[test]
    fn test_row_to_model() {
        let pr = PullRequest::try_from(row("OPEN", r#"["b","c"]"#)).unwrap();
        assert_eq!(pr.assigned_reviewers, vec!["b", "c"]);
        assert_eq!(pr.status, PrStatus::Open);
        assert_eq!(pr.version, 3);
    }

    #[test]
    fn test_bad_status_rejected() {
        let err = PullRequest::try_from(row("CLOSED", "[]")).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_bad_reviewers_json_rejected() {
        let err = PullRequest::try_from(row("OPEN", "b,c")).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
