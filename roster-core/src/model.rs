//! Domain records for pull requests and team members

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of reviewers assigned to one pull request
pub const MAX_REVIEWERS: usize = 2;

/// Pull request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrStatus {
    Open,
    Merged,
}

impl PrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrStatus::Open => "OPEN",
            PrStatus::Merged => "MERGED",
        }
    }

    /// Parse the stored representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OPEN" => Some(PrStatus::Open),
            "MERGED" => Some(PrStatus::Merged),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pull request with its assigned reviewers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Unique, immutable identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// User who opened the pull request
    pub author_id: String,

    pub status: PrStatus,

    /// Ordered reviewer ids, at most [`MAX_REVIEWERS`], never the author
    pub assigned_reviewers: Vec<String>,

    pub created_at: DateTime<Utc>,

    /// Set exactly once, on the OPEN -> MERGED transition
    pub merged_at: Option<DateTime<Utc>>,

    /// Revision counter, bumped by every write
    pub version: i64,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.status == PrStatus::Merged
    }

    pub fn has_reviewer(&self, user_id: &str) -> bool {
        self.assigned_reviewers.iter().any(|r| r == user_id)
    }

    /// Reviewer list with `old` replaced by `new` at the same position
    pub fn reviewers_with_replacement(&self, old: &str, new: &str) -> Vec<String> {
        self.assigned_reviewers
            .iter()
            .map(|r| if r == old { new.to_string() } else { r.clone() })
            .collect()
    }
}

/// Input for inserting a pull request
#[derive(Debug, Clone)]
pub struct NewPullRequest {
    pub id: String,
    pub name: String,
    pub author_id: String,
    pub assigned_reviewers: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Member of a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

impl TeamMember {
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        team_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            team_name: team_name.into(),
            is_active: true,
        }
    }

    /// Mark the member inactive
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Open pull request together with its author's team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPullRequest {
    pub pull_request: PullRequest,
    pub author_team: String,
}

/// Result of replacing a single reviewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentResult {
    pub pull_request: PullRequest,
    pub replaced_by: String,
}

/// One reviewer swapped during a deactivation cascade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub pull_request_id: String,
    pub old_reviewer_id: String,
    pub new_reviewer_id: String,
}

/// Outcome of deactivating a whole team
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivationReport {
    pub deactivated_user_ids: Vec<String>,
    pub reassignments: Vec<Substitution>,
}

/// Reviewer list write guarded by the version it was computed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerUpdate {
    pub pull_request_id: String,
    pub expected_version: i64,
    pub reviewers: Vec<String>,
}

/// Pull request counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrCounts {
    pub total: i64,
    pub open: i64,
    pub merged: i64,
}

/// Number of pull requests an active reviewer is assigned to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerLoad {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub assignments: i64,
}

/// Assignment statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentStats {
    pub pull_requests: PrCounts,
    pub reviewers: Vec<ReviewerLoad>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(reviewers: &[&str]) -> PullRequest {
        PullRequest {
            id: "pr-1".into(),
            name: "Add thing".into(),
            author_id: "a".into(),
            status: PrStatus::Open,
            assigned_reviewers: reviewers.iter().map(|r| r.to_string()).collect(),
            created_at: Utc::now(),
            merged_at: None,
            version: 0,
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(PrStatus::parse("OPEN"), Some(PrStatus::Open));
        assert_eq!(PrStatus::parse("MERGED"), Some(PrStatus::Merged));
        assert_eq!(PrStatus::parse("open"), None);
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&PrStatus::Merged).unwrap();
        assert_eq!(json, "\"MERGED\"");
    }

    #[test]
    fn test_replacement_keeps_position() {
        let pr = pr(&["b", "c"]);
        assert_eq!(pr.reviewers_with_replacement("b", "d"), vec!["d", "c"]);
        assert_eq!(pr.reviewers_with_replacement("c", "d"), vec!["b", "d"]);
        assert!(pr.has_reviewer("c"));
        assert!(!pr.has_reviewer("a"));
    }
}
