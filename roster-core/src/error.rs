//! Error types for Roster

use thiserror::Error;

/// Result type alias for Roster operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Roster operations
#[derive(Error, Debug)]
pub enum Error {
    /// A pull request with this id already exists
    #[error("Pull request already exists: {0}")]
    AlreadyExists(String),

    /// A team with this name already exists
    #[error("Team already exists: {0}")]
    TeamExists(String),

    /// Pull request, user or team does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Reviewers of a merged pull request are frozen
    #[error("Pull request is merged: {0}")]
    PrMerged(String),

    /// The user is not an assigned reviewer of the pull request
    #[error("User {user_id} is not assigned to pull request {pull_request_id}")]
    NotAssigned {
        pull_request_id: String,
        user_id: String,
    },

    /// No active team member is left to take the review
    #[error("No replacement candidate for pull request {0}")]
    NoCandidate(String),

    /// A concurrent write changed the aggregate between read and write
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    /// Persistence failure, surfaced unchanged
    #[error("Infrastructure error: {0}")]
    Infrastructure(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a backend error as an infrastructure failure
    pub fn infrastructure(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Infrastructure(Box::new(err))
    }

    /// Stable code for the transport layer
    pub fn code(&self) -> &'static str {
        match self {
            Error::AlreadyExists(_) => "PR_EXISTS",
            Error::TeamExists(_) => "TEAM_EXISTS",
            Error::NotFound(_) => "NOT_FOUND",
            Error::PrMerged(_) => "PR_MERGED",
            Error::NotAssigned { .. } => "NOT_ASSIGNED",
            Error::NoCandidate(_) => "NO_CANDIDATE",
            Error::Conflict(_) => "CONFLICT",
            Error::Infrastructure(_) | Error::Config(_) | Error::Io(_) => "INTERNAL",
        }
    }

    /// Whether the operation may succeed if retried from a fresh read
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Error::AlreadyExists("pr-1".into()).code(), "PR_EXISTS");
        assert_eq!(Error::TeamExists("backend".into()).code(), "TEAM_EXISTS");
        assert_eq!(Error::PrMerged("pr-1".into()).code(), "PR_MERGED");
        assert_eq!(
            Error::NotAssigned {
                pull_request_id: "pr-1".into(),
                user_id: "u1".into(),
            }
            .code(),
            "NOT_ASSIGNED"
        );
        assert_eq!(Error::Config("bad".into()).code(), "INTERNAL");
    }

    #[test]
    fn test_infrastructure_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = Error::infrastructure(io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("disk gone"));
        assert!(!err.is_conflict());
    }
}
