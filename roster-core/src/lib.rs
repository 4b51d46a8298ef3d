//! Roster Core - Reviewer assignment engine
//!
//! This crate assigns reviewers to pull requests within a team, replaces a
//! single reviewer on demand, and repairs open pull requests when a whole
//! team is deactivated. Persistence is abstracted behind [`store::ReviewStore`].

pub mod candidates;
pub mod config;
pub mod error;
pub mod model;
pub mod selector;
pub mod service;
pub mod store;

pub use candidates::{build_candidates, ExclusionSet};
pub use config::{Config, DatabaseSettings, SelectionConfig, ServiceConfig};
pub use error::{Error, Result};
pub use model::{
    AssignmentStats, DeactivationReport, NewPullRequest, OpenPullRequest, PrCounts, PrStatus,
    PullRequest, ReassignmentResult, ReviewerLoad, ReviewerUpdate, Substitution, TeamMember,
    MAX_REVIEWERS,
};
pub use selector::{select_reviewers, RandomSource, SeededRandom, ThreadRandom};
pub use service::ReviewService;
pub use store::{MemoryStore, ReviewStore, StoreTx};
