//! CLI command implementations

pub mod pr;
pub mod stats;
pub mod team;
pub mod user;

pub use pr::PrArgs;
pub use stats::StatsArgs;
pub use team::TeamArgs;
pub use user::UserArgs;

use roster_core::{PullRequest, ReviewService};
use roster_db::SqliteStore;
use serde::Serialize;

/// Shared state handed to every command
pub struct Context {
    pub service: ReviewService<SqliteStore>,
    pub json: bool,
}

impl Context {
    /// Print `value` as JSON, or run `text` to print it for humans
    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T)) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text(value);
        }
        Ok(())
    }
}

/// Print an error with its stable code when it comes from the engine
pub fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<roster_core::Error>() {
        Some(e) => eprintln!("error[{}]: {}", e.code(), e),
        None => eprintln!("error: {:#}", err),
    }
}

pub(crate) fn print_pull_request(pr: &PullRequest) {
    println!("{} [{}] {}", pr.id, pr.status, pr.name);
    println!("  author: {}", pr.author_id);
    if pr.assigned_reviewers.is_empty() {
        println!("  reviewers: (none)");
    } else {
        println!("  reviewers: {}", pr.assigned_reviewers.join(", "));
    }
    if let Some(merged_at) = pr.merged_at {
        println!("  merged at: {}", merged_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
}
