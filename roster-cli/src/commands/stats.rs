//! Assignment statistics command

use clap::Args;

use super::Context;

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Show only the N busiest reviewers
    #[arg(short, long)]
    pub top: Option<usize>,
}

impl StatsArgs {
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let mut stats = ctx.service.stats().await?;
        if let Some(top) = self.top {
            stats.reviewers.truncate(top);
        }

        ctx.emit(&stats, |stats| {
            let counts = &stats.pull_requests;
            println!(
                "Pull requests: {} total, {} open, {} merged",
                counts.total, counts.open, counts.merged
            );
            if stats.reviewers.is_empty() {
                println!("No active reviewers with assignments");
                return;
            }
            println!();
            println!("{:<16} {:<16} {:<16} {:>11}", "USER", "USERNAME", "TEAM", "ASSIGNMENTS");
            for load in &stats.reviewers {
                println!(
                    "{:<16} {:<16} {:<16} {:>11}",
                    load.user_id, load.username, load.team_name, load.assignments
                );
            }
        })
    }
}
