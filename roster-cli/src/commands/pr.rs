//! Pull request commands

use clap::{Args, Subcommand};

use super::{print_pull_request, Context};

/// Pull request commands
#[derive(Args, Debug)]
pub struct PrArgs {
    #[command(subcommand)]
    pub command: PrCommand,
}

#[derive(Subcommand, Debug)]
pub enum PrCommand {
    /// Create a pull request and assign up to two reviewers from the author's team
    Create {
        /// Pull request identifier
        pull_request_id: String,

        /// Author user identifier
        author_id: String,

        /// Pull request title
        name: String,
    },

    /// Mark a pull request as merged
    Merge {
        /// Pull request identifier
        pull_request_id: String,
    },

    /// Replace one reviewer with another member of their team
    Reassign {
        /// Pull request identifier
        pull_request_id: String,

        /// Reviewer to replace
        old_reviewer_id: String,
    },
}

impl PrArgs {
    /// Execute the pull request command
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        match &self.command {
            PrCommand::Create {
                pull_request_id,
                author_id,
                name,
            } => {
                let pr = ctx
                    .service
                    .create_pull_request(author_id, pull_request_id, name)
                    .await?;
                ctx.emit(&pr, |pr| {
                    println!("Created pull request");
                    print_pull_request(pr);
                })
            }
            PrCommand::Merge { pull_request_id } => {
                let pr = ctx.service.merge_pull_request(pull_request_id).await?;
                ctx.emit(&pr, print_pull_request)
            }
            PrCommand::Reassign {
                pull_request_id,
                old_reviewer_id,
            } => {
                let result = ctx
                    .service
                    .reassign_reviewer(pull_request_id, old_reviewer_id)
                    .await?;
                ctx.emit(&result, |result| {
                    println!("Replaced {} with {}", old_reviewer_id, result.replaced_by);
                    print_pull_request(&result.pull_request);
                })
            }
        }
    }
}
