//! User commands

use clap::{Args, Subcommand};

use super::{print_pull_request, Context};

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Mark a user active or inactive without touching their assignments
    SetActive {
        /// User identifier
        user_id: String,

        /// New state
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },

    /// List pull requests the user reviews
    Reviews {
        /// User identifier
        user_id: String,
    },
}

impl UserArgs {
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        match &self.command {
            UserCommand::SetActive { user_id, active } => {
                let member = ctx.service.set_user_active(user_id, *active).await?;
                ctx.emit(&member, |m| {
                    let state = if m.is_active { "active" } else { "inactive" };
                    println!(
                        "{} ({}, team {}) is now {}",
                        m.user_id, m.username, m.team_name, state
                    );
                })
            }
            UserCommand::Reviews { user_id } => {
                let reviews = ctx.service.reviews_for_user(user_id).await?;
                ctx.emit(&reviews, |prs| {
                    if prs.is_empty() {
                        println!("{} has no reviews assigned", user_id);
                    }
                    for pr in prs {
                        print_pull_request(pr);
                    }
                })
            }
        }
    }
}
