//! Team management commands

use clap::{Args, Subcommand};
use roster_core::TeamMember;

use super::Context;

/// Team management commands
#[derive(Args, Debug)]
pub struct TeamArgs {
    #[command(subcommand)]
    pub command: TeamCommand,
}

#[derive(Subcommand, Debug)]
pub enum TeamCommand {
    /// Create a team with its members; fails if the team exists
    Add {
        /// Team name
        team: String,

        /// Members as `user_id:username`, with an optional `:inactive` suffix
        #[arg(required = true, value_parser = parse_member)]
        members: Vec<MemberArg>,
    },

    /// Add or update members of a team, creating it if missing
    Update {
        /// Team name
        team: String,

        /// Members as `user_id:username`, with an optional `:inactive` suffix
        #[arg(required = true, value_parser = parse_member)]
        members: Vec<MemberArg>,
    },

    /// Show team members
    Show {
        /// Team name
        team: String,
    },

    /// Deactivate every active member and repair their open reviews
    Deactivate {
        /// Team name
        team: String,
    },
}

/// Member given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberArg {
    user_id: String,
    username: String,
    is_active: bool,
}

fn parse_member(value: &str) -> Result<MemberArg, String> {
    let mut parts = value.split(':');
    let user_id = parts.next().filter(|s| !s.is_empty());
    let username = parts.next().filter(|s| !s.is_empty());
    let (Some(user_id), Some(username)) = (user_id, username) else {
        return Err(format!("expected user_id:username, got '{}'", value));
    };
    let is_active = match parts.next() {
        None => true,
        Some("inactive") => false,
        Some(other) => return Err(format!("unknown member flag '{}'", other)),
    };
    if parts.next().is_some() {
        return Err(format!("too many fields in '{}'", value));
    }
    Ok(MemberArg {
        user_id: user_id.to_string(),
        username: username.to_string(),
        is_active,
    })
}

impl TeamArgs {
    /// Execute the team command
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        match &self.command {
            TeamCommand::Add { team, members } => add_team(ctx, team, members).await,
            TeamCommand::Update { team, members } => update_team(ctx, team, members).await,
            TeamCommand::Show { team } => show_team(ctx, team).await,
            TeamCommand::Deactivate { team } => deactivate_team(ctx, team).await,
        }
    }
}

fn to_members(team: &str, args: &[MemberArg]) -> Vec<TeamMember> {
    args.iter()
        .map(|arg| TeamMember {
            user_id: arg.user_id.clone(),
            username: arg.username.clone(),
            team_name: team.to_string(),
            is_active: arg.is_active,
        })
        .collect()
}

async fn add_team(ctx: &Context, team: &str, args: &[MemberArg]) -> anyhow::Result<()> {
    let stored = ctx
        .service
        .store()
        .create_team(team, &to_members(team, args))
        .await
        .map_err(roster_core::Error::from)?;
    ctx.emit(&stored, |members| {
        println!("Created team {} with {} member(s)", team, members.len());
        print_members(members);
    })
}

async fn update_team(ctx: &Context, team: &str, args: &[MemberArg]) -> anyhow::Result<()> {
    let stored = ctx
        .service
        .store()
        .upsert_team_members(team, &to_members(team, args))
        .await
        .map_err(roster_core::Error::from)?;
    ctx.emit(&stored, |members| {
        println!("Team {} now has {} member(s)", team, members.len());
        print_members(members);
    })
}

async fn show_team(ctx: &Context, team: &str) -> anyhow::Result<()> {
    let members = ctx
        .service
        .store()
        .get_team(team)
        .await
        .map_err(roster_core::Error::from)?;
    ctx.emit(&members, |members| {
        println!("Team {}", team);
        print_members(members);
    })
}

async fn deactivate_team(ctx: &Context, team: &str) -> anyhow::Result<()> {
    let report = ctx.service.deactivate_team(team).await?;
    ctx.emit(&report, |report| {
        if report.deactivated_user_ids.is_empty() {
            println!("No active members in team {}", team);
            return;
        }
        println!("Deactivated: {}", report.deactivated_user_ids.join(", "));
        if report.reassignments.is_empty() {
            println!("No reviewers reassigned");
        }
        for sub in &report.reassignments {
            println!(
                "  {}: {} -> {}",
                sub.pull_request_id, sub.old_reviewer_id, sub.new_reviewer_id
            );
        }
    })
}

fn print_members(members: &[TeamMember]) {
    for member in members {
        let state = if member.is_active { "active" } else { "inactive" };
        println!("  {} ({}) {}", member.user_id, member.username, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_member() {
        assert_eq!(
            parse_member("u1:alice").unwrap(),
            MemberArg {
                user_id: "u1".into(),
                username: "alice".into(),
                is_active: true,
            }
        );
        assert!(!parse_member("u2:bob:inactive").unwrap().is_active);
    }

    #[test]
    fn test_members_take_command_team() {
        let args = [parse_member("u1:alice").unwrap(), parse_member("u2:bob:inactive").unwrap()];
        let members = to_members("backend", &args);
        assert_eq!(members[0], TeamMember::new("u1", "alice", "backend"));
        assert_eq!(members[1], TeamMember::new("u2", "bob", "backend").inactive());
    }

    #[test]
    fn test_parse_member_rejects_malformed() {
        for bad in ["u1", ":alice", "u1:", "u1:alice:away", "u1:alice:inactive:x"] {
            assert!(parse_member(bad).is_err(), "{}", bad);
        }
    }
}
