//! Team directory: team creation and member maintenance outside the review engine

use roster_core::TeamMember;
use sqlx::{Sqlite, Transaction};
use tracing::info;

use crate::error::{Error, Result};
use crate::schema::UserRow;
use crate::SqliteStore;

/// Insert or update `members` as belonging to `team`
async fn write_members(
    tx: &mut Transaction<'static, Sqlite>,
    team: &str,
    members: &[TeamMember],
) -> Result<()> {
    for member in members {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, team_name, is_active)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                username = excluded.username,
                team_name = excluded.team_name,
                is_active = excluded.is_active
            "#,
        )
        .bind(&member.user_id)
        .bind(&member.username)
        .bind(team)
        .bind(member.is_active)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

impl SqliteStore {
    /// Create `team` with `members` in one transaction.
    ///
    /// Fails with [`Error::TeamExists`] if the team is already known. Members
    /// that already exist on another team are moved to the new one.
    pub async fn create_team(
        &self,
        team: &str,
        members: &[TeamMember],
    ) -> Result<Vec<TeamMember>> {
        let mut tx = self.pool().begin().await?;

        let inserted = sqlx::query("INSERT INTO teams (team_name) VALUES (?)")
            .bind(team)
            .execute(&mut *tx)
            .await;
        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(Error::TeamExists(team.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        write_members(&mut tx, team, members).await?;
        tx.commit().await?;

        info!(team, members = members.len(), "Team created");
        self.get_team(team).await
    }

    /// Add or update members of `team`, creating the team if missing.
    ///
    /// Returns the full member list afterwards.
    pub async fn upsert_team_members(
        &self,
        team: &str,
        members: &[TeamMember],
    ) -> Result<Vec<TeamMember>> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("INSERT INTO teams (team_name) VALUES (?) ON CONFLICT(team_name) DO NOTHING")
            .bind(team)
            .execute(&mut *tx)
            .await?;
        write_members(&mut tx, team, members).await?;
        tx.commit().await?;

        info!(team, members = members.len(), "Team members upserted");
        self.get_team(team).await
    }

    /// Members of `team`, ordered by user id
    pub async fn get_team(&self, team: &str) -> Result<Vec<TeamMember>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM teams WHERE team_name = ?)",
        )
        .bind(team)
        .fetch_one(self.pool())
        .await?;
        if !exists {
            return Err(Error::NotFound(format!("team {}", team)));
        }

        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, username, team_name, is_active
            FROM users
            WHERE team_name = ?
            ORDER BY user_id
            "#,
        )
        .bind(team)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(TeamMember::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store() -> (TempDir, SqliteStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::new(temp_dir.path().join("test.db")).await.unwrap();
        (temp_dir, store)
    }

    #[tokio::test]
    async fn test_create_and_get_team() {
        let (_dir, store) = store().await;

        let members = store
            .create_team(
                "backend",
                &[
                    TeamMember::new("u2", "bob", "backend"),
                    TeamMember::new("u1", "alice", "backend"),
                ],
            )
            .await
            .unwrap();
        let ids: Vec<_> = members.iter().map(|m| m.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert!(members.iter().all(|m| m.is_active));
    }

    #[tokio::test]
    async fn test_create_existing_team_fails_without_writes() {
        let (_dir, store) = store().await;
        store
            .create_team("backend", &[TeamMember::new("u1", "alice", "backend")])
            .await
            .unwrap();

        let err = store
            .create_team(
                "backend",
                &[
                    TeamMember::new("u1", "renamed", "backend").inactive(),
                    TeamMember::new("u2", "bob", "backend"),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TeamExists(ref team) if team == "backend"));
        assert_eq!(roster_core::Error::from(err).code(), "TEAM_EXISTS");

        let members = store.get_team("backend").await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].username, "alice");
        assert!(members[0].is_active);
    }

    #[tokio::test]
    async fn test_upsert_updates_existing_members() {
        let (_dir, store) = store().await;
        store
            .create_team("backend", &[TeamMember::new("u1", "alice", "backend")])
            .await
            .unwrap();

        let members = store
            .upsert_team_members(
                "backend",
                &[TeamMember::new("u1", "alice2", "backend").inactive()],
            )
            .await
            .unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].username, "alice2");
        assert!(!members[0].is_active);
    }

    #[tokio::test]
    async fn test_member_moves_between_teams() {
        let (_dir, store) = store().await;
        store
            .create_team("backend", &[TeamMember::new("u1", "alice", "backend")])
            .await
            .unwrap();
        store
            .create_team("platform", &[TeamMember::new("u1", "alice", "backend")])
            .await
            .unwrap();

        assert!(store.get_team("backend").await.unwrap().is_empty());
        let platform = store.get_team("platform").await.unwrap();
        assert_eq!(platform[0].team_name, "platform");
    }

    #[tokio::test]
    async fn test_unknown_team() {
        let (_dir, store) = store().await;
        let err = store.get_team("ghost").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(what) if what == "team ghost"));
    }
}
