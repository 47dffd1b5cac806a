//! Session database repository.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::GameSession;

/// Repository for session persistence.
///
/// The `game_sessions` table carries a partial unique index on
/// `(user_id) WHERE status = 'running'`, so the at-most-one-running
/// invariant is enforced here rather than by caller discipline.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Create a new repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new running session. Fails with a constraint error if the
    /// user already has a running session.
    pub async fn insert(
        &self,
        id: &str,
        user_id: &str,
        pod_name: &str,
        vnc_password: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO game_sessions (id, user_id, pod_name, vnc_password, status)
            VALUES (?, ?, ?, ?, 'running')
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(pod_name)
        .bind(vnc_password)
        .execute(&self.pool)
        .await
        .context("inserting session")?;

        Ok(())
    }

    /// Latest running session for a user, if any.
    pub async fn running_for_user(&self, user_id: &str) -> Result<Option<GameSession>> {
        let session = sqlx::query_as::<_, GameSession>(
            r#"
            SELECT id, user_id, pod_name, vnc_password, started_at, last_activity, status
            FROM game_sessions
            WHERE user_id = ? AND status = 'running'
            ORDER BY started_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching running session")?;

        Ok(session)
    }

    /// Transition the user's running session to stopped.
    pub async fn mark_stopped(&self, user_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE game_sessions SET status = 'stopped' WHERE user_id = ? AND status = 'running'",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("marking session stopped")?;

        Ok(())
    }

    /// Touch `last_activity` for the user's running session. Silent no-op
    /// when there is none.
    pub async fn touch(&self, user_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE game_sessions SET last_activity = CURRENT_TIMESTAMP
            WHERE user_id = ? AND status = 'running'
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("touching session activity")?;

        Ok(())
    }

    /// All running sessions idle for longer than `timeout_minutes`, oldest
    /// activity first.
    pub async fn idle_sessions(&self, timeout_minutes: i64) -> Result<Vec<GameSession>> {
        let sessions = sqlx::query_as::<_, GameSession>(
            r#"
            SELECT id, user_id, pod_name, vnc_password, started_at, last_activity, status
            FROM game_sessions
            WHERE status = 'running'
              AND last_activity < datetime('now', '-' || ? || ' minutes')
            ORDER BY last_activity ASC
            "#,
        )
        .bind(timeout_minutes.to_string())
        .fetch_all(&self.pool)
        .await
        .context("fetching idle sessions")?;

        Ok(sessions)
    }
}
