//! Game session lifecycle manager.
//!
//! Orchestrates the cluster driver and the session record store to expose
//! idempotent `start`, `stop`, `status`, and `touch` operations with
//! crash-safe cleanup. The store is a cached projection of cluster reality,
//! reconciled lazily on `status` reads.

use std::sync::Arc;

use anyhow::{Context, Result};
use rand::RngCore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cluster::{GameDriver, PodPhase, objects};
use crate::config::GameConfig;

use super::models::{GameSession, GameStatus, StartedGame};
use super::repository::SessionRepository;

/// Service for managing per-user game sessions.
#[derive(Clone)]
pub struct GameService {
    repo: SessionRepository,
    driver: Arc<GameDriver>,
    config: GameConfig,
}

impl GameService {
    /// Create a new service. The repository and driver are injected so
    /// tests can substitute doubles for both.
    pub fn new(repo: SessionRepository, driver: GameDriver, config: GameConfig) -> Self {
        Self {
            repo,
            driver: Arc::new(driver),
            config,
        }
    }

    /// Start a game for the user, or return the existing one.
    ///
    /// Safe to call repeatedly: a running record short-circuits without any
    /// cluster calls. Otherwise forced cleanup runs first to erase whatever
    /// a crashed or half-finished earlier attempt left behind, then the
    /// resource set is created and the record inserted last. A failure
    /// part-way leaves no record, so the next `start` self-heals.
    pub async fn start(&self, user_id: &str) -> Result<StartedGame> {
        if let Some(existing) = self.repo.running_for_user(user_id).await? {
            debug!(user = %user_id, session = %existing.id, "reusing running session");
            return Ok(StartedGame {
                url: objects::viewer_url(&self.config.domain, user_id),
                session_id: existing.id,
            });
        }

        self.driver
            .cleanup(user_id)
            .await
            .context("cleaning up stale game resources")?;

        let vnc_password = generate_vnc_password();
        self.driver
            .create_all(user_id, &vnc_password)
            .await
            .context("creating game resources")?;

        let session_id = Uuid::new_v4().to_string();
        self.repo
            .insert(
                &session_id,
                user_id,
                &objects::pod_name(user_id),
                &vnc_password,
            )
            .await?;

        info!(user = %user_id, session = %session_id, "game session started");
        Ok(StartedGame {
            url: objects::viewer_url(&self.config.domain, user_id),
            session_id,
        })
    }

    /// Stop the user's game. No-op without a running record.
    ///
    /// Cleanup runs before the record flips, so even if the store update
    /// fails the next `status` or `start` reconciles.
    pub async fn stop(&self, user_id: &str) -> Result<()> {
        let Some(session) = self.repo.running_for_user(user_id).await? else {
            return Ok(());
        };

        self.driver
            .cleanup(user_id)
            .await
            .context("tearing down game resources")?;
        self.repo.mark_stopped(user_id).await?;

        info!(user = %user_id, session = %session.id, "game session stopped");
        Ok(())
    }

    /// Current status of the user's game, reconciled against the cluster.
    ///
    /// A dead or missing pod behind a `running` record flips the record to
    /// stopped and tears down any leftovers. This read-side reconciliation
    /// is how externally killed pods (evictions, OOM) reach session state
    /// without a watch loop.
    pub async fn status(&self, user_id: &str) -> Result<GameStatus> {
        let Some(session) = self.repo.running_for_user(user_id).await? else {
            return Ok(GameStatus::stopped());
        };

        match self.driver.pod_phase(user_id).await? {
            Some(PodPhase::Running) => Ok(self.live_status(user_id, &session, true)),
            Some(PodPhase::Pending) => Ok(self.live_status(user_id, &session, false)),
            phase => {
                warn!(user = %user_id, session = %session.id, ?phase, "game pod dead or missing, reconciling");
                self.driver
                    .cleanup(user_id)
                    .await
                    .context("cleaning up dead game resources")?;
                self.repo.mark_stopped(user_id).await?;
                Ok(GameStatus::stopped())
            }
        }
    }

    /// Record a heartbeat from the viewer. Silent no-op without a running
    /// session.
    pub async fn touch(&self, user_id: &str) -> Result<()> {
        self.repo.touch(user_id).await
    }

    /// Running sessions idle past the threshold, for the reaper.
    pub async fn idle_sessions(&self, timeout_minutes: i64) -> Result<Vec<GameSession>> {
        self.repo.idle_sessions(timeout_minutes).await
    }

    fn live_status(&self, user_id: &str, session: &GameSession, running: bool) -> GameStatus {
        GameStatus {
            running,
            pending: !running,
            url: Some(objects::viewer_url(&self.config.domain, user_id)),
            started_at: Some(session.started_at.clone()),
            last_activity: Some(session.last_activity.clone()),
        }
    }
}

/// Fresh per-session VNC password: 8 random bytes, hex encoded.
fn generate_vnc_password() -> String {
    let mut bytes = [0u8; 8];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
