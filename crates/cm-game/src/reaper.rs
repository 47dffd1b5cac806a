//! Idle session reaping.
//!
//! Finds running sessions whose last heartbeat is older than the timeout
//! and commands them stopped. The scheduling wrapper (cron job or timer)
//! lives with the embedding process.

use anyhow::Result;
use tracing::{error, info};

use crate::session::GameService;

/// Stop every session idle for longer than `timeout_minutes`. Returns how
/// many were stopped.
///
/// Each session's failure is isolated: a failing stop is logged and the
/// scan continues with the remaining candidates.
pub async fn reap_idle(service: &GameService, timeout_minutes: i64) -> Result<usize> {
    let idle = service.idle_sessions(timeout_minutes).await?;
    info!(
        candidates = idle.len(),
        timeout_minutes, "checking for idle game sessions"
    );

    let mut stopped = 0;
    for session in idle {
        match service.stop(&session.user_id).await {
            Ok(()) => {
                info!(
                    session = %session.id,
                    user = %session.user_id,
                    idle_since = %session.last_activity,
                    "stopped idle session"
                );
                stopped += 1;
            }
            Err(err) => {
                error!(
                    session = %session.id,
                    user = %session.user_id,
                    error = ?err,
                    "failed to stop idle session"
                );
            }
        }
    }

    Ok(stopped)
}
