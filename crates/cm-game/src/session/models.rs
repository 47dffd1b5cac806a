//! Session data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Session status.
///
/// A record only ever moves `running` -> `stopped`; a fresh `start` creates
/// a new record instead of reopening an old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The user's game resources are provisioned.
    Running,
    /// The session has been torn down.
    Stopped,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Stopped => write!(f, "stopped"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(SessionStatus::Running),
            "stopped" => Ok(SessionStatus::Stopped),
            _ => Err(format!("unknown session status: {}", s)),
        }
    }
}

impl TryFrom<String> for SessionStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One user's game session record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GameSession {
    /// Unique session ID, immutable once created.
    pub id: String,
    /// User who owns this session.
    pub user_id: String,
    /// Name of the game pod.
    pub pod_name: String,
    /// Per-session VNC password, delivered to the pod via its environment.
    #[serde(skip_serializing)]
    pub vnc_password: String,
    /// When the session started.
    pub started_at: String,
    /// Last heartbeat from the viewer.
    pub last_activity: String,
    /// Current status.
    #[sqlx(try_from = "String")]
    pub status: SessionStatus,
}

/// Result of a successful `start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedGame {
    /// Signed-in viewer URL. Does not carry the VNC password.
    pub url: String,
    pub session_id: String,
}

/// Point-in-time view of a user's session, reconciled against the cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStatus {
    pub running: bool,
    pub pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
}

impl GameStatus {
    /// Status for a user with no live session.
    pub fn stopped() -> Self {
        Self {
            running: false,
            pending: false,
            url: None,
            started_at: None,
            last_activity: None,
        }
    }
}
