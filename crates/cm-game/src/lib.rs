//! CM 01/02 game session backend library.
//!
//! Provisions, tracks, and tears down one ephemeral per-user game pod on a
//! Kubernetes cluster. Each authenticated user gets a fixed resource set
//! (pod, service, ingress, strip-prefix middleware) with deterministic
//! names, a durable session record in SQLite, and idle-based reaping.
//!
//! The HTTP layer, credential storage, and the reaper's cron wrapper live
//! with the embedding process; this crate owns the lifecycle logic.

pub mod cluster;
pub mod config;
pub mod db;
pub mod reaper;
pub mod session;

/// Initialize tracing for embedding binaries.
///
/// Respects `RUST_LOG`, defaulting to `info`.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|err| anyhow::anyhow!("initializing tracing subscriber: {err}"))?;

    Ok(())
}
