//! Cluster Resource Driver: ordered creation, forced cleanup, phase reads.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::GameConfig;

use super::client::ClusterApi;
use super::error::{ClusterError, ClusterResult, DeleteOutcome};
use super::objects::{
    self, ObjectKind, ingress_name, middleware_name, pod_name, service_name,
};

/// Lifecycle phase of the game pod, as reported by the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    fn parse(phase: &str) -> Self {
        match phase {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

/// Driver for the four coupled cluster objects backing one user's game.
#[derive(Clone)]
pub struct GameDriver {
    api: Arc<dyn ClusterApi>,
    config: GameConfig,
}

impl GameDriver {
    pub fn new(api: Arc<dyn ClusterApi>, config: GameConfig) -> Self {
        Self { api, config }
    }

    /// Submit creation of the full resource set in dependency order:
    /// pod, service, middleware, ingress. Any failure propagates unchanged;
    /// the caller recovers by re-running forced cleanup on the next start.
    pub async fn create_all(&self, user_id: &str, vnc_password: &str) -> ClusterResult<()> {
        let pod = objects::pod_manifest(&self.config, user_id, vnc_password);
        self.api.create(ObjectKind::Pod, &pod).await?;

        let service = objects::service_manifest(&self.config, user_id);
        self.api.create(ObjectKind::Service, &service).await?;

        let middleware = objects::middleware_manifest(&self.config, user_id);
        self.api.create(ObjectKind::Middleware, &middleware).await?;

        let ingress = objects::ingress_manifest(&self.config, user_id);
        self.api.create(ObjectKind::Ingress, &ingress).await?;

        debug!(user = %user_id, "submitted full game resource set");
        Ok(())
    }

    /// Forced cleanup: delete all four objects, treating absence as
    /// success, then wait (bounded) for the pod to actually disappear.
    ///
    /// Deletion runs ingress-first because the middleware references the
    /// service and the ingress references the middleware; tearing the route
    /// down first narrows the window where a stale route points at a
    /// deleted service. Errors other than not-found propagate.
    pub async fn cleanup(&self, user_id: &str) -> ClusterResult<()> {
        let targets = [
            (ObjectKind::Ingress, ingress_name(user_id)),
            (ObjectKind::Middleware, middleware_name(user_id)),
            (ObjectKind::Service, service_name(user_id)),
            (ObjectKind::Pod, pod_name(user_id)),
        ];

        for (kind, name) in targets {
            match self.api.delete(kind, &name).await {
                Ok(DeleteOutcome::Deleted) => debug!(%kind, %name, "deleted"),
                Ok(DeleteOutcome::AlreadyAbsent) => debug!(%kind, %name, "already absent"),
                Err(ClusterError::NotFound(_)) => debug!(%kind, %name, "already absent"),
                Err(err) => return Err(err),
            }
        }

        self.wait_for_pod_gone(user_id).await;
        Ok(())
    }

    /// Read the game pod's phase; `None` when the pod does not exist.
    pub async fn pod_phase(&self, user_id: &str) -> ClusterResult<Option<PodPhase>> {
        let name = pod_name(user_id);
        match self.api.get(ObjectKind::Pod, &name).await {
            Ok(Some(pod)) => {
                let phase = pod
                    .pointer("/status/phase")
                    .and_then(Value::as_str)
                    .map(PodPhase::parse)
                    .unwrap_or(PodPhase::Unknown);
                Ok(Some(phase))
            }
            Ok(None) | Err(ClusterError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Poll for pod absence under the configured retry budget. Exhausting
    /// the budget is a soft signal: the caller proceeds, accepting eventual
    /// convergence.
    async fn wait_for_pod_gone(&self, user_id: &str) {
        let name = pod_name(user_id);
        let policy = self.config.cleanup_retry;

        for attempt in 1..=policy.max_attempts {
            match self.api.get(ObjectKind::Pod, &name).await {
                Ok(None) | Err(ClusterError::NotFound(_)) => {
                    debug!(pod = %name, attempt, "pod confirmed absent");
                    return;
                }
                Ok(Some(_)) => {}
                Err(err) => {
                    // Read failures here are soft; the wait is best-effort.
                    warn!(pod = %name, attempt, error = %err, "pod existence check failed");
                }
            }

            if attempt < policy.max_attempts {
                tokio::time::sleep(policy.delay()).await;
            }
        }

        warn!(
            pod = %name,
            attempts = policy.max_attempts,
            "pod still present after cleanup wait, proceeding"
        );
    }
}
