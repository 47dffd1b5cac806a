//! Test utilities and common setup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use cm_game::cluster::{
    ClusterApi, ClusterError, ClusterResult, DeleteOutcome, GameDriver, ObjectKind,
};
use cm_game::config::{GameConfig, RetryPolicy};
use cm_game::db::Database;
use cm_game::session::{GameService, SessionRepository};

/// Recording in-memory double for the cluster API.
///
/// Created pods get a `Running` phase so the happy path reports live
/// sessions; tests override the phase to simulate scheduling or death.
#[derive(Default)]
pub struct MockCluster {
    pub objects: Mutex<HashMap<(ObjectKind, String), Value>>,
    pub calls: Mutex<Vec<String>>,
    /// Deletes of objects whose name contains this string fail, to
    /// exercise fault isolation.
    pub fail_delete_substr: Mutex<Option<String>>,
}

impl MockCluster {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn has_object(&self, kind: ObjectKind, name: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(kind, name.to_string()))
    }

    /// Plant an object directly, bypassing the driver (simulates leftovers
    /// from a crashed earlier run).
    pub fn plant(&self, kind: ObjectKind, name: &str, value: Value) {
        self.objects
            .lock()
            .unwrap()
            .insert((kind, name.to_string()), value);
    }

    pub fn set_pod_phase(&self, pod_name: &str, phase: &str) {
        let mut objects = self.objects.lock().unwrap();
        let pod = objects
            .get_mut(&(ObjectKind::Pod, pod_name.to_string()))
            .expect("pod not present");
        pod["status"] = json!({ "phase": phase });
    }

    pub fn remove(&self, kind: ObjectKind, name: &str) {
        self.objects.lock().unwrap().remove(&(kind, name.to_string()));
    }

    pub fn fail_deletes_matching(&self, substr: &str) {
        *self.fail_delete_substr.lock().unwrap() = Some(substr.to_string());
    }
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn create(&self, kind: ObjectKind, manifest: &Value) -> ClusterResult<()> {
        let name = manifest["metadata"]["name"].as_str().unwrap().to_string();
        self.calls
            .lock()
            .unwrap()
            .push(format!("create {kind} {name}"));

        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&(kind, name.clone())) {
            return Err(ClusterError::Api {
                status: 409,
                message: format!("{kind} \"{name}\" already exists"),
            });
        }

        let mut stored = manifest.clone();
        if kind == ObjectKind::Pod {
            stored["status"] = json!({ "phase": "Running" });
        }
        objects.insert((kind, name), stored);
        Ok(())
    }

    async fn delete(&self, kind: ObjectKind, name: &str) -> ClusterResult<DeleteOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("delete {kind} {name}"));

        if let Some(substr) = self.fail_delete_substr.lock().unwrap().as_deref() {
            if name.contains(substr) {
                return Err(ClusterError::Api {
                    status: 500,
                    message: "injected delete failure".to_string(),
                });
            }
        }

        match self.objects.lock().unwrap().remove(&(kind, name.to_string())) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::AlreadyAbsent),
        }
    }

    async fn get(&self, kind: ObjectKind, name: &str) -> ClusterResult<Option<Value>> {
        self.calls.lock().unwrap().push(format!("get {kind} {name}"));
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&(kind, name.to_string()))
            .cloned())
    }
}

pub struct TestHarness {
    pub service: GameService,
    pub cluster: Arc<MockCluster>,
    pub db: Database,
}

/// Build a service over an in-memory database and a mock cluster, with a
/// zero-delay cleanup retry policy.
pub async fn test_harness() -> TestHarness {
    let db = Database::in_memory().await.unwrap();
    let cluster = Arc::new(MockCluster::default());

    let config = GameConfig {
        domain: "game.example.com".to_string(),
        cleanup_retry: RetryPolicy::immediate(3),
        ..GameConfig::default()
    };

    let repo = SessionRepository::new(db.pool().clone());
    let driver = GameDriver::new(cluster.clone(), config.clone());
    let service = GameService::new(repo, driver, config);

    TestHarness {
        service,
        cluster,
        db,
    }
}

/// Register a user; sessions reference the auth-owned users table.
pub async fn create_user(db: &Database, id: &str) {
    sqlx::query("INSERT INTO users (id, email, password_hash) VALUES (?, ?, 'x')")
        .bind(id)
        .bind(format!("{id}@example.com"))
        .execute(db.pool())
        .await
        .unwrap();
}

/// Push a session's last heartbeat into the past.
pub async fn backdate_activity(db: &Database, user_id: &str, minutes: i64) {
    sqlx::query(
        r#"
        UPDATE game_sessions SET last_activity = datetime('now', '-' || ? || ' minutes')
        WHERE user_id = ? AND status = 'running'
        "#,
    )
    .bind(minutes.to_string())
    .bind(user_id)
    .execute(db.pool())
    .await
    .unwrap();
}

/// Raw status column for a session record.
pub async fn record_status(db: &Database, session_id: &str) -> String {
    sqlx::query_scalar("SELECT status FROM game_sessions WHERE id = ?")
        .bind(session_id)
        .fetch_one(db.pool())
        .await
        .unwrap()
}
