//! Thin typed client for the Kubernetes API server.

use async_trait::async_trait;
use serde_json::Value;

use super::error::{ClusterError, ClusterResult, DeleteOutcome};
use super::objects::ObjectKind;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Cluster API surface the driver needs: create, idempotent delete, and
/// read-back for the four managed object kinds. Implemented over HTTP in
/// production and by recording doubles in tests.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Submit an object for creation. Duplicate names surface as ordinary
    /// API errors.
    async fn create(&self, kind: ObjectKind, manifest: &Value) -> ClusterResult<()>;

    /// Submit an object for deletion. Absence is not an error.
    async fn delete(&self, kind: ObjectKind, name: &str) -> ClusterResult<DeleteOutcome>;

    /// Read an object back, `None` when it does not exist.
    async fn get(&self, kind: ObjectKind, name: &str) -> ClusterResult<Option<Value>>;
}

/// HTTP implementation of [`ClusterApi`] against the API server REST paths.
pub struct HttpClusterClient {
    client: reqwest::Client,
    base_url: String,
    namespace: String,
    token: Option<String>,
}

impl HttpClusterClient {
    /// Connect to an explicitly configured API server.
    pub fn new(base_url: impl Into<String>, namespace: impl Into<String>) -> ClusterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            namespace: namespace.into(),
            token: None,
        })
    }

    /// Use a bearer token for authentication.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Discover the API server from the in-cluster service-account mount
    /// and environment (`KUBERNETES_SERVICE_HOST`/`_PORT`).
    pub async fn in_cluster(namespace: impl Into<String>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .context("KUBERNETES_SERVICE_HOST not set; not running in-cluster?")?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

        let token = tokio::fs::read_to_string(format!("{SERVICE_ACCOUNT_DIR}/token"))
            .await
            .context("reading service account token")?;
        let ca_pem = tokio::fs::read(format!("{SERVICE_ACCOUNT_DIR}/ca.crt"))
            .await
            .context("reading service account CA certificate")?;
        let ca = reqwest::Certificate::from_pem(&ca_pem).context("parsing CA certificate")?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .add_root_certificate(ca)
            .build()
            .context("building cluster HTTP client")?;

        Ok(Self {
            client,
            base_url: format!("https://{host}:{port}"),
            namespace: namespace.into(),
            token: Some(token.trim().to_string()),
        })
    }

    fn collection_url(&self, kind: ObjectKind) -> String {
        format!("{}{}", self.base_url, kind.api_path(&self.namespace))
    }

    fn object_url(&self, kind: ObjectKind, name: &str) -> String {
        format!("{}/{}", self.collection_url(kind), name)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Extract the API server's error message from a `Status` body.
    async fn api_error(response: reqwest::Response) -> ClusterError {
        let status = response.status().as_u16();
        let message = match response.json::<Value>().await {
            Ok(body) => body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no message")
                .to_string(),
            Err(_) => "unreadable error body".to_string(),
        };
        ClusterError::Api { status, message }
    }
}

#[async_trait]
impl ClusterApi for HttpClusterClient {
    async fn create(&self, kind: ObjectKind, manifest: &Value) -> ClusterResult<()> {
        let response = self
            .authorize(self.client.post(self.collection_url(kind)))
            .json(manifest)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn delete(&self, kind: ObjectKind, name: &str) -> ClusterResult<DeleteOutcome> {
        let response = self
            .authorize(self.client.delete(self.object_url(kind, name)))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(DeleteOutcome::AlreadyAbsent)
        } else if response.status().is_success() {
            Ok(DeleteOutcome::Deleted)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn get(&self, kind: ObjectKind, name: &str) -> ClusterResult<Option<Value>> {
        let response = self
            .authorize(self.client.get(self.object_url(kind, name)))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            Err(Self::api_error(response).await)
        }
    }
}
