//! Deterministic resource names and manifest shapes for one user's game.

use serde_json::{Value, json};

use crate::config::GameConfig;

/// Port noVNC listens on inside the game pod.
pub const GAME_PORT: u16 = 6080;

/// Kinds of cluster objects the driver manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Pod,
    Service,
    Ingress,
    Middleware,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Pod => "pod",
            ObjectKind::Service => "service",
            ObjectKind::Ingress => "ingress",
            ObjectKind::Middleware => "middleware",
        }
    }

    /// API server collection path for this kind within a namespace.
    pub fn api_path(&self, namespace: &str) -> String {
        match self {
            ObjectKind::Pod => format!("/api/v1/namespaces/{namespace}/pods"),
            ObjectKind::Service => format!("/api/v1/namespaces/{namespace}/services"),
            ObjectKind::Ingress => {
                format!("/apis/networking.k8s.io/v1/namespaces/{namespace}/ingresses")
            }
            ObjectKind::Middleware => {
                format!("/apis/traefik.io/v1alpha1/namespaces/{namespace}/middlewares")
            }
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First 8 characters of the user id. All object names derive from this,
/// which lets cleanup reconstruct them from the identity alone. Two ids
/// sharing an 8-char prefix would collide; user ids are UUIDs upstream.
fn user_tag(user_id: &str) -> &str {
    user_id.get(..8).unwrap_or(user_id)
}

pub fn pod_name(user_id: &str) -> String {
    format!("cm-game-{}", user_tag(user_id))
}

pub fn service_name(user_id: &str) -> String {
    format!("cm-game-svc-{}", user_tag(user_id))
}

pub fn ingress_name(user_id: &str) -> String {
    format!("cm-game-ing-{}", user_tag(user_id))
}

pub fn middleware_name(user_id: &str) -> String {
    format!("cm-game-mw-{}", user_tag(user_id))
}

/// Per-user URL path prefix, stripped by the middleware before traffic
/// reaches the pod.
pub fn play_path(user_id: &str) -> String {
    format!("/play/{user_id}")
}

/// Signed-in viewer URL. The `path` query parameter must match the
/// middleware's stripped prefix exactly. The VNC password is not embedded;
/// it reaches the pod through its environment.
pub fn viewer_url(domain: &str, user_id: &str) -> String {
    format!(
        "https://{domain}/play/{user_id}/vnc_lite.html?autoconnect=true&scale=true&path=play/{user_id}/websockify"
    )
}

pub fn pod_manifest(config: &GameConfig, user_id: &str, vnc_password: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": pod_name(user_id),
            "namespace": config.namespace,
            "labels": { "app": "cm-game", "user": user_tag(user_id) },
        },
        "spec": {
            "containers": [{
                "name": "game",
                "image": config.image,
                "ports": [{ "containerPort": GAME_PORT }],
                "env": [{ "name": "VNC_PASSWORD", "value": vnc_password }],
                "resources": {
                    "requests": { "memory": "256Mi", "cpu": "250m" },
                    "limits": { "memory": "512Mi", "cpu": "500m" },
                },
                "volumeMounts": [{ "name": "saves", "mountPath": "/saves" }],
            }],
            "volumes": [{
                "name": "saves",
                "hostPath": {
                    "path": format!("{}/{user_id}", config.saves_host_path),
                    "type": "DirectoryOrCreate",
                },
            }],
        },
    })
}

pub fn service_manifest(config: &GameConfig, user_id: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": service_name(user_id),
            "namespace": config.namespace,
        },
        "spec": {
            "selector": { "app": "cm-game", "user": user_tag(user_id) },
            "ports": [{ "port": GAME_PORT, "targetPort": GAME_PORT }],
        },
    })
}

pub fn middleware_manifest(config: &GameConfig, user_id: &str) -> Value {
    json!({
        "apiVersion": "traefik.io/v1alpha1",
        "kind": "Middleware",
        "metadata": {
            "name": middleware_name(user_id),
            "namespace": config.namespace,
        },
        "spec": {
            "stripPrefix": { "prefixes": [play_path(user_id)] },
        },
    })
}

pub fn ingress_manifest(config: &GameConfig, user_id: &str) -> Value {
    json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "Ingress",
        "metadata": {
            "name": ingress_name(user_id),
            "namespace": config.namespace,
            "annotations": {
                "traefik.ingress.kubernetes.io/router.entrypoints": "websecure",
                "traefik.ingress.kubernetes.io/router.middlewares":
                    format!("{}-{}@kubernetescrd", config.namespace, middleware_name(user_id)),
            },
        },
        "spec": {
            "rules": [{
                "host": config.domain,
                "http": {
                    "paths": [{
                        "path": play_path(user_id),
                        "pathType": "Prefix",
                        "backend": {
                            "service": {
                                "name": service_name(user_id),
                                "port": { "number": GAME_PORT },
                            },
                        },
                    }],
                },
            }],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_derive_from_the_first_eight_chars() {
        let user = "4f9b2c81-aaaa-bbbb-cccc-000000000000";
        assert_eq!(pod_name(user), "cm-game-4f9b2c81");
        assert_eq!(service_name(user), "cm-game-svc-4f9b2c81");
        assert_eq!(ingress_name(user), "cm-game-ing-4f9b2c81");
        assert_eq!(middleware_name(user), "cm-game-mw-4f9b2c81");
    }

    #[test]
    fn short_ids_are_used_whole() {
        assert_eq!(pod_name("bob"), "cm-game-bob");
    }

    #[test]
    fn viewer_url_matches_the_stripped_prefix() {
        let url = viewer_url("game.example.com", "4f9b2c81");
        assert_eq!(
            url,
            "https://game.example.com/play/4f9b2c81/vnc_lite.html?autoconnect=true&scale=true&path=play/4f9b2c81/websockify"
        );
    }

    #[test]
    fn middleware_strips_the_ingress_path() {
        let config = GameConfig::default();
        let user = "4f9b2c81";
        let mw = middleware_manifest(&config, user);
        let ing = ingress_manifest(&config, user);

        let stripped = mw["spec"]["stripPrefix"]["prefixes"][0].as_str().unwrap();
        let routed = ing["spec"]["rules"][0]["http"]["paths"][0]["path"]
            .as_str()
            .unwrap();
        assert_eq!(stripped, routed);
    }

    #[test]
    fn ingress_references_the_service_and_middleware() {
        let config = GameConfig::default();
        let user = "4f9b2c81";
        let ing = ingress_manifest(&config, user);

        let backend = ing["spec"]["rules"][0]["http"]["paths"][0]["backend"]["service"]["name"]
            .as_str()
            .unwrap();
        assert_eq!(backend, service_name(user));

        let annotation = ing["metadata"]["annotations"]
            ["traefik.ingress.kubernetes.io/router.middlewares"]
            .as_str()
            .unwrap();
        assert_eq!(annotation, "cm-games-cm-game-mw-4f9b2c81@kubernetescrd");
    }

    #[test]
    fn pod_env_carries_the_vnc_password() {
        let config = GameConfig::default();
        let pod = pod_manifest(&config, "4f9b2c81", "deadbeef");
        let env = &pod["spec"]["containers"][0]["env"][0];
        assert_eq!(env["name"], "VNC_PASSWORD");
        assert_eq!(env["value"], "deadbeef");
    }

    #[test]
    fn saves_volume_is_scoped_per_user() {
        let config = GameConfig::default();
        let pod = pod_manifest(&config, "4f9b2c81", "pw");
        let path = pod["spec"]["volumes"][0]["hostPath"]["path"].as_str().unwrap();
        assert_eq!(path, "/data/cm-saves/4f9b2c81");
    }

    #[test]
    fn api_paths_cover_all_four_kinds() {
        assert_eq!(
            ObjectKind::Pod.api_path("cm-games"),
            "/api/v1/namespaces/cm-games/pods"
        );
        assert_eq!(
            ObjectKind::Middleware.api_path("cm-games"),
            "/apis/traefik.io/v1alpha1/namespaces/cm-games/middlewares"
        );
    }
}
