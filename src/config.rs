// Immutable process configuration, read from the environment exactly once
// at startup and passed into components. No component reads ambient env.

use crate::models::NodeRole;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub swarm: SwarmConfig,
    pub docker: DockerConfig,
    pub metrics: MetricsPorts,
    pub http: HttpConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared secret compared for exact equality against the `token` header.
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct SwarmConfig {
    /// Name of the attachable overlay network the proxy joins on managers.
    pub network: String,
    pub role: NodeRole,
    /// The proxy's own container reference for connectNetwork, taken from
    /// the container hostname.
    pub container_id: String,
}

#[derive(Debug, Clone)]
pub struct DockerConfig {
    pub socket_path: String,
}

/// Which engine port to contact per node role during metrics collection.
#[derive(Debug, Clone, Copy)]
pub struct MetricsPorts {
    pub manager: u16,
    pub worker: u16,
}

impl MetricsPorts {
    pub fn for_role(&self, role: NodeRole) -> u16 {
        match role {
            NodeRole::Manager => self.manager,
            NodeRole::Worker => self.worker,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per outbound call; a hung remote stalls only its own entry up to this.
    pub request_timeout_ms: u64,
    /// Concurrency cap for per-node / per-container / per-task fan-out.
    pub fanout_limit: usize,
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_env_map(&env)
    }

    /// Build from an explicit map (e.g. for tests, so no test mutates
    /// process environment).
    pub fn from_env_map(env: &HashMap<String, String>) -> anyhow::Result<Self> {
        let get = |key: &str| env.get(key).map(String::as_str).filter(|v| !v.is_empty());

        let config = AppConfig {
            server: ServerConfig {
                port: parse_or(get("DOCKER_API_PORT"), 2376, "DOCKER_API_PORT")?,
                cert_path: get("DOCKER_API_CERT")
                    .unwrap_or("/certs/client-cert.pem")
                    .to_string(),
                key_path: get("DOCKER_API_KEY")
                    .unwrap_or("/certs/client-key.pem")
                    .to_string(),
            },
            auth: AuthConfig {
                token: get("DOCKER_API_TOKEN").unwrap_or_default().to_string(),
            },
            swarm: SwarmConfig {
                network: get("SWARM_NETWORK").unwrap_or("soajsnet").to_string(),
                role: NodeRole::from_docker(get("NODE_TYPE").unwrap_or("worker")),
                container_id: get("HOSTNAME").unwrap_or_default().to_string(),
            },
            docker: DockerConfig {
                socket_path: get("DOCKER_SOCKET_PATH")
                    .unwrap_or("/var/run/docker.sock")
                    .to_string(),
            },
            metrics: MetricsPorts {
                manager: parse_or(
                    get("DOCKER_API_MAINTENANCE_MANAGER_PORT"),
                    2376,
                    "DOCKER_API_MAINTENANCE_MANAGER_PORT",
                )?,
                worker: parse_or(
                    get("DOCKER_API_MAINTENANCE_WORKER_PORT"),
                    2376,
                    "DOCKER_API_MAINTENANCE_WORKER_PORT",
                )?,
            },
            http: HttpConfig {
                request_timeout_ms: parse_or(
                    get("DOCKER_API_REQUEST_TIMEOUT_MS"),
                    10_000,
                    "DOCKER_API_REQUEST_TIMEOUT_MS",
                )?,
                fanout_limit: parse_or(
                    get("DOCKER_API_FANOUT_LIMIT"),
                    64,
                    "DOCKER_API_FANOUT_LIMIT",
                )?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "DOCKER_API_PORT must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.auth.token.is_empty(),
            "DOCKER_API_TOKEN must be set and non-empty"
        );
        anyhow::ensure!(
            !self.swarm.network.is_empty(),
            "SWARM_NETWORK must be non-empty"
        );
        anyhow::ensure!(
            !self.docker.socket_path.is_empty(),
            "DOCKER_SOCKET_PATH must be non-empty"
        );
        anyhow::ensure!(
            self.http.request_timeout_ms > 0,
            "DOCKER_API_REQUEST_TIMEOUT_MS must be > 0, got {}",
            self.http.request_timeout_ms
        );
        anyhow::ensure!(
            self.http.fanout_limit > 0,
            "DOCKER_API_FANOUT_LIMIT must be > 0, got {}",
            self.http.fanout_limit
        );
        if self.swarm.role == NodeRole::Manager {
            anyhow::ensure!(
                !self.swarm.container_id.is_empty(),
                "HOSTNAME must be set on manager nodes (used to join the overlay network)"
            );
        }
        Ok(())
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<&str>, default: T, key: &str) -> anyhow::Result<T> {
    match value {
        Some(s) => s
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has invalid value {:?}", key, s)),
        None => Ok(default),
    }
}
