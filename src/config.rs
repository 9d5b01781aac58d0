use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

/// Server configuration, constructed once and passed by reference into
/// [`Server::bind`](crate::server::reactor::Server::bind).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Listen port; 0 picks an ephemeral port.
    pub port: u16,
    /// Worker pool size. 0 runs all protocol work inline on the reactor
    /// thread, a valid fully-synchronous mode for low-traffic deployments.
    pub worker_threads: usize,
    /// Root directory for the static-file helper, if any.
    pub static_root: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            worker_threads: 0,
            static_root: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Loads from the file named by `HEARTH_CONFIG` when set, then applies
    /// `HEARTH_HOST` / `HEARTH_PORT` / `HEARTH_WORKERS` overrides. Falls back
    /// to defaults on any load failure.
    pub fn load() -> Self {
        let mut cfg = match std::env::var("HEARTH_CONFIG") {
            Ok(path) => Self::from_file(&path).unwrap_or_else(|e| {
                warn!("can't load config from {}: {}, using defaults", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        };

        if let Ok(host) = std::env::var("HEARTH_HOST") {
            cfg.host = host;
        }
        if let Ok(port) = std::env::var("HEARTH_PORT") {
            match port.parse() {
                Ok(port) => cfg.port = port,
                Err(_) => warn!("ignoring invalid HEARTH_PORT {:?}", port),
            }
        }
        if let Ok(workers) = std::env::var("HEARTH_WORKERS") {
            match workers.parse() {
                Ok(workers) => cfg.worker_threads = workers,
                Err(_) => warn!("ignoring invalid HEARTH_WORKERS {:?}", workers),
            }
        }

        cfg
    }

    /// The listen address as `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
