use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 27015;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MockConfig {
    /// Host the client connects to.
    pub host: String,
    /// TCP port the server listens on and the client connects to.
    pub port: u16,
    /// Source port stamped into client segments.
    pub client_port: u16,
    /// Source port stamped into server segments.
    pub server_port: u16,
    /// Seed for initial sequence numbers. Random when absent.
    pub seed: Option<u64>,
    /// Directory receiving `client.out` / `server.out`.
    pub log_dir: PathBuf,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            client_port: DEFAULT_PORT,
            server_port: DEFAULT_PORT,
            seed: None,
            log_dir: PathBuf::from("."),
        }
    }
}

/// Partial configuration, as read from a TOML file.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct MockConfigOverride {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub client_port: Option<u16>,
    pub server_port: Option<u16>,
    pub seed: Option<u64>,
    pub log_dir: Option<PathBuf>,
}

impl MockConfigOverride {
    pub fn apply_to(&self, config: &mut MockConfig) {
        if let Some(v) = &self.host {
            config.host = v.clone();
        }
        if let Some(v) = self.port {
            config.port = v;
        }
        if let Some(v) = self.client_port {
            config.client_port = v;
        }
        if let Some(v) = self.server_port {
            config.server_port = v;
        }
        if let Some(v) = self.seed {
            config.seed = Some(v);
        }
        if let Some(v) = &self.log_dir {
            config.log_dir = v.clone();
        }
    }
}
