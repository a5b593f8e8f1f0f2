//! Client configuration from environment variables.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use libp2p::Multiaddr;
use tracing::warn;

use palaver_shared::constants::DEFAULT_QUIC_PORT;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base directory for the snapshot and identity key. Defaults to the
    /// platform data directory.
    pub data_dir: Option<PathBuf>,
    pub listen_port: u16,
    /// Bootstrap node addresses for the rendezvous layer.
    pub bootstrap: Vec<Multiaddr>,
    /// Peer ids to open links to at startup.
    pub connect: Vec<String>,
    /// Account service root.
    pub auth_base_url: String,
    /// Reply-generation endpoint for the assistant; `None` disables it.
    pub generator_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            listen_port: DEFAULT_QUIC_PORT,
            bootstrap: Vec::new(),
            connect: Vec::new(),
            auth_base_url: "http://localhost:3001".to_string(),
            generator_url: None,
        }
    }
}

impl ClientConfig {
    /// Read configuration from `PALAVER_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: std::env::var("PALAVER_DATA_DIR").ok().map(PathBuf::from),
            listen_port: std::env::var("PALAVER_LISTEN_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.listen_port),
            bootstrap: std::env::var("PALAVER_BOOTSTRAP")
                .map(|v| parse_multiaddrs(&v))
                .unwrap_or_default(),
            connect: std::env::var("PALAVER_CONNECT")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            auth_base_url: std::env::var("PALAVER_AUTH_URL").unwrap_or(defaults.auth_base_url),
            generator_url: std::env::var("PALAVER_GENERATOR_URL").ok(),
        }
    }

    pub fn snapshot_path(&self) -> Result<PathBuf> {
        Ok(self.base_dir()?.join("state.json"))
    }

    pub fn identity_path(&self) -> Result<PathBuf> {
        Ok(self.base_dir()?.join("identity.key"))
    }

    fn base_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        ProjectDirs::from("com", "palaver", "palaver")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| anyhow!("Could not determine platform data directory"))
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a comma-separated multiaddr list, dropping entries that do not
/// parse (with a warning) instead of failing startup.
fn parse_multiaddrs(value: &str) -> Vec<Multiaddr> {
    parse_list(value)
        .into_iter()
        .filter_map(|entry| match entry.parse() {
            Ok(addr) => Some(addr),
            Err(e) => {
                warn!(entry = %entry, error = %e, "Skipping unparseable bootstrap address");
                None
            }
        })
        .collect()
}
