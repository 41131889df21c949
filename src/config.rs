//! Client configuration and on-disk layout
//!
//! The client keeps three separate durable artifacts: a small non-secret
//! configuration document, the trust-store state file, and the private key
//! material. [`Paths`] fixes where each lives under one base directory;
//! [`ClientConfig`] is the configuration document itself.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

/// Non-secret client-wide configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Alternate server URL for relayed connections. Unset means the
    /// transport's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
}

impl ClientConfig {
    /// Load the configuration document, creating a default one on first run.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let config = Self::default();
            config.save(path)?;
            info!("created default client configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Save the configuration document.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// On-disk layout of the client's durable artifacts
#[derive(Debug, Clone)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Per-user default location
    pub fn default_location() -> Self {
        let base_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("edge-pairing");
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Client configuration document
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config").join("client.toml")
    }

    /// Trust-store snapshot
    pub fn state_file(&self) -> PathBuf {
        self.base_dir.join("state").join("bookmarks.json")
    }

    /// Private key material, read by the transport at connect time
    pub fn key_file(&self) -> PathBuf {
        self.base_dir.join("keys").join("client.key")
    }

    /// Ensure all artifact directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for sub in ["config", "state", "keys"] {
            fs::create_dir_all(self.base_dir.join(sub))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_layout() {
        let paths = Paths::new("/tmp/edge-test");
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/tmp/edge-test/config/client.toml")
        );
        assert_eq!(
            paths.state_file(),
            PathBuf::from("/tmp/edge-test/state/bookmarks.json")
        );
        assert_eq!(
            paths.key_file(),
            PathBuf::from("/tmp/edge-test/keys/client.key")
        );
    }

    #[test]
    fn test_ensure_directories() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path().join("home"));
        paths.ensure_directories().unwrap();
        assert!(paths.config_file().parent().unwrap().is_dir());
        assert!(paths.state_file().parent().unwrap().is_dir());
        assert!(paths.key_file().parent().unwrap().is_dir());
    }

    #[test]
    fn test_load_creates_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config").join("client.toml");

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.server_url, None);
        assert!(path.exists());

        // loading again reads the file that was just written
        let again = ClientConfig::load(&path).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_config_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("client.toml");

        let config = ClientConfig {
            server_url: Some("https://custom.example.com".to_string()),
        };
        config.save(&path).unwrap();

        let loaded = ClientConfig::load(&path).unwrap();
        assert_eq!(loaded.server_url.as_deref(), Some("https://custom.example.com"));
    }
}
