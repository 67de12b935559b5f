//! Authorization configuration
//!
//! ```toml
//! auth_enabled = true
//! enable_localhost_auth_bypass = true
//! arbiter = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{config_err, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorizationConfig {
    /// When false every authorization check passes.
    pub auth_enabled: bool,
    /// Allow local connections to bootstrap the first user while no users exist.
    pub enable_localhost_auth_bypass: bool,
    /// This node only votes in elections and holds no data.
    pub arbiter: bool,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        AuthorizationConfig {
            auth_enabled: true,
            enable_localhost_auth_bypass: true,
            arbiter: false,
        }
    }
}

impl AuthorizationConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(config_err)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(config_err)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = AuthorizationConfig::from_toml_str("arbiter = true").unwrap();
        assert!(config.auth_enabled);
        assert!(config.enable_localhost_auth_bypass);
        assert!(config.arbiter);
        assert_eq!(AuthorizationConfig::from_toml_str("").unwrap(), AuthorizationConfig::default());
    }

    #[test]
    fn test_rejects_unknown_and_mistyped_keys() {
        assert!(AuthorizationConfig::from_toml_str("auth_enabled = \"yes\"").is_err());
        assert!(AuthorizationConfig::from_toml_str("authEnabled = true").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("authz.toml");
        std::fs::write(&path, "auth_enabled = false\nenable_localhost_auth_bypass = false\n").unwrap();
        let config = AuthorizationConfig::from_file(&path).unwrap();
        assert!(!config.auth_enabled);
        assert!(!config.enable_localhost_auth_bypass);
        assert!(AuthorizationConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
