//! Key authority configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::{BackendKind, KeyBackend};
use crate::keygen::DEFAULT_RSA_BITS;
use crate::subject::{ConfiguredFields, SubjectTemplate};
use crate::{CaError, Result, ValidityPeriod, DEFAULT_ISSUED_VALIDITY_DAYS};

/// Configuration for a key directory and the backend issuing into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FutordConfig {
    /// Directory holding root and issued key pairs (default: `keys`).
    #[serde(default = "default_key_dir")]
    pub key_dir: PathBuf,

    /// RSA modulus length (default: 2048).
    #[serde(default = "default_bits")]
    pub bits: usize,

    /// Issuance backend (default: ca).
    #[serde(default)]
    pub backend: BackendKind,

    /// Lifetime of a newly created root, in days (default: no expiry).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_validity_days: Option<u32>,

    /// Lifetime of issued certificates, in days.
    #[serde(default = "default_issued_validity")]
    pub issued_validity_days: u32,

    /// Subject template for signing requests.
    #[serde(default)]
    pub subject: SubjectTemplate,

    /// Free-form fields interpolated into subjects (e.g. `instance_name`).
    #[serde(default)]
    pub fields: ConfiguredFields,
}

impl Default for FutordConfig {
    fn default() -> Self {
        Self {
            key_dir: default_key_dir(),
            bits: default_bits(),
            backend: BackendKind::default(),
            root_validity_days: None,
            issued_validity_days: default_issued_validity(),
            subject: SubjectTemplate::default(),
            fields: ConfiguredFields::default(),
        }
    }
}

impl FutordConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| CaError::io(path, e))?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CaError::Config(e.to_string()))
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CaError::Config(e.to_string()))
    }

    /// Root certificate lifetime.
    pub const fn root_validity(&self) -> ValidityPeriod {
        match self.root_validity_days {
            Some(days) => ValidityPeriod::Custom(days),
            None => ValidityPeriod::Root,
        }
    }

    /// Issued certificate lifetime.
    pub const fn issued_validity(&self) -> ValidityPeriod {
        ValidityPeriod::Issued(self.issued_validity_days)
    }

    /// Instantiate the configured backend.
    pub fn build_backend(&self) -> Box<dyn KeyBackend> {
        self.backend.build(
            self.subject.clone(),
            self.root_validity(),
            self.issued_validity(),
        )
    }
}

// Default value functions for serde.
fn default_key_dir() -> PathBuf {
    PathBuf::from("keys")
}

const fn default_bits() -> usize {
    DEFAULT_RSA_BITS
}

const fn default_issued_validity() -> u32 {
    DEFAULT_ISSUED_VALIDITY_DAYS
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = FutordConfig::default();
        assert_eq!(config.key_dir, PathBuf::from("keys"));
        assert_eq!(config.bits, 2048);
        assert_eq!(config.backend, BackendKind::Ca);
        assert_eq!(config.root_validity_days, None);
        assert_eq!(config.root_validity(), ValidityPeriod::Root);
        assert_eq!(config.subject.organization, "Futorcap");
        assert!(config.fields.get("instance_name").is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config = FutordConfig::from_toml(
            r#"
            key_dir = "/var/lib/futord"
            backend = "plain"

            [fields]
            instance_name = "tick"
            "#,
        )
        .unwrap();
        assert_eq!(config.key_dir, PathBuf::from("/var/lib/futord"));
        assert_eq!(config.backend, BackendKind::Plain);
        assert_eq!(config.bits, 2048);
        assert_eq!(config.fields.get("instance_name"), Some("tick"));
        assert_eq!(config.build_backend().name(), "plain");
    }

    #[test]
    fn test_finite_root_lifetime() {
        let config = FutordConfig::from_toml("root_validity_days = 30").unwrap();
        assert_eq!(config.root_validity(), ValidityPeriod::Custom(30));
        assert!(config.to_toml().unwrap().contains("root_validity_days = 30"));
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = FutordConfig::from_toml("bits = \"many\"").unwrap_err();
        assert!(matches!(err, CaError::Config(_)));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = FutordConfig::load(&tmp.path().join("none.toml")).unwrap();
        assert_eq!(config, FutordConfig::default());
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = FutordConfig::default();
        config.fields.insert("instance_name", "a");
        let text = config.to_toml().unwrap();
        assert_eq!(FutordConfig::from_toml(&text).unwrap(), config);

        let json = serde_json::to_string(&config).unwrap();
        let parsed: FutordConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.fields.get("instance_name"), Some("a"));
    }
}
