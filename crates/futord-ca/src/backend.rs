//! Swappable key issuance backends.
//!
//! A scheduler drives every backend through the same two calls: `init`
//! once per key directory (safe to repeat), then `generate` once per
//! period.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::directory::{self, KeyDirectory};
use crate::issuer::KeyPairIssuer;
use crate::keygen::RsaKey;
use crate::root::RootAuthorityManager;
use crate::subject::{ConfiguredFields, SubjectTemplate};
use crate::{CaError, Result, ValidityPeriod};

/// Capability set every issuance backend provides.
pub trait KeyBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Prepare `key_dir` for issuance.
    fn init(&self, key_dir: &Path, bits: usize, fields: &ConfiguredFields) -> Result<()>;

    /// Produce one key pair at `public_name` / `private_name`.
    fn generate(
        &self,
        public_name: &Path,
        private_name: &Path,
        key_dir: &Path,
        bits: usize,
        fields: &ConfiguredFields,
    ) -> Result<()>;
}

/// Which backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Root authority plus root-signed certificates
    #[default]
    Ca,
    /// Bare RSA key pairs, no certificates
    Plain,
}

impl FromStr for BackendKind {
    type Err = CaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ca" => Ok(Self::Ca),
            "plain" => Ok(Self::Plain),
            _ => Err(CaError::Argument(format!(
                "unknown backend {s:?}, expected \"ca\" or \"plain\""
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ca => f.write_str("ca"),
            Self::Plain => f.write_str("plain"),
        }
    }
}

/// Root authority backend: `init` ensures the root, `generate` issues.
#[derive(Debug, Clone)]
pub struct CaBackend {
    template: SubjectTemplate,
    root_validity: ValidityPeriod,
    issued_validity: ValidityPeriod,
}

impl Default for CaBackend {
    fn default() -> Self {
        Self::new(SubjectTemplate::default())
    }
}

impl CaBackend {
    /// Backend using `template` for subjects.
    pub const fn new(template: SubjectTemplate) -> Self {
        Self {
            template,
            root_validity: ValidityPeriod::Root,
            issued_validity: ValidityPeriod::Issued(crate::DEFAULT_ISSUED_VALIDITY_DAYS),
        }
    }

    /// Override certificate lifetimes.
    #[must_use]
    pub fn with_validity(mut self, root: ValidityPeriod, issued: ValidityPeriod) -> Self {
        self.root_validity = root;
        self.issued_validity = issued;
        self
    }
}

impl KeyBackend for CaBackend {
    fn name(&self) -> &'static str {
        "ca"
    }

    fn init(&self, key_dir: &Path, bits: usize, fields: &ConfiguredFields) -> Result<()> {
        RootAuthorityManager::from_fields(KeyDirectory::new(key_dir), bits, &self.template, fields)?
            .with_validity(self.root_validity)
            .ensure_root()?;
        Ok(())
    }

    fn generate(
        &self,
        public_name: &Path,
        private_name: &Path,
        key_dir: &Path,
        bits: usize,
        fields: &ConfiguredFields,
    ) -> Result<()> {
        KeyPairIssuer::from_fields(
            KeyDirectory::new(key_dir),
            bits,
            self.template.clone(),
            fields.clone(),
        )?
        .with_validity(self.issued_validity)
        .issue(public_name, private_name)?;
        Ok(())
    }
}

/// Bare key pair backend: a private key and its PEM public key, no CA.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainKeyBackend;

impl KeyBackend for PlainKeyBackend {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn init(&self, key_dir: &Path, _bits: usize, _fields: &ConfiguredFields) -> Result<()> {
        KeyDirectory::new(key_dir).ensure_exists()
    }

    fn generate(
        &self,
        public_name: &Path,
        private_name: &Path,
        key_dir: &Path,
        bits: usize,
        _fields: &ConfiguredFields,
    ) -> Result<()> {
        if public_name.as_os_str().is_empty() || private_name.as_os_str().is_empty() {
            return Err(CaError::Argument(
                "both public and private names are required".into(),
            ));
        }

        let dir = KeyDirectory::new(key_dir);
        let public_path = dir.resolve(public_name);
        let private_path = dir.resolve(private_name);

        let key = RsaKey::generate(bits)?;
        directory::write_private(&private_path, key.private_key_pem())?;
        directory::write_public(&public_path, &key.public_key_pem()?)?;

        info!(public = %public_path.display(), bits, "generated plain key pair");
        Ok(())
    }
}

impl BackendKind {
    /// Instantiate the backend.
    pub fn build(self, template: SubjectTemplate, root: ValidityPeriod, issued: ValidityPeriod) -> Box<dyn KeyBackend> {
        match self {
            Self::Ca => Box::new(CaBackend::new(template).with_validity(root, issued)),
            Self::Plain => Box::new(PlainKeyBackend),
        }
    }
}
