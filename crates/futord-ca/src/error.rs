//! Error types for key authority operations.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for key authority operations.
pub type Result<T> = std::result::Result<T, CaError>;

/// A step of the key pipeline, reported with [`CaError::KeyGeneration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// RSA private key generation
    GenerateKey,
    /// Loading a private key into the signing engine
    LoadKey,
    /// Loading a certificate from disk
    LoadCertificate,
    /// Building the certificate signing request
    BuildRequest,
    /// Self-signing the root certificate
    SelfSign,
    /// Signing a request with the root key
    SignRequest,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::GenerateKey => "key generation",
            Self::LoadKey => "key load",
            Self::LoadCertificate => "certificate load",
            Self::BuildRequest => "signing request",
            Self::SelfSign => "self-signing",
            Self::SignRequest => "CA signing",
        };
        f.write_str(s)
    }
}

/// Errors that can occur while managing a key directory.
#[derive(Error, Debug)]
pub enum CaError {
    /// A required argument was missing or unusable.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// The crypto engine reported failure.
    #[error("{step} failed: {reason}")]
    KeyGeneration {
        /// Which pipeline step failed
        step: Step,
        /// Engine error message
        reason: String,
    },

    /// Reading or writing key material failed.
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        /// Path being accessed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The CA serial side file could not be parsed.
    #[error("serial counter at {} is corrupt: {reason}", path.display())]
    SerialCounter {
        /// Serial file path
        path: PathBuf,
        /// Why parsing failed
        reason: String,
    },

    /// A certificate did not verify against its trust anchor.
    #[error("verification failed: {0}")]
    Verification(String),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl CaError {
    /// Build a filesystem error for `path`.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Build a key generation error for `step`.
    pub fn key_gen(step: Step, reason: impl fmt::Display) -> Self {
        Self::KeyGeneration {
            step,
            reason: reason.to_string(),
        }
    }

    /// Returns true if a required argument was missing.
    #[must_use]
    pub const fn is_argument(&self) -> bool {
        matches!(self, Self::Argument(_))
    }

    /// Returns true if the crypto engine failed.
    #[must_use]
    pub const fn is_key_generation(&self) -> bool {
        matches!(self, Self::KeyGeneration { .. })
    }

    /// Returns true if the error came from the filesystem.
    #[must_use]
    pub const fn is_filesystem(&self) -> bool {
        matches!(self, Self::Filesystem { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_generation_message_names_step() {
        let err = CaError::key_gen(Step::SignRequest, "bad issuer");
        assert_eq!(err.to_string(), "CA signing failed: bad issuer");
        assert!(err.is_key_generation());
        assert!(!err.is_filesystem());
    }

    #[test]
    fn filesystem_message_names_path() {
        let err = CaError::io(
            "/tmp/keys/root.priv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/keys/root.priv"));
        assert!(err.is_filesystem());
    }
}
