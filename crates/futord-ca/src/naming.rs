//! Timestamp labels and the file names derived from them.
//!
//! Labels sort lexically in chronological order, so a directory listing
//! of key pairs is also their disclosure schedule. Whether a private key
//! may be released yet is decided by whoever distributes the files.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{CaError, Result};

/// Extension of public certificate files.
pub const PUBLIC_EXT: &str = "pub";

/// Extension of private key files.
pub const PRIVATE_EXT: &str = "priv";

const LABEL_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const UTC_SUFFIX: &str = "_UTC";

/// A sortable `YYYY-MM-DD_HH-MM-SS_UTC` key pair label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimestampLabel(String);

impl TimestampLabel {
    /// Label for an instant, truncated to whole seconds.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(format!("{}{UTC_SUFFIX}", at.format(LABEL_FORMAT)))
    }

    /// Label for the current instant.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Parse and validate a label.
    pub fn parse(label: &str) -> Result<Self> {
        parse_instant(label)?;
        Ok(Self(label.to_string()))
    }

    /// The instant the label names.
    pub fn not_before(&self) -> DateTime<Utc> {
        // Validated on construction.
        parse_instant(&self.0).unwrap_or_default()
    }

    /// The label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File names for the pair carrying this label.
    pub fn names(&self) -> KeyPairNames {
        KeyPairNames::for_label(&self.0)
    }
}

impl fmt::Display for TimestampLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn parse_instant(label: &str) -> Result<DateTime<Utc>> {
    let stamp = label.strip_suffix(UTC_SUFFIX).ok_or_else(|| {
        CaError::Argument(format!("label {label:?} does not end in {UTC_SUFFIX}"))
    })?;
    NaiveDateTime::parse_from_str(stamp, LABEL_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| CaError::Argument(format!("label {label:?} is not a timestamp: {e}")))
}

/// Public and private file names of one key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPairNames {
    /// Certificate file (`<label>.pub`)
    pub public: PathBuf,
    /// Private key file (`<label>.priv`)
    pub private: PathBuf,
}

impl KeyPairNames {
    /// Names for any label, timestamp or not.
    pub fn for_label(label: &str) -> Self {
        Self {
            public: PathBuf::from(format!("{label}.{PUBLIC_EXT}")),
            private: PathBuf::from(format!("{label}.{PRIVATE_EXT}")),
        }
    }
}

/// Common name bound to a certificate file: its basename.
pub fn common_name_for(public_name: &Path) -> Result<String> {
    public_name
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            CaError::Argument(format!(
                "public name {} has no usable basename",
                public_name.display()
            ))
        })
}
