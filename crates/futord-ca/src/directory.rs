//! Key directory layout and file IO.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::naming::{PRIVATE_EXT, PUBLIC_EXT};
use crate::{CaError, Result};

/// Root private key file name.
pub const ROOT_KEY_FILE: &str = "root.priv";
/// Root certificate file name.
pub const ROOT_CERT_FILE: &str = "root.pub";
/// Instructions file name.
pub const README_FILE: &str = "README.txt";
/// CA serial side file name.
pub const SERIAL_FILE: &str = "root.srl";

/// A directory holding one root authority and its issued key pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDirectory {
    path: PathBuf,
}

impl KeyDirectory {
    /// Wrap a directory path. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory if it is missing.
    pub fn ensure_exists(&self) -> Result<()> {
        fs::create_dir_all(&self.path).map_err(|e| CaError::io(&self.path, e))
    }

    /// Path of the root private key.
    pub fn root_key(&self) -> PathBuf {
        self.path.join(ROOT_KEY_FILE)
    }

    /// Path of the root certificate.
    pub fn root_cert(&self) -> PathBuf {
        self.path.join(ROOT_CERT_FILE)
    }

    /// Path of the instructions file.
    pub fn readme(&self) -> PathBuf {
        self.path.join(README_FILE)
    }

    /// Path of the CA serial side file.
    pub fn serial_file(&self) -> PathBuf {
        self.path.join(SERIAL_FILE)
    }

    /// Resolve a caller-supplied name. Relative names live in the directory.
    pub fn resolve(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// True when both root files exist.
    pub fn has_root(&self) -> bool {
        self.root_key().is_file() && self.root_cert().is_file()
    }

    /// Labels of issued key pairs, in lexical (and so chronological) order.
    ///
    /// A label is listed if either half of its pair is present.
    pub fn labels(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.path).map_err(|e| CaError::io(&self.path, e))?;

        let mut labels = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CaError::io(&self.path, e))?;
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !matches!(ext, Some(PUBLIC_EXT | PRIVATE_EXT)) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem == "root" {
                continue;
            }
            labels.push(stem.to_string());
        }

        labels.sort_unstable();
        labels.dedup();
        Ok(labels)
    }
}

/// Read a UTF-8 file.
pub(crate) fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| CaError::io(path, e))
}

/// Write a file readable by anyone.
pub(crate) fn write_public(path: &Path, contents: &str) -> Result<()> {
    debug!(path = %path.display(), bytes = contents.len(), "writing file");
    fs::write(path, contents).map_err(|e| CaError::io(path, e))
}

/// Write a file readable only by its owner.
pub(crate) fn write_private(path: &Path, contents: &str) -> Result<()> {
    debug!(path = %path.display(), "writing private key");
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(|e| CaError::io(path, e))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| CaError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn layout_paths() {
        let dir = KeyDirectory::new("/srv/keys");
        assert_eq!(dir.root_key(), PathBuf::from("/srv/keys/root.priv"));
        assert_eq!(dir.root_cert(), PathBuf::from("/srv/keys/root.pub"));
        assert_eq!(dir.readme(), PathBuf::from("/srv/keys/README.txt"));
        assert_eq!(dir.serial_file(), PathBuf::from("/srv/keys/root.srl"));
        assert_eq!(dir.resolve("/abs/x.pub"), PathBuf::from("/abs/x.pub"));
        assert_eq!(dir.resolve("x.pub"), PathBuf::from("/srv/keys/x.pub"));
    }

    #[test]
    fn labels_are_sorted_and_skip_root() {
        let tmp = TempDir::new().unwrap();
        let dir = KeyDirectory::new(tmp.path());
        for name in [
            "2031-01-01_00-00-00_UTC.pub",
            "2031-01-01_00-00-00_UTC.priv",
            "2030-06-01_12-00-00_UTC.priv",
            "root.pub",
            "root.priv",
            "README.txt",
        ] {
            fs::write(tmp.path().join(name), "x").unwrap();
        }

        assert_eq!(
            dir.labels().unwrap(),
            vec!["2030-06-01_12-00-00_UTC", "2031-01-01_00-00-00_UTC"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn private_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("k.priv");
        write_private(&path, "secret").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn missing_directory_is_filesystem_error() {
        let tmp = TempDir::new().unwrap();
        let dir = KeyDirectory::new(tmp.path().join("nope"));
        assert!(dir.labels().unwrap_err().is_filesystem());
    }
}
