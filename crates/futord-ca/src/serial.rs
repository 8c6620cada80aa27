//! CA serial counter.
//!
//! Stored next to the root as `root.srl`, uppercase hex, holding the last
//! serial handed out. An absent file counts as zero. Updates go through a
//! temp file and a rename so a crash never leaves a half-written counter.
//!
//! Every counter on the same file shares one process-wide lock, however
//! many managers or backends were built for the directory. Other processes
//! are not locked out.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::debug;

use crate::{CaError, Result};

/// Monotonic serial source for certificates signed by one root.
#[derive(Debug)]
pub struct SerialCounter {
    path: PathBuf,
}

type LockRegistry = Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>;

/// One lock per serial file, keyed by canonical path.
static LOCKS: OnceLock<LockRegistry> = OnceLock::new();

impl SerialCounter {
    /// Counter backed by `path`. The file is created on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Side file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last serial handed out, or 0 if none.
    pub fn current(&self) -> Result<u64> {
        let lock = self.shared_lock()?;
        let _guard = lock
            .lock()
            .map_err(|_| self.corrupt("lock poisoned by a panicked writer"))?;
        self.read()
    }

    /// Advance the counter and return the new serial.
    pub fn next(&self) -> Result<u64> {
        let lock = self.shared_lock()?;
        let _guard = lock
            .lock()
            .map_err(|_| self.corrupt("lock poisoned by a panicked writer"))?;
        let serial = self
            .read()?
            .checked_add(1)
            .ok_or_else(|| self.corrupt("counter exhausted"))?;
        self.write(serial)?;
        debug!(path = %self.path.display(), serial, "advanced CA serial");
        Ok(serial)
    }

    fn shared_lock(&self) -> Result<Arc<Mutex<()>>> {
        let mut locks = LOCKS
            .get_or_init(LockRegistry::default)
            .lock()
            .map_err(|_| self.corrupt("lock registry poisoned"))?;
        Ok(Arc::clone(locks.entry(self.lock_key()).or_default()))
    }

    /// `path` with its directory canonicalized, so `keys/root.srl` and
    /// `/srv/keys/root.srl` share a lock.
    fn lock_key(&self) -> PathBuf {
        let (Some(parent), Some(name)) = (self.path.parent(), self.path.file_name()) else {
            return self.path.clone();
        };
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        fs::canonicalize(parent).map_or_else(|_| self.path.clone(), |dir| dir.join(name))
    }

    fn read(&self) -> Result<u64> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CaError::io(&self.path, e)),
        };
        let hex = text.trim();
        if hex.is_empty() {
            return Ok(0);
        }
        u64::from_str_radix(hex, 16).map_err(|e| self.corrupt(format!("{hex:?}: {e}")))
    }

    fn write(&self, serial: u64) -> Result<()> {
        let tmp = self.path.with_extension("srl.tmp");
        fs::write(&tmp, format!("{serial:02X}\n")).map_err(|e| CaError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| CaError::io(&self.path, e))
    }

    fn corrupt(&self, reason: impl Into<String>) -> CaError {
        CaError::SerialCounter {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn starts_at_one_and_creates_file() {
        let tmp = TempDir::new().unwrap();
        let counter = SerialCounter::new(tmp.path().join("root.srl"));

        assert_eq!(counter.current().unwrap(), 0);
        assert_eq!(counter.next().unwrap(), 1);
        assert_eq!(counter.next().unwrap(), 2);
        assert_eq!(fs::read_to_string(counter.path()).unwrap(), "02\n");
    }

    #[test]
    fn continues_from_existing_openssl_style_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("root.srl");
        fs::write(&path, "1F\n").unwrap();

        let counter = SerialCounter::new(&path);
        assert_eq!(counter.next().unwrap(), 0x20);
        assert_eq!(SerialCounter::new(&path).current().unwrap(), 0x20);
    }

    #[test]
    fn garbage_is_reported_not_reset() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("root.srl");
        fs::write(&path, "not hex").unwrap();

        let err = SerialCounter::new(&path).next().unwrap_err();
        assert!(matches!(err, CaError::SerialCounter { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "not hex");
    }

    #[test]
    fn concurrent_callers_get_distinct_serials() {
        let tmp = TempDir::new().unwrap();
        let counter = Arc::new(SerialCounter::new(tmp.path().join("root.srl")));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    (0..10).map(|_| counter.next().unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (1..=80).collect::<Vec<_>>());
    }

    #[test]
    fn separate_counters_on_one_file_share_a_lock() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("root.srl");

        // A fresh counter per call, as each backend `generate` builds one
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    (0..10)
                        .map(|_| SerialCounter::new(&path).next().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (1..=80).collect::<Vec<_>>());
    }

    #[test]
    fn relative_and_absolute_paths_share_a_key() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("keys");
        fs::create_dir(&nested).unwrap();

        let direct = SerialCounter::new(nested.join("root.srl"));
        let dotted = SerialCounter::new(nested.join("..").join("keys").join("root.srl"));
        assert_eq!(direct.lock_key(), dotted.lock_key());
    }
}
