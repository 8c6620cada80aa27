//! Configuration management.

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use futord_ca::FutordConfig;
use std::path::{Path, PathBuf};

use crate::cli::args::Cli;

/// Default config file path.
pub fn default_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("org", "futorcap", "futord")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(dirs.config_dir().join("config.toml"))
}

/// Config file in effect: `--config` if given, otherwise the default.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_path(),
    }
}

/// Load configuration from file; a missing file yields defaults.
pub fn load(path: &Path) -> Result<FutordConfig> {
    FutordConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

/// Apply command-line overrides on top of the file configuration.
pub fn apply_overrides(config: &mut FutordConfig, cli: &Cli) {
    if let Some(dir) = &cli.key_dir {
        config.key_dir = dir.clone();
    }
    if let Some(bits) = cli.bits {
        config.bits = bits;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    for (key, value) in &cli.fields {
        config.fields.insert(key.clone(), value.clone());
    }
}
