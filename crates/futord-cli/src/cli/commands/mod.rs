//! Command implementations.

pub mod check;
pub mod config;
pub mod generate;
pub mod init;
pub mod list;
pub mod verify;

use std::path::PathBuf;

use futord_ca::{FutordConfig, KeyBackend, KeyDirectory};

use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration (file plus flags)
    pub config: FutordConfig,

    /// Where the configuration was read from
    pub config_path: PathBuf,

    /// Output format
    pub output_format: OutputFormat,

    /// Verbose output
    pub verbose: bool,
}

impl Context {
    /// The configured key directory.
    pub fn key_directory(&self) -> KeyDirectory {
        KeyDirectory::new(&self.config.key_dir)
    }

    /// The configured issuance backend.
    pub fn backend(&self) -> Box<dyn KeyBackend> {
        self.config.build_backend()
    }
}
