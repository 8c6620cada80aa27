//! Command-line argument definitions using clap.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use futord_ca::BackendKind;

use crate::output::OutputFormat;

/// Delayed-disclosure key authority
///
/// Publishes a root certificate and mints one key pair per release
/// timestamp. Public halves are released up front, private halves when
/// their timestamp passes.
#[derive(Parser, Debug)]
#[command(name = "futord")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(short, long, env = "FUTORD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Key directory (overrides config)
    #[arg(short = 'd', long, env = "FUTORD_KEY_DIR", global = true)]
    pub key_dir: Option<PathBuf>,

    /// RSA modulus length in bits (overrides config)
    #[arg(short, long, global = true)]
    pub bits: Option<usize>,

    /// Issuance backend: ca or plain (overrides config)
    #[arg(long, global = true, value_parser = parse_backend)]
    pub backend: Option<BackendKind>,

    /// Subject field as KEY=VALUE, repeatable (e.g. instance_name=lab)
    #[arg(short = 'f', long = "field", global = true, value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the root authority if missing and refresh the README
    Init,

    /// Mint the key pair for a release timestamp
    Generate(GenerateArgs),

    /// Verify a certificate against the root and its file name
    Verify(VerifyArgs),

    /// Check an issued pair: both halves present, signed, matching
    Check(CheckArgs),

    /// List issued labels in release order
    List,

    /// Show CLI configuration
    Config(ConfigArgs),
}

// ============================================================================
// Generate command
// ============================================================================

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Exact label to issue (e.g. 2030-01-01_00-00-00_UTC)
    #[arg(short, long, conflicts_with = "at")]
    pub label: Option<String>,

    /// Release time as RFC 3339 (e.g. 2030-01-01T00:00:00Z)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

// ============================================================================
// Verify command
// ============================================================================

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Certificate to verify
    pub cert: PathBuf,

    /// Trust anchor (default: root.pub in the key directory)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

// ============================================================================
// Check command
// ============================================================================

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Label of the pair (file names without extension)
    pub label: String,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Show config file path
    Path,
}

fn parse_backend(s: &str) -> Result<BackendKind, String> {
    s.parse().map_err(|e: futord_ca::CaError| e.to_string())
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in {s:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fields_split_on_first_equals() {
        assert_eq!(
            parse_field("instance_name=a=b").unwrap(),
            ("instance_name".to_string(), "a=b".to_string())
        );
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }

    #[test]
    fn label_and_at_conflict() {
        let res = Cli::try_parse_from([
            "futord",
            "generate",
            "--label",
            "2030-01-01_00-00-00_UTC",
            "--at",
            "2030-01-01T00:00:00Z",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["futord", "init", "--backend", "plain", "-f", "k=v"]).unwrap();
        assert_eq!(cli.backend, Some(BackendKind::Plain));
        assert_eq!(cli.fields, vec![("k".to_string(), "v".to_string())]);
        assert!(matches!(cli.command, Commands::Init));
    }
}
