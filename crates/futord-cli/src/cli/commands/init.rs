//! `futord init` - create the root authority.

use anyhow::Result;
use colored::Colorize;
use futord_ca::verify::CertificateFile;
use serde_json::json;

use super::Context;
use crate::output::{print_json, OutputFormat};

pub fn execute(ctx: &Context) -> Result<()> {
    let backend = ctx.backend();
    let dir = ctx.key_directory();
    backend.init(dir.path(), ctx.config.bits, &ctx.config.fields)?;

    // Only the CA backend leaves a root certificate behind
    let root = if dir.root_cert().is_file() {
        Some(CertificateFile::read(dir.root_cert())?.describe()?)
    } else {
        None
    };

    match ctx.output_format {
        OutputFormat::Json => print_json(&json!({
            "backend": backend.name(),
            "key_dir": dir.path(),
            "root": root,
        })),
        OutputFormat::Pretty => {
            println!(
                "{} {} initialized ({} backend)",
                "Ready:".green().bold(),
                dir.path().display(),
                backend.name().cyan()
            );
            if let Some(root) = root {
                println!("  {} {}", "root:".bold(), dir.root_cert().display());
                println!(
                    "  {} CN={}, O={}, OU={}",
                    "subject:".bold(),
                    root.common_name,
                    root.organization,
                    root.organizational_unit
                );
                println!("  {} {}", "expires:".bold(), root.not_after.to_rfc3339());
            }
            Ok(())
        }
    }
}
