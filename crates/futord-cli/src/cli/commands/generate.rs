//! `futord generate` - mint the key pair for one release time.

use anyhow::Result;
use colored::Colorize;
use futord_ca::{BackendKind, TimestampLabel};
use serde_json::json;

use super::Context;
use crate::cli::args::GenerateArgs;
use crate::output::{print_json, OutputFormat};

pub fn execute(ctx: &Context, args: GenerateArgs) -> Result<()> {
    let label = match (args.label, args.at) {
        (Some(label), _) => TimestampLabel::parse(&label)?,
        (None, Some(at)) => TimestampLabel::from_datetime(at),
        (None, None) => TimestampLabel::now(),
    };
    let names = label.names();
    let dir = ctx.key_directory();

    if dir.resolve(&names.public).exists() || dir.resolve(&names.private).exists() {
        anyhow::bail!(
            "key pair {} already exists in {}",
            label,
            dir.path().display()
        );
    }

    ctx.backend().generate(
        &names.public,
        &names.private,
        dir.path(),
        ctx.config.bits,
        &ctx.config.fields,
    )?;

    let verified = match ctx.config.backend {
        BackendKind::Ca => Some(futord_ca::check_pair(&dir, &names)?),
        BackendKind::Plain => None,
    };

    match ctx.output_format {
        OutputFormat::Json => print_json(&json!({
            "label": label.as_str(),
            "release_at": label.not_before().to_rfc3339(),
            "public": dir.resolve(&names.public),
            "private": dir.resolve(&names.private),
            "certificate": verified,
        })),
        OutputFormat::Pretty => {
            println!("{} {}", "Issued:".green().bold(), label.as_str().cyan());
            println!("  {} {}", "public:".bold(), dir.resolve(&names.public).display());
            println!("  {} {}", "private:".bold(), dir.resolve(&names.private).display());
            println!(
                "  {} {}",
                "release at:".bold(),
                label.not_before().to_rfc3339()
            );
            if let Some(cert) = verified {
                println!("  {} {}", "serial:".bold(), cert.serial);
            }
            Ok(())
        }
    }
}
