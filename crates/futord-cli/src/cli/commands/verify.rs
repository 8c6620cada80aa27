//! `futord verify` - the checks a consumer runs on a published certificate.

use anyhow::Result;
use colored::Colorize;
use futord_ca::verify::check_identity_binding;
use futord_ca::verify_certificate;

use super::Context;
use crate::cli::args::VerifyArgs;
use crate::output::{print_json, OutputFormat};

pub fn execute(ctx: &Context, args: VerifyArgs) -> Result<()> {
    let root = args
        .root
        .unwrap_or_else(|| ctx.key_directory().root_cert());

    let verified = verify_certificate(&args.cert, &root)?;
    check_identity_binding(&verified, &args.cert)?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&verified),
        OutputFormat::Pretty => {
            println!("{} {}", "Verified:".green().bold(), args.cert.display());
            println!("  {} {}", "signed by:".bold(), verified.issuer);
            println!("  {} {}", "CN:".bold(), verified.common_name);
            println!("  {} {}", "serial:".bold(), verified.serial);
            println!(
                "  {} {} .. {}",
                "valid:".bold(),
                verified.not_before.to_rfc3339(),
                verified.not_after.to_rfc3339()
            );
            if ctx.verbose {
                println!("  {} {}", "O:".bold(), verified.organization);
                println!("  {} {}", "OU:".bold(), verified.organizational_unit);
                println!("  {} {}", "root:".bold(), root.display());
            }
            Ok(())
        }
    }
}
