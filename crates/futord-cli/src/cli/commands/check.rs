//! `futord check` - completeness check for one issued pair.

use anyhow::Result;
use colored::Colorize;
use futord_ca::{check_pair, KeyPairNames};

use super::Context;
use crate::cli::args::CheckArgs;
use crate::output::{print_json, OutputFormat};

pub fn execute(ctx: &Context, args: CheckArgs) -> Result<()> {
    let dir = ctx.key_directory();
    let names = KeyPairNames::for_label(&args.label);
    let verified = check_pair(&dir, &names)?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&verified),
        OutputFormat::Pretty => {
            println!(
                "{} {} (serial {})",
                "Complete:".green().bold(),
                args.label.cyan(),
                verified.serial
            );
            Ok(())
        }
    }
}
