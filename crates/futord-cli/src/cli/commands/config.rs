//! `futord config` - inspect the effective configuration.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::output::{print_json, OutputFormat};

pub fn execute(ctx: &Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(ctx),
        ConfigCommands::Path => show_path(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    match ctx.output_format {
        OutputFormat::Json => print_json(config)?,
        OutputFormat::Pretty => {
            println!("{}", "Current Configuration:".bold());
            println!();
            println!("  {} {}", "key_dir:".bold(), config.key_dir.display());
            println!("  {} {}", "bits:".bold(), config.bits);
            println!("  {} {}", "backend:".bold(), config.backend);
            let root_days = config
                .root_validity_days
                .map_or_else(|| "(no expiry)".dimmed().to_string(), |d| d.to_string());
            println!("  {} {}", "root_validity_days:".bold(), root_days);
            println!("  {} {}", "issued_validity_days:".bold(), config.issued_validity_days);
            println!("  {} {}", "subject.organization:".bold(), config.subject.organization);
            println!(
                "  {} {}",
                "subject.organizational_unit:".bold(),
                config.subject.organizational_unit
            );
            for (key, value) in config.fields.iter() {
                println!("  {} {}", format!("fields.{key}:").bold(), value);
            }
            if !ctx.config_path.exists() {
                println!();
                println!(
                    "{}",
                    format!("({} not found, using defaults)", ctx.config_path.display()).dimmed()
                );
            }
        }
    }

    Ok(())
}

fn show_path(ctx: &Context) -> Result<()> {
    println!("{}", ctx.config_path.display());
    Ok(())
}
