//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config;
use crate::output::OutputFormat;

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Load configuration, then let flags override it
    let config_path = config::resolve_path(cli.config.as_deref())?;
    let mut settings = config::load(&config_path)?;
    config::apply_overrides(&mut settings, &cli);

    // Create context for commands
    let ctx = commands::Context {
        config: settings,
        config_path,
        output_format: cli.output.unwrap_or(OutputFormat::Pretty),
        verbose: cli.verbose,
    };

    // Dispatch to appropriate command
    match cli.command {
        Commands::Init => commands::init::execute(&ctx),
        Commands::Generate(args) => commands::generate::execute(&ctx, args),
        Commands::Verify(args) => commands::verify::execute(&ctx, args),
        Commands::Check(args) => commands::check::execute(&ctx, args),
        Commands::List => commands::list::execute(&ctx),
        Commands::Config(args) => commands::config::execute(&ctx, args),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "futord=debug" } else { "futord=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Logs go to stderr so JSON on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
