//! `futord list` - issued labels, earliest release first.

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use futord_ca::TimestampLabel;
use serde::Serialize;

use super::Context;
use crate::output::{print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct Entry {
    label: String,
    public: bool,
    private: bool,
    released: Option<bool>,
}

pub fn execute(ctx: &Context) -> Result<()> {
    let dir = ctx.key_directory();
    if !dir.path().is_dir() {
        anyhow::bail!(
            "key directory {} does not exist, run `futord init` first",
            dir.path().display()
        );
    }

    let now = Utc::now();
    let entries: Vec<Entry> = dir
        .labels()?
        .into_iter()
        .map(|label| {
            let names = futord_ca::KeyPairNames::for_label(&label);
            // Labels not produced by the naming scheme have no release time
            let released = TimestampLabel::parse(&label)
                .ok()
                .map(|l| l.not_before() <= now);
            Entry {
                public: dir.resolve(&names.public).is_file(),
                private: dir.resolve(&names.private).is_file(),
                released,
                label,
            }
        })
        .collect();

    match ctx.output_format {
        OutputFormat::Json => print_json(&entries),
        OutputFormat::Pretty => {
            if entries.is_empty() {
                println!("{}", "No key pairs issued yet.".dimmed());
                return Ok(());
            }
            for entry in &entries {
                let status = match (entry.public && entry.private, entry.released) {
                    (false, _) => "incomplete".red(),
                    (true, Some(true)) => "due".yellow(),
                    (true, Some(false)) => "pending".green(),
                    (true, None) => "unscheduled".dimmed(),
                };
                println!("{}  {}", entry.label, status);
            }
            Ok(())
        }
    }
}
