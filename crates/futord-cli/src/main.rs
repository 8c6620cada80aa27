//! futord - delayed-disclosure key authority
//!
//! Creates a root authority and mints one timestamp-named key pair per call.

use anyhow::Result;

fn main() -> Result<()> {
    futord_cli::run()
}
