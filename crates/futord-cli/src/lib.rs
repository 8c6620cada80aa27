//! # futord-cli
//!
//! Command-line front end for a futord key directory.
//!
//! ## Features
//!
//! - **init**: create the root authority (repeatable) and refresh the README
//! - **generate**: mint the key pair for a timestamp
//! - **verify** / **check**: the checks a consumer should run before trusting a file
//! - **list**: issued pairs in release order
//! - **Multiple output formats**: pretty text or JSON

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
