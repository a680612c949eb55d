//! CLI argument parsing for docstore.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docstore: inspect and edit lock-guarded XML documents.
///
/// Every command takes the exclusive lock on the document first, so it is
/// safe to run several at once against the same file.
#[derive(Parser, Debug)]
#[command(name = "docstore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for docstore.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the document.
    Show(FileArgs),

    /// Evaluate a path expression and print one value per line.
    Query(QueryArgs),

    /// Apply edit directives and print the resulting document.
    ///
    /// Directives use the text syntax, e.g.
    /// `XPATH "/github"; ADD "test"; SET "hello, world";`
    Apply(ApplyArgs),

    /// Take the lock, print `locked`, and keep it for a while.
    Hold(HoldArgs),

    /// Report who holds the lock on a document.
    Status(FileArgs),
}

/// A backing file argument.
#[derive(Parser, Debug)]
pub struct FileArgs {
    /// Path to the XML document.
    pub file: PathBuf,
}

/// Arguments for the `query` command.
#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// Path to the XML document.
    pub file: PathBuf,

    /// Path expression (e.g., /github/test/text()).
    pub xpath: String,
}

/// Arguments for the `apply` command.
#[derive(Parser, Debug)]
pub struct ApplyArgs {
    /// Path to the XML document.
    pub file: PathBuf,

    /// Directives to apply.
    #[arg(conflicts_with = "script")]
    pub directives: Option<String>,

    /// Read directives from a file instead.
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,
}

/// Arguments for the `hold` command.
#[derive(Parser, Debug)]
pub struct HoldArgs {
    /// Path to the XML document.
    pub file: PathBuf,

    /// How long to keep the lock, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub millis: u64,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
