//! Command implementations for docstore.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the helpers every command shares for opening a
//! store and taking its lock.

mod apply;
mod hold;
mod query;
mod show;
mod status;

use crate::cli::{Cli, Command};
use docstore::config::Config;
use docstore::error::Result;
use docstore::storage::{Session, Storage};
use std::path::Path;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Show(args) => show::cmd_show(&config, args),
        Command::Query(args) => query::cmd_query(&config, args),
        Command::Apply(args) => apply::cmd_apply(&config, args),
        Command::Hold(args) => hold::cmd_hold(&config, args),
        Command::Status(args) => status::cmd_status(&config, args),
    }
}

fn open(config: &Config, file: &Path) -> Result<Storage> {
    Storage::with_config(file, config.clone())
}

/// Take the lock, bounded by `lock_timeout_ms` when configured.
fn acquire<'a>(storage: &'a Storage, config: &Config) -> Result<Session<'a>> {
    match config.lock_timeout() {
        Some(timeout) => storage.session_timeout(timeout),
        None => storage.session(),
    }
}
