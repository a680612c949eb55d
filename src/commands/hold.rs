//! Implementation of the `docstore hold` command.
//!
//! Keeps the lock for a fixed time. Useful to check from a shell that other
//! commands really wait.

use super::{acquire, open};
use crate::cli::HoldArgs;
use docstore::config::Config;
use docstore::error::{Result, StoreError};
use std::io::Write;
use std::thread;
use std::time::Duration;

/// Execute the `docstore hold` command.
pub fn cmd_hold(config: &Config, args: HoldArgs) -> Result<()> {
    let storage = open(config, &args.file)?;
    let session = acquire(&storage, config)?;

    let mut stdout = std::io::stdout();
    writeln!(stdout, "locked")
        .and_then(|()| stdout.flush())
        .map_err(|e| StoreError::UserError(format!("failed to write to stdout: {}", e)))?;

    thread::sleep(Duration::from_millis(args.millis));
    session.release()
}
