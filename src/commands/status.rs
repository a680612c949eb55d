//! Implementation of the `docstore status` command.

use super::open;
use crate::cli::FileArgs;
use docstore::config::Config;
use docstore::error::Result;
use docstore::locks::LockStatus;

/// Execute the `docstore status` command.
///
/// Prints `unlocked`, or `locked` followed by the holder recorded in the lock
/// file. Does not acquire the lock; see [`docstore::locks::FileLock::inspect`].
pub fn cmd_status(config: &Config, args: FileArgs) -> Result<()> {
    let storage = open(config, &args.file)?;

    match storage.status()? {
        LockStatus::Unlocked => println!("unlocked"),
        LockStatus::Locked(Some(holder)) => println!("locked by {}", holder),
        LockStatus::Locked(None) => println!("locked"),
    }
    Ok(())
}
