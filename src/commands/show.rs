//! Implementation of the `docstore show` command.

use super::{acquire, open};
use crate::cli::FileArgs;
use docstore::config::Config;
use docstore::error::Result;

/// Execute the `docstore show` command.
pub fn cmd_show(config: &Config, args: FileArgs) -> Result<()> {
    let storage = open(config, &args.file)?;
    let session = acquire(&storage, config)?;
    let xml = session.xml()?.to_xml(config.xml_declaration)?;
    session.release()?;

    println!("{}", xml);
    Ok(())
}
