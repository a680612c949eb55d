//! Implementation of the `docstore query` command.

use super::{acquire, open};
use crate::cli::QueryArgs;
use docstore::config::Config;
use docstore::error::Result;
use docstore::query::XPath;

/// Execute the `docstore query` command.
///
/// The expression is compiled before the lock is taken, so a typo fails fast.
pub fn cmd_query(config: &Config, args: QueryArgs) -> Result<()> {
    let path = XPath::parse(&args.xpath)?;

    let storage = open(config, &args.file)?;
    let session = acquire(&storage, config)?;
    let doc = session.xml()?;
    session.release()?;

    for item in path.evaluate(&doc) {
        println!("{}", item.string_value(&doc));
    }
    Ok(())
}
