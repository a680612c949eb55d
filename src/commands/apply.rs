//! Implementation of the `docstore apply` command.

use super::{acquire, open};
use crate::cli::ApplyArgs;
use docstore::config::Config;
use docstore::directives::Directives;
use docstore::error::{Result, StoreError};

/// Execute the `docstore apply` command.
///
/// Directives come from the positional argument or from `--script`. They are
/// parsed before the lock is taken.
pub fn cmd_apply(config: &Config, args: ApplyArgs) -> Result<()> {
    let text = match (&args.directives, &args.script) {
        (Some(inline), None) => inline.clone(),
        (None, Some(script)) => std::fs::read_to_string(script).map_err(|e| {
            StoreError::UserError(format!(
                "failed to read script '{}': {}",
                script.display(),
                e
            ))
        })?,
        _ => {
            return Err(StoreError::UserError(
                "provide directives either inline or with --script".to_string(),
            ));
        }
    };
    let directives: Directives = text.parse()?;

    let storage = open(config, &args.file)?;
    let session = acquire(&storage, config)?;
    let doc = session.apply(&directives)?;
    session.release()?;

    println!("{}", doc.to_xml(config.xml_declaration)?);
    Ok(())
}
