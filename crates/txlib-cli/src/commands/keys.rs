//! Keys command implementation.

use super::DictionaryArgs;
use anyhow::Result;
use clap::Parser;

/// Arguments for the keys command.
#[derive(Parser)]
pub struct KeysArgs {
    #[command(flatten)]
    pub dictionary: DictionaryArgs,

    /// List the loaded cultures instead of keys.
    #[arg(long)]
    pub cultures: bool,
}

/// Run the keys command.
pub fn run_keys(args: KeysArgs) -> Result<bool> {
    let tx = args.dictionary.open(false)?;

    let lines = if args.cultures {
        tx.cultures()?
    } else {
        tx.keys(&tx.culture())?
    };
    for line in &lines {
        println!("{}", line);
    }

    Ok(true)
}
