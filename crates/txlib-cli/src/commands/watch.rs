//! Watch command implementation.

use super::DictionaryArgs;
use crate::ui;
use anyhow::Result;
use clap::Parser;
use txlib::{ChangeKind, Tx};

/// Arguments for the watch command.
#[derive(Parser)]
pub struct WatchArgs {
    #[command(flatten)]
    pub dictionary: DictionaryArgs,

    /// Keys to print after each reload.
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// Exit after this many reloads.
    #[arg(long, hide = true)]
    pub max_reloads: Option<usize>,
}

/// Run the watch command until interrupted.
pub fn run_watch(args: WatchArgs) -> Result<bool> {
    let tx = args.dictionary.open(true)?;
    let changes = tx.subscribe();
    print_keys(&tx, &args.keys);

    let mut reloads = 0;
    for change in changes.iter() {
        if change.kind != ChangeKind::Reloaded {
            continue;
        }
        ui::print_reloaded(change.cultures, change.keys);
        print_keys(&tx, &args.keys);

        reloads += 1;
        if args.max_reloads.is_some_and(|max| reloads >= max) {
            break;
        }
    }

    tx.shutdown()?;
    Ok(true)
}

fn print_keys(tx: &Tx, keys: &[String]) {
    for key in keys {
        ui::print_text(key, tx.resolve(key).as_deref());
    }
}
