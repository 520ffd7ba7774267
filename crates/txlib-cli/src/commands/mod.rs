//! CLI command implementations.

mod check;
mod common;
mod keys;
mod resolve;
mod watch;

pub use check::{CheckArgs, run_check};
pub use common::DictionaryArgs;
pub use keys::{KeysArgs, run_keys};
pub use resolve::{ResolveArgs, run_resolve};
pub use watch::{WatchArgs, run_watch};
