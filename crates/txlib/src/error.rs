use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use txlib_core::{CultureError, QuantifierError};

#[derive(Debug, Error)]
pub enum TxError {
    /// A dictionary lock could not be acquired in time. This indicates a
    /// deadlock or a badly overloaded process and is not recoverable.
    #[error("Timed out after {timeout:?} waiting for the {kind} lock")]
    LockTimeout { kind: LockKind, timeout: Duration },

    #[error("Invalid culture: {0}")]
    Culture(#[from] CultureError),

    #[error("Invalid quantifier: {0}")]
    Quantifier(#[from] QuantifierError),

    #[error("Negative {what} is not allowed: {value}")]
    NegativeArgument { what: &'static str, value: i64 },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed XML in '{path}': {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    #[error("File watching error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] txlib_toml::TxConfigError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockKind {
    Read,
    Write,
    Upgradable,
}

impl std::fmt::Display for LockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LockKind::Read => "read",
            LockKind::Write => "write",
            LockKind::Upgradable => "upgradable read",
        })
    }
}
