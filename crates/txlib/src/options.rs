use crate::store::{READ_TIMEOUT, WRITE_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;
use txlib_toml::{DEFAULT_DEBOUNCE_MS, TxConfig};

/// Settings for a new [`Tx`](crate::Tx) engine.
///
/// ```
/// let options = txlib::TxOptions::builder()
///     .primary_culture("en")
///     .culture("de-ch")
///     .build();
/// let tx = txlib::Tx::new(options).unwrap();
/// assert_eq!(tx.culture(), "de-ch");
/// ```
#[derive(bon::Builder, Clone, Debug)]
pub struct TxOptions {
    /// Fallback culture tried after the current culture.
    #[builder(into)]
    pub primary_culture: Option<String>,

    /// Current culture; defaults to the one derived from the process locale.
    #[builder(into)]
    pub culture: Option<String>,

    /// Reload loaded files when they change on disk.
    #[builder(default)]
    pub watch: bool,

    /// Quiet period before a reload.
    #[builder(default = Duration::from_millis(DEFAULT_DEBOUNCE_MS))]
    pub debounce: Duration,

    /// Append audit events to this file.
    #[builder(into)]
    pub log_file: Option<PathBuf>,

    /// Track requested keys to report unused ones at shutdown.
    #[builder(default)]
    pub log_unused_keys: bool,

    #[builder(default = READ_TIMEOUT)]
    pub read_timeout: Duration,

    #[builder(default = WRITE_TIMEOUT)]
    pub write_timeout: Duration,
}

impl Default for TxOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&TxConfig> for TxOptions {
    fn from(config: &TxConfig) -> Self {
        Self::builder()
            .maybe_primary_culture(config.primary_culture.clone())
            .watch(config.watch)
            .debounce(config.debounce())
            .maybe_log_file(config.log_file.clone())
            .log_unused_keys(config.log_unused_keys)
            .build()
    }
}
