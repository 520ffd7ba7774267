use anyhow::{Context as _, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use txlib::Tx;
use txlib_toml::TxConfig;

/// Where the dictionary comes from and which cultures to use.
#[derive(Debug, Clone, Args)]
pub struct DictionaryArgs {
    /// Directory with dictionary files (defaults to `dictionary_dir` in ./tx.toml).
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Only load `{prefix}.xml` and `{prefix}.{culture}.xml`.
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Culture to resolve in (defaults to the system locale).
    #[arg(short, long)]
    pub culture: Option<String>,

    /// Fallback culture.
    #[arg(long)]
    pub primary: Option<String>,
}

impl DictionaryArgs {
    /// Builds the configuration from the arguments, falling back to
    /// `tx.toml` in the current directory when no directory is given.
    pub fn config(&self) -> Result<TxConfig> {
        let mut config = match &self.dir {
            Some(dir) => TxConfig {
                dictionary_dir: Some(dir.clone()),
                ..TxConfig::default()
            },
            None => TxConfig::read_from_dir(Path::new("."))
                .context("No --dir given and no usable tx.toml in the current directory")?,
        };

        if self.prefix.is_some() {
            config.file_prefix = self.prefix.clone();
        }
        if self.primary.is_some() {
            config.primary_culture = self.primary.clone();
        }
        Ok(config.apply_env())
    }

    /// Opens the engine with the dictionary loaded.
    pub fn open(&self, watch: bool) -> Result<Tx> {
        let mut config = self.config()?;
        config.watch = watch;

        let tx = Tx::from_config(&config, Path::new("."))
            .context("Failed to load the dictionary")?;
        if let Some(culture) = &self.culture {
            tx.set_culture(culture)?;
        }
        Ok(tx)
    }
}
