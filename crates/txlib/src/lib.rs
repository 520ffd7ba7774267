#![doc = include_str!("../README.md")]

pub mod audit;
pub mod decorate;
pub mod error;
pub mod loader;
pub mod options;
pub mod store;
pub mod watcher;

pub use error::{LockKind, TxError};
pub use loader::{LoadIssue, LoadedFile};
pub use options::TxOptions;
pub use store::{ChangeKind, DictionaryChanged, TextStore};
pub use txlib_core::{Quantifier, TextArgs, TextTemplate};

use crate::audit::AuditLog;
use crate::watcher::{FileWatch, ReloadScheduler};
use crossbeam_channel::Receiver;
use parking_lot::{Mutex, RwLock, RwLockUpgradableReadGuard};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use txlib_core::culture::{DEFAULT_CULTURE, system_culture};
use txlib_core::template::{self, KeyLookup};
use txlib_core::{Dictionary, OrderedLookup, normalize_culture};
use txlib_toml::TxConfig;

/// Outcome of a load or reload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub files: usize,
    pub texts: usize,
    pub issues: Vec<LoadIssue>,
}

impl LoadReport {
    fn add(&mut self, loaded: loader::LoadedDictionary) {
        self.files += 1;
        self.texts += loaded.texts;
        self.issues.extend(loaded.issues);
    }
}

/// The text engine.
///
/// `Tx` is a cheap, cloneable handle; clones share the same dictionary and
/// settings. When the last handle is dropped the watcher is stopped and the
/// audit log is flushed, as [`Tx::shutdown`] does.
///
/// The `resolve*` methods panic if a lock cannot be acquired within its
/// timeout, which only happens when the process is deadlocked or badly
/// overloaded. The `try_resolve*` variants return the error instead.
#[derive(Clone, Debug)]
pub struct Tx {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Settings {
    primary_culture: Option<String>,
    culture: String,
}

#[derive(Debug)]
struct Watch {
    scheduler: ReloadScheduler,
    files: Option<FileWatch>,
}

#[derive(Debug)]
struct Inner {
    store: TextStore,
    settings: RwLock<Settings>,
    /// Held from reading the file list to swapping the store, so loads,
    /// reloads and clears apply one at a time.
    loading: Mutex<()>,
    files: Mutex<Vec<LoadedFile>>,
    watch: RwLock<Option<Watch>>,
    audit: AuditLog,
    debounce: Duration,
    read_timeout: Duration,
    write_timeout: Duration,
    finished: AtomicBool,
}

impl Tx {
    pub fn new(options: TxOptions) -> Result<Self, TxError> {
        let primary_culture = options
            .primary_culture
            .as_deref()
            .map(normalize_culture)
            .transpose()?;
        let culture = match options.culture.as_deref() {
            Some(name) => normalize_culture(name)?,
            None => system_culture(),
        };
        let audit = AuditLog::new(options.log_file.as_deref(), options.log_unused_keys)?;

        let tx = Self {
            inner: Arc::new(Inner {
                store: TextStore::with_timeouts(options.read_timeout, options.write_timeout),
                settings: RwLock::new(Settings {
                    primary_culture,
                    culture,
                }),
                loading: Mutex::new(()),
                files: Mutex::new(Vec::new()),
                watch: RwLock::new(None),
                audit,
                debounce: options.debounce,
                read_timeout: options.read_timeout,
                write_timeout: options.write_timeout,
                finished: AtomicBool::new(false),
            }),
        };

        if options.watch {
            tx.set_watch(true)?;
        }
        Ok(tx)
    }

    /// Builds an engine from a configuration and loads its dictionary
    /// directory, resolved against `base_dir`.
    pub fn from_config(config: &TxConfig, base_dir: &Path) -> Result<Self, TxError> {
        let tx = Self::new(TxOptions::from(config))?;
        if let Some(dir) = config.dictionary_dir_from_base(base_dir) {
            tx.load_directory(&dir, config.file_prefix.as_deref())?;
        }
        Ok(tx)
    }

    /// Parses a dictionary file and merges it into the live dictionary.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<LoadReport, TxError> {
        let path = path.as_ref();
        let _loading = self.inner.loading.lock();
        let loaded = loader::parse_file(path)?;
        self.remember_files([path.to_path_buf()]);
        self.inner.store.merge(&loaded.dictionary)?;
        tracing::info!("Loaded {} texts from {}", loaded.texts, path.display());

        let mut report = LoadReport::default();
        report.add(loaded);
        Ok(report)
    }

    /// Loads `{prefix}.xml` and `{prefix}.{culture}.xml` from `dir` (every
    /// `*.xml` file without a prefix) as one change.
    pub fn load_directory(
        &self,
        dir: impl AsRef<Path>,
        prefix: Option<&str>,
    ) -> Result<LoadReport, TxError> {
        let dir = dir.as_ref();
        let _loading = self.inner.loading.lock();
        let files = loader::dictionary_files(dir, prefix)?;
        let mut dictionary = Dictionary::new();
        let mut report = LoadReport::default();

        for path in &files {
            let loaded = loader::parse_file(path)?;
            dictionary.merge(&loaded.dictionary);
            report.add(loaded);
        }

        if files.is_empty() {
            tracing::warn!("No dictionary files found in {}", dir.display());
        } else {
            self.remember_files(files);
            self.inner.store.merge(&dictionary)?;
            tracing::info!(
                "Loaded {} texts from {} files in {}",
                report.texts,
                report.files,
                dir.display()
            );
        }
        Ok(report)
    }

    /// Adds or replaces a single text form.
    ///
    /// `count` selects an exact-count form, `count` with `modulus` a
    /// `count % modulus == remainder` form, neither the generic form.
    pub fn add_text(
        &self,
        culture: &str,
        key: &str,
        count: Option<i64>,
        modulus: Option<i64>,
        text: &str,
    ) -> Result<(), TxError> {
        if let Some(value) = count.filter(|c| *c < 0) {
            return Err(TxError::NegativeArgument { what: "count", value });
        }
        if let Some(value) = modulus.filter(|m| *m < 0) {
            return Err(TxError::NegativeArgument {
                what: "modulus",
                value,
            });
        }
        let culture = normalize_culture(culture)?;
        let quantifier = Quantifier::new(count, modulus)?;
        self.inner
            .store
            .add_or_replace(&culture, key, quantifier, Arc::new(TextTemplate::parse(text)))
    }

    /// Removes every form of `key` in `culture`. Returns whether it existed.
    pub fn remove_text(&self, culture: &str, key: &str) -> Result<bool, TxError> {
        let culture = normalize_culture(culture)?;
        self.inner.store.remove(&culture, key)
    }

    /// Empties the dictionary and forgets loaded files.
    pub fn clear(&self) -> Result<(), TxError> {
        let _loading = self.inner.loading.lock();
        self.inner.files.lock().clear();
        self.inner.store.clear()?;
        self.refresh_watch();
        Ok(())
    }

    /// Re-reads every loaded file into a new dictionary and swaps it in.
    ///
    /// Files that have disappeared are skipped. Any other read or XML error
    /// aborts the reload and leaves the live dictionary untouched. Texts added
    /// with [`Tx::add_text`] are not kept.
    pub fn reload(&self) -> Result<LoadReport, TxError> {
        let _loading = self.inner.loading.lock();
        let paths = self.loaded_files();
        let mut dictionary = Dictionary::new();
        let mut report = LoadReport::default();

        for path in &paths {
            match loader::parse_file(path) {
                Ok(loaded) => {
                    dictionary.merge(&loaded.dictionary);
                    report.add(loaded);
                },
                Err(TxError::Io { path, source }) if source.kind() == io::ErrorKind::NotFound => {
                    tracing::warn!("Dictionary file {} is gone, skipping", path.display());
                },
                Err(e) => return Err(e),
            }
        }

        self.inner.store.replace_all(dictionary)?;
        for file in self.inner.files.lock().iter_mut() {
            file.refresh();
        }
        tracing::info!("Reloaded {} texts from {} files", report.texts, report.files);
        Ok(report)
    }

    /// Reloads when any loaded file changed since it was last read.
    pub fn reload_if_stale(&self) -> Result<bool, TxError> {
        let stale = self.inner.files.lock().iter().any(LoadedFile::is_stale);
        if stale {
            self.reload()?;
        }
        Ok(stale)
    }

    pub fn loaded_files(&self) -> Vec<PathBuf> {
        self.inner.files.lock().iter().map(|f| f.path.clone()).collect()
    }

    /// Turns hot reloading on or off. Turning it off cancels a pending reload.
    pub fn set_watch(&self, enabled: bool) -> Result<(), TxError> {
        let guard = self
            .inner
            .watch
            .try_upgradable_read_for(self.inner.write_timeout)
            .ok_or(TxError::LockTimeout {
                kind: LockKind::Upgradable,
                timeout: self.inner.write_timeout,
            })?;
        if guard.is_some() == enabled {
            return Ok(());
        }

        let mut watch = RwLockUpgradableReadGuard::upgrade(guard);
        if enabled {
            let weak = Arc::downgrade(&self.inner);
            let scheduler = ReloadScheduler::new(self.inner.debounce, move || {
                if let Some(inner) = weak.upgrade() {
                    let tx = Tx { inner };
                    if let Err(e) = tx.reload() {
                        tracing::error!("Hot reload failed: {}", e);
                    }
                }
            });
            let files = self.file_watch(&scheduler)?;
            *watch = Some(Watch { scheduler, files });
            tracing::debug!("Hot reload enabled");
        } else {
            let old = watch.take();
            drop(watch);
            if let Some(old) = old {
                old.scheduler.cancel();
                tracing::debug!("Hot reload disabled");
            }
        }
        Ok(())
    }

    pub fn is_watching(&self) -> bool {
        self.inner.watch.read().is_some()
    }

    /// `true` while a hot reload waits for its debounce interval.
    pub fn reload_pending(&self) -> bool {
        self.inner
            .watch
            .read()
            .as_ref()
            .is_some_and(|watch| watch.scheduler.is_pending())
    }

    pub fn set_primary_culture(&self, culture: Option<&str>) -> Result<(), TxError> {
        let culture = culture.map(normalize_culture).transpose()?;
        let settings = self.settings_upgradable()?;
        if settings.primary_culture != culture {
            RwLockUpgradableReadGuard::upgrade(settings).primary_culture = culture;
        }
        Ok(())
    }

    /// # Panics
    ///
    /// If the settings lock times out.
    pub fn primary_culture(&self) -> Option<String> {
        fatal_on_timeout(self.settings().map(|(primary, _)| primary))
    }

    /// Sets the culture used by the `resolve*` methods.
    pub fn set_culture(&self, culture: &str) -> Result<(), TxError> {
        let culture = normalize_culture(culture)?;
        let settings = self.settings_upgradable()?;
        if settings.culture != culture {
            RwLockUpgradableReadGuard::upgrade(settings).culture = culture;
        }
        Ok(())
    }

    /// # Panics
    ///
    /// If the settings lock times out.
    pub fn culture(&self) -> String {
        fatal_on_timeout(self.settings().map(|(_, culture)| culture))
    }

    /// Receives a [`DictionaryChanged`] after every load, add, remove, clear
    /// and reload.
    pub fn subscribe(&self) -> Receiver<DictionaryChanged> {
        self.inner.store.subscribe()
    }

    /// The current dictionary.
    pub fn snapshot(&self) -> Result<Arc<Dictionary>, TxError> {
        self.inner.store.snapshot()
    }

    /// Keys of one culture, sorted.
    pub fn keys(&self, culture: &str) -> Result<Vec<String>, TxError> {
        let culture = normalize_culture(culture)?;
        let snapshot = self.inner.store.snapshot()?;
        let mut keys: Vec<String> = snapshot
            .culture(&culture)
            .map(|table| table.keys().map(str::to_string).collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }

    pub fn cultures(&self) -> Result<Vec<String>, TxError> {
        Ok(self.inner.store.snapshot()?.culture_names().map(str::to_string).collect())
    }

    /// Resolves `key` without count or data. `None` when no culture has it.
    pub fn resolve(&self, key: &str) -> Option<String> {
        self.resolve_full(key, None, &TextArgs::new())
    }

    pub fn resolve_count(&self, key: &str, count: i64) -> Option<String> {
        self.resolve_full(key, Some(count), &TextArgs::new())
    }

    pub fn resolve_data(&self, key: &str, data: &TextArgs) -> Option<String> {
        self.resolve_full(key, None, data)
    }

    /// Resolves `key` in the current culture.
    ///
    /// # Panics
    ///
    /// If a lock times out.
    pub fn resolve_full(&self, key: &str, count: Option<i64>, data: &TextArgs) -> Option<String> {
        fatal_on_timeout(self.try_resolve_full(key, count, data))
    }

    /// Resolves `key` in an explicit culture. An invalid culture name is
    /// logged and yields `None`.
    ///
    /// # Panics
    ///
    /// If a lock times out.
    pub fn resolve_in(
        &self,
        culture: &str,
        key: &str,
        count: Option<i64>,
        data: &TextArgs,
    ) -> Option<String> {
        match self.try_resolve_in(culture, key, count, data) {
            Err(TxError::Culture(e)) => {
                tracing::warn!("Cannot resolve '{}': {}", key, e);
                None
            },
            result => fatal_on_timeout(result),
        }
    }

    pub fn try_resolve_full(
        &self,
        key: &str,
        count: Option<i64>,
        data: &TextArgs,
    ) -> Result<Option<String>, TxError> {
        let (primary, culture) = self.settings()?;
        self.render(&culture, primary.as_deref(), key, count, data, None)
    }

    pub fn try_resolve_in(
        &self,
        culture: &str,
        key: &str,
        count: Option<i64>,
        data: &TextArgs,
    ) -> Result<Option<String>, TxError> {
        let culture = normalize_culture(culture)?;
        let (primary, _) = self.settings()?;
        self.render(&culture, primary.as_deref(), key, count, data, None)
    }

    /// Resolves a text with a built-in `default` template used when no
    /// culture defines `key`.
    pub(crate) fn resolve_or(
        &self,
        key: &str,
        count: Option<i64>,
        data: &TextArgs,
        default: &str,
    ) -> String {
        let result = self.settings().and_then(|(primary, culture)| {
            self.render(&culture, primary.as_deref(), key, count, data, Some(default))
        });
        fatal_on_timeout(result).unwrap_or_default()
    }

    /// Primary-culture keys that were never requested. Empty unless unused
    /// keys are tracked.
    pub fn unused_keys(&self) -> Result<Vec<String>, TxError> {
        let (primary, _) = self.settings()?;
        let snapshot = self.inner.store.snapshot()?;
        Ok(self
            .inner
            .audit
            .unused_keys(&snapshot, primary.as_deref().unwrap_or(DEFAULT_CULTURE)))
    }

    /// Stops watching, reports unused keys and flushes the audit log. Later
    /// calls do nothing.
    pub fn shutdown(&self) -> Result<(), TxError> {
        self.set_watch(false)?;
        self.inner.finish()
    }

    fn render(
        &self,
        culture: &str,
        primary: Option<&str>,
        key: &str,
        count: Option<i64>,
        data: &TextArgs,
        default: Option<&str>,
    ) -> Result<Option<String>, TxError> {
        let audit = &self.inner.audit;
        let dictionary = self.inner.store.snapshot()?;
        let order = dictionary.lookup_order(culture, primary);
        audit.record_use(key);

        let text = match (dictionary.lookup(&order, key, count), default) {
            (Some(text), _) => Arc::clone(text),
            (None, Some(default)) => Arc::new(TextTemplate::parse(default)),
            (None, None) => {
                audit.missing_text(key, culture);
                return Ok(None);
            },
        };

        let lookup = RecordingLookup {
            inner: OrderedLookup {
                dictionary: &dictionary,
                order: &order,
            },
            audit,
        };
        Ok(Some(template::resolve(&text, key, count, data, &lookup, audit)))
    }

    fn settings(&self) -> Result<(Option<String>, String), TxError> {
        let settings = self
            .inner
            .settings
            .try_read_for(self.inner.read_timeout)
            .ok_or(TxError::LockTimeout {
                kind: LockKind::Read,
                timeout: self.inner.read_timeout,
            })?;
        Ok((settings.primary_culture.clone(), settings.culture.clone()))
    }

    fn settings_upgradable(&self) -> Result<RwLockUpgradableReadGuard<'_, Settings>, TxError> {
        self.inner
            .settings
            .try_upgradable_read_for(self.inner.write_timeout)
            .ok_or(TxError::LockTimeout {
                kind: LockKind::Upgradable,
                timeout: self.inner.write_timeout,
            })
    }

    fn remember_files(&self, paths: impl IntoIterator<Item = PathBuf>) {
        let added = {
            let mut files = self.inner.files.lock();
            let mut added = false;
            for path in paths {
                match files.iter_mut().find(|f| f.path == path) {
                    Some(existing) => existing.refresh(),
                    None => {
                        files.push(LoadedFile::new(path));
                        added = true;
                    },
                }
            }
            added
        };
        if added {
            self.refresh_watch();
        }
    }

    /// Points the file watch at the current set of loaded files.
    fn refresh_watch(&self) {
        let Some(mut watch) = self.inner.watch.try_write_for(self.inner.write_timeout) else {
            tracing::error!("Timed out updating the file watch");
            return;
        };
        if let Some(watch) = watch.as_mut() {
            watch.files = None;
            match self.file_watch(&watch.scheduler) {
                Ok(files) => watch.files = files,
                Err(e) => tracing::error!("Failed to watch dictionary files: {}", e),
            }
        }
    }

    fn file_watch(&self, scheduler: &ReloadScheduler) -> Result<Option<FileWatch>, TxError> {
        let paths = self.loaded_files();
        if paths.is_empty() {
            return Ok(None);
        }
        FileWatch::new(&paths, scheduler.handle()).map(Some)
    }
}

impl Inner {
    fn finish(&self) -> Result<(), TxError> {
        if self.finished.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let primary = self
            .settings
            .try_read_for(self.read_timeout)
            .and_then(|s| s.primary_culture.clone())
            .unwrap_or_else(|| DEFAULT_CULTURE.to_string());
        let snapshot = self.store.snapshot()?;
        self.audit.finish(&snapshot, &primary);
        Ok(())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(watch) = self.watch.get_mut().take() {
            watch.scheduler.cancel();
        }
        if let Err(e) = self.finish() {
            tracing::error!("Failed to finish audit log: {}", e);
        }
    }
}

/// Nested lookups count as uses of the referenced key.
struct RecordingLookup<'a> {
    inner: OrderedLookup<'a>,
    audit: &'a AuditLog,
}

impl KeyLookup for RecordingLookup<'_> {
    fn lookup(&self, key: &str, count: Option<i64>) -> Option<Arc<TextTemplate>> {
        self.audit.record_use(key);
        self.inner.lookup(key, count)
    }
}

fn fatal_on_timeout<T>(result: Result<T, TxError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("{}", e),
    }
}
