//! Audit trail for texts that could not be resolved completely, and for
//! primary-culture keys nobody asked for.

use crate::error::TxError;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use txlib_core::{Dictionary, ResolveObserver, is_system_key};

#[derive(Debug, Default)]
pub struct AuditLog {
    file: Option<(PathBuf, Mutex<BufWriter<File>>)>,
    used_keys: Option<Mutex<HashSet<String>>>,
}

impl AuditLog {
    /// Opens `log_file` for appending (created if missing).
    pub fn new(log_file: Option<&Path>, track_used_keys: bool) -> Result<Self, TxError> {
        let file = match log_file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| TxError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?;
                Some((path.to_path_buf(), Mutex::new(BufWriter::new(file))))
            },
            None => None,
        };

        Ok(Self {
            file,
            used_keys: track_used_keys.then(|| Mutex::new(HashSet::new())),
        })
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.file.as_ref().map(|(path, _)| path.as_path())
    }

    pub fn tracks_used_keys(&self) -> bool {
        self.used_keys.is_some()
    }

    /// Remembers that `key` was requested.
    pub fn record_use(&self, key: &str) {
        if let Some(used) = &self.used_keys {
            let mut used = used.lock();
            if !used.contains(key) {
                used.insert(key.to_string());
            }
        }
    }

    /// A top-level lookup found no text in any culture.
    pub fn missing_text(&self, key: &str, culture: &str) {
        tracing::warn!("Missing text '{}' for culture {}", key, culture);
        self.write(format!("missing text: key={} culture={}", key, culture));
    }

    /// Primary-culture keys that were never requested, sorted. Empty unless
    /// used keys are tracked.
    pub fn unused_keys(&self, dictionary: &Dictionary, primary: &str) -> Vec<String> {
        let (Some(used), Some(table)) = (&self.used_keys, dictionary.culture(primary)) else {
            return Vec::new();
        };
        let used = used.lock();
        let mut unused: Vec<String> = table
            .keys()
            .filter(|key| !is_system_key(key) && !used.contains(*key))
            .map(str::to_string)
            .collect();
        unused.sort();
        unused
    }

    /// Reports unused primary-culture keys and flushes the log file.
    pub fn finish(&self, dictionary: &Dictionary, primary: &str) {
        let unused = self.unused_keys(dictionary, primary);
        if !unused.is_empty() {
            tracing::info!("{} unused text keys in culture {}", unused.len(), primary);
            for key in &unused {
                self.write(format!("unused key: key={} culture={}", key, primary));
            }
        }
        self.flush();
    }

    pub fn flush(&self) {
        if let Some((path, writer)) = &self.file
            && let Err(e) = writer.lock().flush()
        {
            tracing::error!("Failed to flush {}: {}", path.display(), e);
        }
    }

    fn write(&self, line: String) {
        if let Some((path, writer)) = &self.file
            && let Err(e) = writeln!(writer.lock(), "{}", line)
        {
            tracing::error!("Failed to write {}: {}", path.display(), e);
        }
    }
}

impl ResolveObserver for AuditLog {
    fn unresolved_placeholder(&self, key: &str, placeholder: &str) {
        tracing::warn!("Unresolved placeholder {{{}}} in text '{}'", placeholder, key);
        self.write(format!("unresolved placeholder: key={} placeholder={}", key, placeholder));
    }

    fn unresolved_key(&self, key: &str, nested: &str) {
        tracing::warn!("Unresolved text reference {{={}}} in text '{}'", nested, key);
        self.write(format!("unresolved reference: key={} reference={}", key, nested));
    }

    fn invalid_count(&self, key: &str, count_name: &str, value: Option<&str>) {
        match value {
            Some(value) => tracing::warn!(
                "Count '{}' = '{}' in text '{}' is not an integer",
                count_name,
                value,
                key
            ),
            None => tracing::warn!("Count '{}' in text '{}' has no value", count_name, key),
        }
        self.write(format!(
            "invalid count: key={} name={} value={}",
            key,
            count_name,
            value.unwrap_or("")
        ));
    }

    fn rejected_reference(&self, key: &str, nested: &str) {
        tracing::warn!(
            "Text reference {{={}}} in text '{}' is recursive or nested too deeply",
            nested,
            key
        );
        self.write(format!("rejected reference: key={} reference={}", key, nested));
    }

    fn unused_data(&self, key: &str, names: &[&str]) {
        tracing::debug!("Text '{}' did not use data {:?}", key, names);
        self.write(format!("unused data: key={} names={}", key, names.join(",")));
    }
}
