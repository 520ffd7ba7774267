//! The shared, hot-swappable dictionary.
//!
//! Readers take the read lock only to clone the current `Arc<Dictionary>` and
//! then work on that snapshot, so a lookup that follows nested `{=key}`
//! references never needs the lock again and always sees one consistent
//! dictionary. Writers copy on write, which leaves snapshots held by readers
//! untouched.

use crate::error::{LockKind, TxError};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use txlib_core::{Dictionary, Quantifier, TextTemplate};

/// Longest wait for the read lock.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);
/// Longest wait for the write lock.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// What kind of mutation produced a [`DictionaryChanged`] notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Loaded,
    Added,
    Removed,
    Cleared,
    Reloaded,
}

/// Sent to subscribers after a mutation became visible to readers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DictionaryChanged {
    pub kind: ChangeKind,
    /// Number of loaded cultures after the change.
    pub cultures: usize,
    /// Number of text keys over all cultures after the change.
    pub keys: usize,
}

#[derive(Debug)]
pub struct TextStore {
    dictionary: RwLock<Arc<Dictionary>>,
    subscribers: Mutex<Vec<Sender<DictionaryChanged>>>,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl Default for TextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TextStore {
    pub fn new() -> Self {
        Self::with_timeouts(READ_TIMEOUT, WRITE_TIMEOUT)
    }

    pub fn with_timeouts(read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            dictionary: RwLock::new(Arc::new(Dictionary::new())),
            subscribers: Mutex::new(Vec::new()),
            read_timeout,
            write_timeout,
        }
    }

    /// Returns the current complete dictionary.
    pub fn snapshot(&self) -> Result<Arc<Dictionary>, TxError> {
        let guard = self
            .dictionary
            .try_read_for(self.read_timeout)
            .ok_or(TxError::LockTimeout {
                kind: LockKind::Read,
                timeout: self.read_timeout,
            })?;
        Ok(Arc::clone(&guard))
    }

    /// Finds the template for `key` and `count`, probing cultures in fallback
    /// order.
    pub fn lookup(
        &self,
        requested: &str,
        primary: Option<&str>,
        key: &str,
        count: Option<i64>,
    ) -> Result<Option<Arc<TextTemplate>>, TxError> {
        let dictionary = self.snapshot()?;
        let order = dictionary.lookup_order(requested, primary);
        Ok(dictionary.lookup(&order, key, count).cloned())
    }

    pub fn add_or_replace(
        &self,
        culture: &str,
        key: &str,
        quantifier: Quantifier,
        template: Arc<TextTemplate>,
    ) -> Result<(), TxError> {
        self.mutate(ChangeKind::Added, |dictionary| {
            dictionary.insert(culture, key, quantifier, template);
            true
        })
    }

    /// Removes every form of `key` in `culture`. Returns whether it existed.
    pub fn remove(&self, culture: &str, key: &str) -> Result<bool, TxError> {
        let mut removed = false;
        self.mutate(ChangeKind::Removed, |dictionary| {
            removed = dictionary.remove_key(culture, key);
            removed
        })?;
        Ok(removed)
    }

    /// Merges a freshly loaded dictionary into the live one.
    pub fn merge(&self, loaded: &Dictionary) -> Result<(), TxError> {
        self.mutate(ChangeKind::Loaded, |dictionary| {
            dictionary.merge(loaded);
            true
        })
    }

    /// Swaps in a complete new dictionary.
    pub fn replace_all(&self, dictionary: Dictionary) -> Result<(), TxError> {
        let replacement = Arc::new(dictionary);
        let event = changed(ChangeKind::Reloaded, &replacement);
        {
            let mut guard = self.write_lock()?;
            *guard = replacement;
        }
        self.publish(event);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), TxError> {
        {
            let mut guard = self.write_lock()?;
            *guard = Arc::new(Dictionary::new());
        }
        self.publish(changed(ChangeKind::Cleared, &Dictionary::new()));
        Ok(())
    }

    /// Registers for change notifications.
    pub fn subscribe(&self) -> Receiver<DictionaryChanged> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    fn write_lock(&self) -> Result<parking_lot::RwLockWriteGuard<'_, Arc<Dictionary>>, TxError> {
        self.dictionary
            .try_write_for(self.write_timeout)
            .ok_or(TxError::LockTimeout {
                kind: LockKind::Write,
                timeout: self.write_timeout,
            })
    }

    /// Applies `f` under the write lock; notifies subscribers if it returns
    /// `true`.
    fn mutate(
        &self,
        kind: ChangeKind,
        f: impl FnOnce(&mut Dictionary) -> bool,
    ) -> Result<(), TxError> {
        let event = {
            let mut guard = self.write_lock()?;
            let dictionary = Arc::make_mut(&mut *guard);
            f(&mut *dictionary).then(|| changed(kind, dictionary))
        };
        if let Some(event) = event {
            self.publish(event);
        }
        Ok(())
    }

    fn publish(&self, event: DictionaryChanged) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        tracing::debug!(
            "Dictionary changed ({:?}): {} cultures, {} keys",
            event.kind,
            event.cultures,
            event.keys
        );
    }
}

fn changed(kind: ChangeKind, dictionary: &Dictionary) -> DictionaryChanged {
    DictionaryChanged {
        kind,
        cultures: dictionary.culture_names().count(),
        keys: dictionary.key_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn text(s: &str) -> Arc<TextTemplate> {
        Arc::new(TextTemplate::parse(s))
    }

    fn source(store: &TextStore, culture: &str, key: &str) -> Option<String> {
        store
            .lookup(culture, None, key, None)
            .unwrap()
            .map(|t| t.source().to_string())
    }

    #[test]
    fn add_remove_clear() {
        let store = TextStore::new();
        store
            .add_or_replace("en", "hello", Quantifier::Generic, text("Hello"))
            .unwrap();
        assert_eq!(source(&store, "en", "hello").as_deref(), Some("Hello"));

        assert!(store.remove("en", "hello").unwrap());
        assert!(!store.remove("en", "hello").unwrap());
        assert_eq!(source(&store, "en", "hello"), None);

        store
            .add_or_replace("en", "hello", Quantifier::Generic, text("Hello"))
            .unwrap();
        store.clear().unwrap();
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn snapshots_survive_later_writes() {
        let store = TextStore::new();
        store
            .add_or_replace("en", "a", Quantifier::Generic, text("old"))
            .unwrap();
        let before = store.snapshot().unwrap();

        store
            .add_or_replace("en", "a", Quantifier::Generic, text("new"))
            .unwrap();
        let order = vec!["en".to_string()];
        assert_eq!(before.lookup(&order, "a", None).unwrap().source(), "old");
        assert_eq!(source(&store, "en", "a").as_deref(), Some("new"));
    }

    #[test]
    fn subscribers_see_each_change() {
        let store = TextStore::new();
        let rx = store.subscribe();

        store
            .add_or_replace("en", "a", Quantifier::Generic, text("A"))
            .unwrap();
        store.remove("en", "missing").unwrap();
        store.replace_all(Dictionary::new()).unwrap();
        store.clear().unwrap();

        let kinds: Vec<ChangeKind> = rx.try_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Added, ChangeKind::Reloaded, ChangeKind::Cleared]
        );
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let store = TextStore::new();
        drop(store.subscribe());
        store.clear().unwrap();
        assert!(store.subscribers.lock().is_empty());
    }

    #[test]
    fn write_times_out_while_read_is_held() {
        let store = Arc::new(TextStore::with_timeouts(
            Duration::from_millis(50),
            Duration::from_millis(50),
        ));
        let guard = store.dictionary.read();

        let writer = Arc::clone(&store);
        let result = thread::spawn(move || writer.clear()).join().unwrap();
        drop(guard);

        assert!(matches!(
            result,
            Err(TxError::LockTimeout {
                kind: LockKind::Write,
                ..
            })
        ));
    }

    #[test]
    fn concurrent_readers_see_whole_snapshots() {
        let store = Arc::new(TextStore::new());
        let mut first = Dictionary::new();
        first.insert("en", "a", Quantifier::Generic, text("1"));
        first.insert("en", "b", Quantifier::Generic, text("1"));
        store.replace_all(first).unwrap();

        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let order = vec!["en".to_string()];
                for _ in 0..2000 {
                    let snapshot = store.snapshot().unwrap();
                    let a = snapshot.lookup(&order, "a", None).unwrap().source().to_string();
                    let b = snapshot.lookup(&order, "b", None).unwrap().source().to_string();
                    assert_eq!(a, b);
                }
            })
        };

        for round in 0..200 {
            let mut next = Dictionary::new();
            let value = round.to_string();
            next.insert("en", "a", Quantifier::Generic, text(&value));
            next.insert("en", "b", Quantifier::Generic, text(&value));
            store.replace_all(next).unwrap();
        }

        reader.join().unwrap();
    }
}
