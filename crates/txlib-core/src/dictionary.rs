//! The culture → key → quantifier → template data model.

use crate::culture;
use crate::quantifier::{KeyEntry, Quantifier};
use crate::template::{KeyLookup, TextTemplate};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Prefix of keys reserved for the library's own texts.
pub const SYSTEM_KEY_PREFIX: &str = "Tx:";

/// Returns `true` for `Tx:`-prefixed system keys.
pub fn is_system_key(key: &str) -> bool {
    key.starts_with(SYSTEM_KEY_PREFIX)
}

/// All text keys of one culture.
#[derive(Clone, Debug, Default)]
pub struct CultureTable {
    entries: HashMap<String, KeyEntry>,
}

impl CultureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        quantifier: Quantifier,
        template: Arc<TextTemplate>,
    ) {
        self.entries
            .entry(key.into())
            .or_default()
            .insert(quantifier, template);
    }

    pub fn remove(&mut self, key: &str) -> Option<KeyEntry> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&KeyEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrites the forms of `other` into this table, keeping forms this
    /// table has and `other` lacks.
    pub fn merge(&mut self, other: &CultureTable) {
        for (key, entry) in &other.entries {
            self.entries.entry(key.clone()).or_default().merge(entry);
        }
    }
}

/// Every loaded culture.
///
/// Tables are shared through `Arc` and copied on write, so a cloned dictionary
/// is cheap and never observes later changes to the original.
#[derive(Clone, Debug, Default)]
pub struct Dictionary {
    cultures: BTreeMap<String, Arc<CultureTable>>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a single template. `culture` must already be normalized.
    pub fn insert(
        &mut self,
        culture: &str,
        key: impl Into<String>,
        quantifier: Quantifier,
        template: Arc<TextTemplate>,
    ) {
        let table = self.cultures.entry(culture.to_string()).or_default();
        Arc::make_mut(table).insert(key, quantifier, template);
    }

    /// Removes every form of `key` in `culture`. Returns `true` if it existed.
    pub fn remove_key(&mut self, culture: &str, key: &str) -> bool {
        let Some(table) = self.cultures.get_mut(culture) else {
            return false;
        };
        if !table.contains_key(key) {
            return false;
        }
        Arc::make_mut(table).remove(key);
        if table.is_empty() {
            self.cultures.remove(culture);
        }
        true
    }

    /// Merges `other` into this dictionary form by form.
    pub fn merge(&mut self, other: &Dictionary) {
        for (name, table) in &other.cultures {
            match self.cultures.get_mut(name) {
                Some(existing) => Arc::make_mut(existing).merge(table),
                None => {
                    self.cultures.insert(name.clone(), Arc::clone(table));
                },
            }
        }
    }

    pub fn culture(&self, name: &str) -> Option<&CultureTable> {
        self.cultures.get(name).map(Arc::as_ref)
    }

    /// Loaded culture names in sorted order.
    pub fn culture_names(&self) -> impl Iterator<Item = &str> {
        self.cultures.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.cultures.is_empty()
    }

    /// Total number of text keys over all cultures.
    pub fn key_count(&self) -> usize {
        self.cultures.values().map(|table| table.len()).sum()
    }

    /// Cultures to probe for a lookup, restricted to loaded ones.
    pub fn lookup_order(&self, requested: &str, primary: Option<&str>) -> Vec<String> {
        culture::resolve_order(requested, primary, self.culture_names())
            .into_iter()
            .filter(|name| self.cultures.contains_key(name))
            .collect()
    }

    /// Finds the template for `key` and `count`, probing `order` front to back.
    pub fn lookup(
        &self,
        order: &[String],
        key: &str,
        count: Option<i64>,
    ) -> Option<&Arc<TextTemplate>> {
        order.iter().find_map(|name| {
            self.cultures
                .get(name)
                .and_then(|table| table.get(key))
                .and_then(|entry| entry.select(count))
        })
    }
}

/// A dictionary bound to a culture order, usable for nested key lookups.
pub struct OrderedLookup<'a> {
    pub dictionary: &'a Dictionary,
    pub order: &'a [String],
}

impl KeyLookup for OrderedLookup<'_> {
    fn lookup(&self, key: &str, count: Option<i64>) -> Option<Arc<TextTemplate>> {
        self.dictionary.lookup(self.order, key, count).cloned()
    }
}
