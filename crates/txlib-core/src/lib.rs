//! Core data model and algorithms for txlib.
//!
//! This crate holds everything that is independent of locking and file I/O:
//! the dictionary types, the culture fallback order, plural-form selection and
//! the template resolver. The `txlib` crate builds the concurrent engine on top.

pub mod culture;
pub mod dictionary;
pub mod quantifier;
pub mod template;

pub use culture::{CultureError, normalize as normalize_culture, resolve_order};
pub use dictionary::{CultureTable, Dictionary, OrderedLookup, SYSTEM_KEY_PREFIX, is_system_key};
pub use quantifier::{KeyEntry, Quantifier, QuantifierError};
pub use template::{KeyLookup, ResolveObserver, Segment, TextArgs, TextTemplate};
