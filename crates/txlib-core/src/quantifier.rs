//! Plural-form selection.
//!
//! Every template of a text key is stored under a [`Quantifier`]. A lookup with
//! a count prefers an exact form, then the first matching modulo form, then the
//! generic form.

use crate::template::TextTemplate;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Largest count an exact or modulo form can carry.
pub const MAX_COUNT: i64 = 65535;
/// Smallest allowed modulus.
pub const MIN_MODULUS: i64 = 2;
/// Largest allowed modulus.
pub const MAX_MODULUS: i64 = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantifierError {
    /// Count outside `[0, 65535]`.
    #[error("count {0} is out of range (0..=65535)")]
    CountOutOfRange(i64),
    /// Modulus outside `[2, 1000]`.
    #[error("modulus {0} is out of range (2..=1000)")]
    ModulusOutOfRange(i64),
    /// A modulus was given without a count.
    #[error("a modulus requires a count")]
    ModulusWithoutCount,
}

/// The plural-form slot a template is registered under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Quantifier {
    /// Used when no other form matches or no count is given.
    #[default]
    Generic,
    /// Matches when the requested count equals the value.
    Exact(u16),
    /// Matches when `count % modulus == remainder`.
    Modulo { remainder: u16, modulus: u16 },
}

impl Quantifier {
    /// Builds a quantifier from the optional `count` and `mod` values used by
    /// dictionary files and the programmatic add API.
    pub fn new(count: Option<i64>, modulus: Option<i64>) -> Result<Self, QuantifierError> {
        match (count, modulus) {
            (None, None) => Ok(Self::Generic),
            (None, Some(_)) => Err(QuantifierError::ModulusWithoutCount),
            (Some(count), modulus) => {
                if !(0..=MAX_COUNT).contains(&count) {
                    return Err(QuantifierError::CountOutOfRange(count));
                }
                match modulus {
                    None => Ok(Self::Exact(count as u16)),
                    Some(m) if (MIN_MODULUS..=MAX_MODULUS).contains(&m) => Ok(Self::Modulo {
                        remainder: count as u16,
                        modulus: m as u16,
                    }),
                    Some(m) => Err(QuantifierError::ModulusOutOfRange(m)),
                }
            },
        }
    }

    /// Returns `true` if this form applies to `count`.
    ///
    /// The generic form applies to everything; negative counts only ever match
    /// the generic form.
    pub fn matches(&self, count: i64) -> bool {
        match *self {
            Self::Generic => true,
            Self::Exact(n) => count == i64::from(n),
            Self::Modulo { remainder, modulus } => {
                count >= 0 && count % i64::from(modulus) == i64::from(remainder)
            },
        }
    }

    /// Packs the quantifier into a single integer: `-1` for the generic form,
    /// otherwise the modulus in bits 16 and up and the count in the low 16 bits.
    pub fn to_packed(&self) -> i32 {
        match *self {
            Self::Generic => -1,
            Self::Exact(n) => i32::from(n),
            Self::Modulo { remainder, modulus } => {
                (i32::from(modulus) << 16) | i32::from(remainder)
            },
        }
    }

    /// Inverse of [`Quantifier::to_packed`].
    pub fn from_packed(packed: i32) -> Result<Self, QuantifierError> {
        if packed == -1 {
            return Ok(Self::Generic);
        }
        if packed < 0 {
            return Err(QuantifierError::CountOutOfRange(i64::from(packed)));
        }
        let count = i64::from(packed & 0xFFFF);
        let modulus = i64::from(packed >> 16);
        Self::new(Some(count), (modulus != 0).then_some(modulus))
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => f.write_str("generic"),
            Self::Exact(n) => write!(f, "count={}", n),
            Self::Modulo { remainder, modulus } => write!(f, "count={} mod={}", remainder, modulus),
        }
    }
}

/// All templates of one text key in one culture.
///
/// Insertion order is kept so the modulo scan is deterministic.
#[derive(Clone, Debug, Default)]
pub struct KeyEntry {
    forms: IndexMap<Quantifier, Arc<TextTemplate>>,
}

impl KeyEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the template for `quantifier`, replacing an existing one in place.
    pub fn insert(&mut self, quantifier: Quantifier, template: Arc<TextTemplate>) {
        self.forms.insert(quantifier, template);
    }

    pub fn remove(&mut self, quantifier: &Quantifier) -> Option<Arc<TextTemplate>> {
        self.forms.shift_remove(quantifier)
    }

    pub fn get(&self, quantifier: &Quantifier) -> Option<&Arc<TextTemplate>> {
        self.forms.get(quantifier)
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Quantifier, &Arc<TextTemplate>)> {
        self.forms.iter()
    }

    /// Copies every form of `other` over this entry.
    pub fn merge(&mut self, other: &KeyEntry) {
        for (quantifier, template) in &other.forms {
            self.forms.insert(*quantifier, Arc::clone(template));
        }
    }

    /// Picks the best template for `count` (`None` means no quantity given).
    pub fn select(&self, count: Option<i64>) -> Option<&Arc<TextTemplate>> {
        if let Some(count) = count {
            if let Ok(exact) = u16::try_from(count)
                && let Some(template) = self.forms.get(&Quantifier::Exact(exact))
            {
                return Some(template);
            }

            let modulo = self.forms.iter().find(|(quantifier, _)| {
                matches!(quantifier, Quantifier::Modulo { .. }) && quantifier.matches(count)
            });
            if let Some((_, template)) = modulo {
                return Some(template);
            }
        }

        self.forms.get(&Quantifier::Generic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(forms: &[(Quantifier, &str)]) -> KeyEntry {
        let mut entry = KeyEntry::new();
        for (quantifier, text) in forms {
            entry.insert(*quantifier, Arc::new(TextTemplate::parse(*text)));
        }
        entry
    }

    fn selected(entry: &KeyEntry, count: Option<i64>) -> Option<&str> {
        entry.select(count).map(|t| t.source())
    }

    #[test]
    fn new_validates_ranges() {
        assert_eq!(Quantifier::new(None, None), Ok(Quantifier::Generic));
        assert_eq!(Quantifier::new(Some(3), None), Ok(Quantifier::Exact(3)));
        assert_eq!(
            Quantifier::new(Some(1), Some(10)),
            Ok(Quantifier::Modulo {
                remainder: 1,
                modulus: 10
            })
        );
        assert_eq!(
            Quantifier::new(Some(-1), None),
            Err(QuantifierError::CountOutOfRange(-1))
        );
        assert_eq!(
            Quantifier::new(Some(65536), None),
            Err(QuantifierError::CountOutOfRange(65536))
        );
        assert_eq!(
            Quantifier::new(Some(1), Some(1)),
            Err(QuantifierError::ModulusOutOfRange(1))
        );
        assert_eq!(
            Quantifier::new(Some(1), Some(1001)),
            Err(QuantifierError::ModulusOutOfRange(1001))
        );
        assert_eq!(
            Quantifier::new(None, Some(10)),
            Err(QuantifierError::ModulusWithoutCount)
        );
    }

    #[test]
    fn packed_form_round_trips_through_known_values() {
        assert_eq!(Quantifier::Generic.to_packed(), -1);
        assert_eq!(Quantifier::Exact(7).to_packed(), 7);
        let modulo = Quantifier::Modulo {
            remainder: 1,
            modulus: 10,
        };
        assert_eq!(modulo.to_packed(), (10 << 16) | 1);
        assert_eq!(Quantifier::from_packed((10 << 16) | 1), Ok(modulo));
        assert_eq!(Quantifier::from_packed(-1), Ok(Quantifier::Generic));
        assert!(Quantifier::from_packed(-5).is_err());
    }

    #[test]
    fn exact_beats_modulo_and_generic() {
        let e = entry(&[
            (Quantifier::Generic, "many"),
            (
                Quantifier::Modulo {
                    remainder: 1,
                    modulus: 10,
                },
                "ends in one",
            ),
            (Quantifier::Exact(1), "exactly one"),
        ]);

        assert_eq!(selected(&e, Some(1)), Some("exactly one"));
        assert_eq!(selected(&e, Some(11)), Some("ends in one"));
        assert_eq!(selected(&e, Some(12)), Some("many"));
        assert_eq!(selected(&e, None), Some("many"));
    }

    #[test]
    fn modulo_scan_uses_insertion_order() {
        let e = entry(&[
            (
                Quantifier::Modulo {
                    remainder: 0,
                    modulus: 2,
                },
                "even",
            ),
            (
                Quantifier::Modulo {
                    remainder: 0,
                    modulus: 10,
                },
                "round",
            ),
        ]);

        assert_eq!(selected(&e, Some(20)), Some("even"));
        assert_eq!(selected(&e, Some(3)), None);
    }

    #[test]
    fn negative_count_only_matches_generic() {
        let e = entry(&[
            (Quantifier::Generic, "generic"),
            (
                Quantifier::Modulo {
                    remainder: 0,
                    modulus: 2,
                },
                "even",
            ),
        ]);
        assert_eq!(selected(&e, Some(-4)), Some("generic"));
    }

    #[test]
    fn missing_generic_form_yields_none() {
        let e = entry(&[(Quantifier::Exact(0), "none")]);
        assert_eq!(selected(&e, Some(0)), Some("none"));
        assert_eq!(selected(&e, Some(1)), None);
        assert_eq!(selected(&e, None), None);
    }

    #[test]
    fn insert_replaces_single_form() {
        let mut e = entry(&[(Quantifier::Generic, "old"), (Quantifier::Exact(1), "one")]);
        e.merge(&entry(&[(Quantifier::Generic, "new")]));
        assert_eq!(e.len(), 2);
        assert_eq!(selected(&e, None), Some("new"));
        assert_eq!(selected(&e, Some(1)), Some("one"));
    }
}
