//! Template parsing and placeholder resolution.
//!
//! Grammar, scanned left to right:
//!
//! - `{{` produces a literal `{`; a later `}}` closes the escape and produces `}`
//! - `{#}` is replaced by the count
//! - `{=key}` and `{=key#name}` splice in another text, optionally counted by the
//!   integer value of data entry `name`
//! - `{name}` is replaced by data entry `name`
//! - a `{` without a closing `}` is copied verbatim
//!
//! Anything that cannot be resolved is echoed verbatim.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Nested `{=key}` references deeper than this are not followed.
pub const MAX_NESTING: usize = 8;

/// One piece of a parsed template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// `{#}`
    Count,
    /// `{name}`
    Name { name: String, raw: String },
    /// `{=key}` or `{=key#count_name}`
    KeyRef {
        key: String,
        count_name: Option<String>,
        raw: String,
    },
}

/// A template string parsed once into segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl TextTemplate {
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let segments = parse_segments(&source);
        Self { source, segments }
    }

    /// The unparsed template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// `true` when the template contains nothing but literal text.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }

    /// Names of all `{name}` placeholders and `#count_name` references.
    pub fn placeholder_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Name { name, .. } => Some(name.as_str()),
            Segment::KeyRef {
                count_name: Some(name),
                ..
            } => Some(name.as_str()),
            _ => None,
        })
    }
}

fn parse_segments(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut escaped = false;
    let mut rest = source;

    while !rest.is_empty() {
        let Some(pos) = rest.find(['{', '}']) else {
            literal.push_str(rest);
            break;
        };
        literal.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            literal.push('{');
            escaped = true;
            rest = &tail[2..];
            continue;
        }

        if tail.starts_with('}') {
            if escaped && tail.starts_with("}}") {
                literal.push('}');
                escaped = false;
                rest = &tail[2..];
            } else {
                literal.push('}');
                rest = &tail[1..];
            }
            continue;
        }

        let Some(end) = tail.find('}') else {
            literal.push_str(tail);
            break;
        };
        let content = &tail[1..end];
        let raw = &tail[..=end];

        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(placeholder(content, raw));
        rest = &tail[end + 1..];
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    segments
}

fn placeholder(content: &str, raw: &str) -> Segment {
    if content == "#" {
        return Segment::Count;
    }

    if let Some(reference) = content.strip_prefix('=') {
        let (key, count_name) = match reference.split_once('#') {
            Some((key, name)) => (key, Some(name.to_string())),
            None => (reference, None),
        };
        return Segment::KeyRef {
            key: key.to_string(),
            count_name,
            raw: raw.to_string(),
        };
    }

    Segment::Name {
        name: content.to_string(),
        raw: raw.to_string(),
    }
}

/// Named values substituted into `{name}` placeholders.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextArgs {
    values: IndexMap<String, String>,
}

impl TextArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl ToString) {
        self.values.insert(name.into(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for TextArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Self::new();
        for (name, value) in iter {
            args.set(name, value);
        }
        args
    }
}

impl<K: Into<String>, V: ToString, const N: usize> From<[(K, V); N]> for TextArgs {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Source of templates for nested `{=key}` references.
pub trait KeyLookup {
    fn lookup(&self, key: &str, count: Option<i64>) -> Option<Arc<TextTemplate>>;
}

/// Receives everything resolution could not satisfy. All methods default to
/// doing nothing.
pub trait ResolveObserver {
    /// A `{name}` (or `{#}` without a count) had no value.
    fn unresolved_placeholder(&self, _key: &str, _placeholder: &str) {}
    /// A `{=nested}` key did not resolve in any culture.
    fn unresolved_key(&self, _key: &str, _nested: &str) {}
    /// A `#count_name` value was missing or not an integer.
    fn invalid_count(&self, _key: &str, _count_name: &str, _value: Option<&str>) {}
    /// A `{=nested}` reference was cyclic or nested too deeply.
    fn rejected_reference(&self, _key: &str, _nested: &str) {}
    /// Data entries that no placeholder consumed.
    fn unused_data(&self, _key: &str, _names: &[&str]) {}
}

impl ResolveObserver for () {}

/// Evaluates a top-level template against `count` and `data`.
///
/// `key` is the text key the template was found under; it is used for
/// reporting and cycle detection.
pub fn resolve(
    template: &TextTemplate,
    key: &str,
    count: Option<i64>,
    data: &TextArgs,
    lookup: &(impl KeyLookup + ?Sized),
    observer: &(impl ResolveObserver + ?Sized),
) -> String {
    let mut resolution = Resolution {
        data,
        lookup,
        observer,
        consumed: HashSet::new(),
        stack: vec![key.to_string()],
    };
    let text = resolution.evaluate(template, key, count);

    let unused: Vec<&str> = data
        .names()
        .filter(|name| !resolution.consumed.contains(*name))
        .collect();
    if !unused.is_empty() {
        observer.unused_data(key, &unused);
    }

    text
}

struct Resolution<'a, L: ?Sized, O: ?Sized> {
    data: &'a TextArgs,
    lookup: &'a L,
    observer: &'a O,
    consumed: HashSet<String>,
    stack: Vec<String>,
}

impl<L: KeyLookup + ?Sized, O: ResolveObserver + ?Sized> Resolution<'_, L, O> {
    fn evaluate(&mut self, template: &TextTemplate, key: &str, count: Option<i64>) -> String {
        let data = self.data;
        let mut out = String::with_capacity(template.source().len());

        for segment in template.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Count => match count {
                    Some(count) => out.push_str(&count.to_string()),
                    None => {
                        self.observer.unresolved_placeholder(key, "#");
                        out.push_str("{#}");
                    },
                },
                Segment::Name { name, raw } => match data.get(name) {
                    Some(value) => {
                        self.consumed.insert(name.clone());
                        out.push_str(value);
                    },
                    None => {
                        self.observer.unresolved_placeholder(key, name);
                        out.push_str(raw);
                    },
                },
                Segment::KeyRef {
                    key: nested,
                    count_name,
                    raw,
                } => {
                    let nested_count = count_name
                        .as_deref()
                        .and_then(|name| self.count_from_data(key, name));
                    match self.nested(nested, nested_count) {
                        Some(text) => out.push_str(&text),
                        None => out.push_str(raw),
                    }
                },
            }
        }

        out
    }

    fn count_from_data(&mut self, key: &str, name: &str) -> Option<i64> {
        let data = self.data;
        let value = data.get(name);
        if value.is_some() {
            self.consumed.insert(name.to_string());
        }
        match value.map(|v| v.trim().parse::<i64>()) {
            Some(Ok(count)) => Some(count),
            _ => {
                self.observer.invalid_count(key, name, value);
                None
            },
        }
    }

    fn nested(&mut self, nested: &str, count: Option<i64>) -> Option<String> {
        let parent = self.stack.last().cloned().unwrap_or_default();

        if self.stack.len() > MAX_NESTING || self.stack.iter().any(|k| k == nested) {
            self.observer.rejected_reference(&parent, nested);
            return None;
        }

        let Some(template) = self.lookup.lookup(nested, count) else {
            self.observer.unresolved_key(&parent, nested);
            return None;
        };

        self.stack.push(nested.to_string());
        let text = self.evaluate(&template, nested, count);
        self.stack.pop();
        Some(text)
    }
}
