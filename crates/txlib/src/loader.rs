//! Dictionary file parsing.
//!
//! Two file shapes are understood. A single-culture file takes its culture from
//! the file name (`app.de.xml`) and lists `<text>` elements directly under the
//! root; a combined file groups them in `<culture name="...">` elements:
//!
//! ```xml
//! <translation>
//!   <culture name="en">
//!     <text key="items" count="1" mod="10">one item</text>
//!     <text key="items">{#} items</text>
//!   </culture>
//! </translation>
//! ```
//!
//! A malformed entry (bad culture name, count, modulus or boolean attribute) is
//! reported as a [`LoadIssue`] and skipped; the rest of the file still loads.

use crate::error::TxError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use txlib_core::{Dictionary, Quantifier, TextTemplate, normalize_culture};

/// Boolean attributes translators may set on `<text>` elements.
const FLAG_ATTRIBUTES: [&str; 3] = ["acceptmissing", "acceptplaceholders", "acceptpunctuation"];

/// A skipped entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadIssue {
    pub path: PathBuf,
    pub line: usize,
    pub message: String,
}

impl fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.path.display(), self.line, self.message)
    }
}

/// The result of parsing one file.
#[derive(Debug, Default)]
pub struct LoadedDictionary {
    pub dictionary: Dictionary,
    pub issues: Vec<LoadIssue>,
    /// Number of `<text>` entries that were accepted.
    pub texts: usize,
}

/// A file that has been loaded, remembered for reloading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

impl LoadedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let modified = modified_time(&path);
        Self { path, modified }
    }

    /// `true` when the file's modification time differs from the one recorded
    /// (including the file having disappeared).
    pub fn is_stale(&self) -> bool {
        modified_time(&self.path) != self.modified
    }

    pub fn refresh(&mut self) {
        self.modified = modified_time(&self.path);
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Reads and parses a dictionary file.
pub fn parse_file(path: &Path) -> Result<LoadedDictionary, TxError> {
    let content = fs::read_to_string(path).map_err(|source| TxError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut issues = Vec::new();
    let file_culture = match culture_from_file_name(path) {
        Some(Ok(culture)) => Some(culture),
        Some(Err(message)) => {
            issues.push(issue(path, 0, message));
            None
        },
        None => None,
    };

    let mut loaded = parse_str(&content, file_culture.as_deref(), path)?;
    issues.append(&mut loaded.issues);
    loaded.issues = issues;
    Ok(loaded)
}

/// Parses dictionary XML. `file_culture` applies to `<text>` elements outside
/// any `<culture>` element; `path` is only used for reporting.
///
/// A byte order mark is dropped and line endings are normalized to `\n`
/// first, as XML processors do.
pub fn parse_str(
    content: &str,
    file_culture: Option<&str>,
    path: &Path,
) -> Result<LoadedDictionary, TxError> {
    let content = normalize_line_endings(content.strip_prefix('\u{feff}').unwrap_or(content));
    let content: &str = &content;
    let mut reader = Reader::from_str(content);
    let mut loaded = LoadedDictionary::default();
    let mut parser = Parser {
        path,
        content,
        file_culture,
        culture: Scope::File,
        pending: None,
    };

    loop {
        let position = reader.buffer_position();
        let event = reader.read_event().map_err(|source| TxError::Xml {
            path: path.to_path_buf(),
            source,
        })?;

        match event {
            Event::Start(e) => parser.start(&e, position, false, &mut loaded),
            Event::Empty(e) => parser.start(&e, position, true, &mut loaded),
            Event::Text(e) => {
                if let Some(pending) = parser.pending.as_mut() {
                    let text = e.unescape().map_err(|source| TxError::Xml {
                        path: path.to_path_buf(),
                        source,
                    })?;
                    pending.text.push_str(&text);
                }
            },
            Event::CData(e) => {
                if let Some(pending) = parser.pending.as_mut() {
                    pending.text.push_str(&String::from_utf8_lossy(&e));
                }
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"text" => parser.finish(&mut loaded),
                b"culture" => parser.culture = Scope::File,
                _ => {},
            },
            Event::Eof => break,
            _ => {},
        }
    }

    for issue in &loaded.issues {
        tracing::warn!("Skipped dictionary entry at {}", issue);
    }

    Ok(loaded)
}

/// Extracts the culture from `name.{culture}.xml`.
///
/// Returns `None` when the file name has no culture part.
pub fn culture_from_file_name(path: &Path) -> Option<Result<String, String>> {
    let stem = path.file_stem()?.to_str()?;
    let (_, suffix) = stem.rsplit_once('.')?;
    Some(normalize_culture(suffix).map_err(|e| format!("file name: {}", e)))
}

/// Lists the dictionary files of a directory, sorted by name.
///
/// With a prefix only `{prefix}.xml` and `{prefix}.{culture}.xml` are returned,
/// otherwise every `*.xml` file.
pub fn dictionary_files(dir: &Path, prefix: Option<&str>) -> Result<Vec<PathBuf>, TxError> {
    let io_error = |source| TxError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if !path.is_file() || !path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("xml")) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let matches_prefix = match prefix {
            None => true,
            Some(prefix) => {
                stem == prefix
                    || stem
                        .strip_prefix(prefix)
                        .and_then(|rest| rest.strip_prefix('.'))
                        .is_some_and(|culture| !culture.contains('.'))
            },
        };
        if matches_prefix {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

enum Scope {
    /// Outside any `<culture>` element: the file name's culture applies.
    File,
    /// Inside `<culture>`; `None` when its name was invalid.
    Culture(Option<String>),
}

struct PendingText {
    culture: String,
    key: String,
    quantifier: Quantifier,
    text: String,
}

struct Parser<'a> {
    path: &'a Path,
    content: &'a str,
    file_culture: Option<&'a str>,
    culture: Scope,
    pending: Option<PendingText>,
}

impl Parser<'_> {
    fn start(
        &mut self,
        e: &BytesStart<'_>,
        position: usize,
        empty: bool,
        loaded: &mut LoadedDictionary,
    ) {
        match e.local_name().as_ref() {
            b"culture" if !empty => {
                let culture = match attribute(e, "name") {
                    Some(name) => match normalize_culture(&name) {
                        Ok(culture) => Some(culture),
                        Err(err) => {
                            loaded.issues.push(self.issue(position, err.to_string()));
                            None
                        },
                    },
                    None => {
                        let message = "culture element without a name".to_string();
                        loaded.issues.push(self.issue(position, message));
                        None
                    },
                };
                self.culture = Scope::Culture(culture);
            },
            b"text" => match self.pending_text(e) {
                Ok(Some(pending)) => {
                    self.pending = Some(pending);
                    if empty {
                        self.finish(loaded);
                    }
                },
                Ok(None) => {},
                Err(message) => loaded.issues.push(self.issue(position, message)),
            },
            _ => {},
        }
    }

    /// Builds the entry for a `<text>` element. `Ok(None)` means the element is
    /// inside a culture that was already reported as invalid.
    fn pending_text(&self, e: &BytesStart<'_>) -> Result<Option<PendingText>, String> {
        let culture = match &self.culture {
            Scope::Culture(Some(culture)) => culture.clone(),
            Scope::Culture(None) => return Ok(None),
            Scope::File => match self.file_culture {
                Some(culture) => culture.to_string(),
                None => {
                    return Err(
                        "text outside a culture element in a file without a culture suffix"
                            .to_string(),
                    );
                },
            },
        };

        let key = attribute(e, "key")
            .filter(|key| !key.is_empty())
            .ok_or_else(|| "text element without a key".to_string())?;

        let count = integer_attribute(e, "count")?;
        let modulus = integer_attribute(e, "mod")?;
        let quantifier =
            Quantifier::new(count, modulus).map_err(|err| format!("text '{}': {}", key, err))?;

        for flag in FLAG_ATTRIBUTES {
            if let Some(value) = attribute(e, flag)
                && txlib_toml::parse_bool(&value).is_none()
            {
                return Err(format!("text '{}': {}=\"{}\" is not a boolean", key, flag, value));
            }
        }

        Ok(Some(PendingText {
            culture,
            key,
            quantifier,
            text: String::new(),
        }))
    }

    fn finish(&mut self, loaded: &mut LoadedDictionary) {
        if let Some(pending) = self.pending.take() {
            loaded.dictionary.insert(
                &pending.culture,
                pending.key,
                pending.quantifier,
                Arc::new(TextTemplate::parse(pending.text)),
            );
            loaded.texts += 1;
        }
    }

    fn issue(&self, position: usize, message: String) -> LoadIssue {
        let line = line_of(self.content, position);
        issue(self.path, line, message)
    }
}

fn issue(path: &Path, line: usize, message: String) -> LoadIssue {
    LoadIssue {
        path: path.to_path_buf(),
        line,
        message,
    }
}

fn normalize_line_endings(content: &str) -> Cow<'_, str> {
    if content.contains('\r') {
        Cow::Owned(content.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(content)
    }
}

fn line_of(content: &str, position: usize) -> usize {
    let end = position.min(content.len());
    content.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name.as_bytes())
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

fn integer_attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<i64>, String> {
    match attribute(e, name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("{}=\"{}\" is not an integer", name, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::TempDir;

    fn parse(content: &str, culture: Option<&str>) -> LoadedDictionary {
        parse_str(content, culture, Path::new("test.xml")).unwrap()
    }

    fn source(
        loaded: &LoadedDictionary,
        culture: &str,
        key: &str,
        count: Option<i64>,
    ) -> Option<String> {
        let order = vec![culture.to_string()];
        loaded
            .dictionary
            .lookup(&order, key, count)
            .map(|t| t.source().to_string())
    }

    #[test]
    fn single_culture_file() {
        let loaded = parse(
            r#"<translation>
                <text key="hello">Hello &amp; welcome</text>
                <text key="items" count="1">one item</text>
                <text key="items">{#} items</text>
            </translation>"#,
            Some("en"),
        );

        assert!(loaded.issues.is_empty());
        assert_eq!(loaded.texts, 3);
        assert_eq!(source(&loaded, "en", "hello", None).as_deref(), Some("Hello & welcome"));
        assert_eq!(source(&loaded, "en", "items", Some(1)).as_deref(), Some("one item"));
        assert_eq!(source(&loaded, "en", "items", Some(4)).as_deref(), Some("{#} items"));
    }

    #[test]
    fn combined_culture_file() {
        let loaded = parse(
            r#"<?xml version="1.0" encoding="utf-8"?>
            <translation>
                <culture name="de">
                    <text key="hello">Hallo</text>
                </culture>
                <culture name="en-US">
                    <text key="hello">Howdy</text>
                    <text key="items" count="1" mod="10">{#} item</text>
                </culture>
            </translation>"#,
            None,
        );

        assert!(loaded.issues.is_empty());
        assert_eq!(source(&loaded, "de", "hello", None).as_deref(), Some("Hallo"));
        assert_eq!(source(&loaded, "en-us", "hello", None).as_deref(), Some("Howdy"));
        assert_eq!(source(&loaded, "en-us", "items", Some(21)).as_deref(), Some("{#} item"));
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let loaded = parse(
            r#"<translation>
<culture name="not a culture">
    <text key="lost">Lost</text>
</culture>
<culture name="en">
    <text key="a" count="many">bad count</text>
    <text key="b" count="1" mod="1">bad mod</text>
    <text key="c" mod="10">mod without count</text>
    <text key="d" acceptmissing="perhaps">bad flag</text>
    <text>no key</text>
    <text key="ok" acceptmissing="true">fine</text>
</culture>
</translation>"#,
            None,
        );

        assert_eq!(loaded.texts, 1);
        assert_eq!(loaded.issues.len(), 6);
        assert_eq!(loaded.issues[0].line, 2);
        assert_eq!(loaded.issues[1].line, 6);
        assert!(loaded.issues[1].message.contains("count=\"many\""));
        assert_eq!(source(&loaded, "en", "ok", None).as_deref(), Some("fine"));
        assert_eq!(source(&loaded, "en", "a", None), None);
    }

    #[test]
    fn texts_without_culture_are_reported() {
        let loaded = parse("<translation><text key=\"a\">A</text></translation>", None);
        assert_eq!(loaded.texts, 0);
        assert_eq!(loaded.issues.len(), 1);
    }

    #[test]
    fn empty_text_elements_define_empty_templates() {
        let loaded = parse(r#"<translation><text key="blank"/></translation>"#, Some("en"));
        assert_eq!(source(&loaded, "en", "blank", None).as_deref(), Some(""));
    }

    #[test]
    fn windows_line_endings_are_normalized() {
        let loaded = parse(
            "\u{feff}<translation>\r\n<text key=\"two\">line1\r\nline2</text>\r\n\
             <text key=\"old\">mac\rstyle</text>\r\n\
             <text key=\"bad\" count=\"x\">bad</text>\r\n</translation>",
            Some("en"),
        );
        assert_eq!(source(&loaded, "en", "two", None).as_deref(), Some("line1\nline2"));
        assert_eq!(source(&loaded, "en", "old", None).as_deref(), Some("mac\nstyle"));
        assert_eq!(loaded.issues.len(), 1);
        assert_eq!(loaded.issues[0].line, 6);
    }

    #[test]
    fn broken_xml_is_an_error() {
        let result = parse_str(
            "<translation><text key=\"a\">A</culture>",
            Some("en"),
            Path::new("x.xml"),
        );
        assert!(matches!(result, Err(TxError::Xml { .. })));
    }

    #[test]
    fn culture_from_file_names() {
        assert_eq!(
            culture_from_file_name(Path::new("lang/app.de.xml")),
            Some(Ok("de".to_string()))
        );
        assert_eq!(
            culture_from_file_name(Path::new("app.en_US.xml")),
            Some(Ok("en-us".to_string()))
        );
        assert_eq!(culture_from_file_name(Path::new("app.xml")), None);
        assert!(matches!(culture_from_file_name(Path::new("app.!!.xml")), Some(Err(_))));
    }

    #[test]
    fn directory_scan_honours_prefix() {
        let dir = TempDir::new().unwrap();
        let names = [
            "app.xml",
            "app.de.xml",
            "app.en.xml",
            "other.de.xml",
            "app.de.bak.xml",
            "notes.txt",
        ];
        for name in names {
            let mut file = fs::File::create(dir.path().join(name)).unwrap();
            writeln!(file, "<translation/>").unwrap();
        }

        let names = |files: Vec<PathBuf>| -> Vec<String> {
            files
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect()
        };

        assert_eq!(
            names(dictionary_files(dir.path(), Some("app")).unwrap()),
            vec!["app.de.xml", "app.en.xml", "app.xml"]
        );
        assert_eq!(dictionary_files(dir.path(), None).unwrap().len(), 5);
    }

    #[test]
    fn loaded_file_detects_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.en.xml");
        fs::write(&path, "<translation/>").unwrap();

        let mut record = LoadedFile::new(&path);
        assert!(!record.is_stale());

        fs::remove_file(&path).unwrap();
        assert!(record.is_stale());
        record.refresh();
        assert!(!record.is_stale());
    }
}
