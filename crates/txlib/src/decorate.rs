//! Formatting helpers built on the text lookup.
//!
//! Each helper is driven by an optional `Tx:` system key, so a dictionary can
//! localize punctuation and number formats. Without such a key the built-in
//! default applies.

use crate::Tx;
use txlib_core::TextArgs;

pub const QUOTE_KEY: &str = "Tx:quote";
pub const PARENTHESES_KEY: &str = "Tx:parentheses";
pub const COLON_KEY: &str = "Tx:colon";
pub const GROUP_SEPARATOR_KEY: &str = "Tx:number.group";
pub const DECIMAL_SEPARATOR_KEY: &str = "Tx:number.decimal";
pub const BYTES_KEY: &str = "Tx:bytes";

const BYTE_UNITS: [(&str, &str); 4] = [
    ("Tx:kib", "{value} KB"),
    ("Tx:mib", "{value} MB"),
    ("Tx:gib", "{value} GB"),
    ("Tx:tib", "{value} TB"),
];

impl Tx {
    /// Wraps `text` in the culture's quotation marks.
    pub fn quote(&self, text: &str) -> String {
        self.wrap(QUOTE_KEY, text, "\u{201c}{text}\u{201d}")
    }

    /// Resolves `key` and quotes the result.
    pub fn quote_key(&self, key: &str) -> Option<String> {
        self.resolve(key).map(|text| self.quote(&text))
    }

    pub fn parentheses(&self, text: &str) -> String {
        self.wrap(PARENTHESES_KEY, text, "({text})")
    }

    /// Appends the culture's colon, e.g. `"Name:"` or `"Nom :"`.
    pub fn colon(&self, text: &str) -> String {
        self.wrap(COLON_KEY, text, "{text}:")
    }

    /// Formats `value` with `decimals` fraction digits and the culture's
    /// group and decimal separators.
    pub fn format_number(&self, value: f64, decimals: usize) -> String {
        let group = self.resolve_or(GROUP_SEPARATOR_KEY, None, &TextArgs::new(), ",");
        let decimal = self.resolve_or(DECIMAL_SEPARATOR_KEY, None, &TextArgs::new(), ".");
        format_with_separators(value, decimals, &group, &decimal)
    }

    /// Formats a byte count using binary units (`"512 bytes"`, `"1.5 KB"`).
    pub fn format_byte_size(&self, bytes: u64) -> String {
        if bytes < 1024 {
            let default = if bytes == 1 { "{#} byte" } else { "{#} bytes" };
            return self.resolve_or(BYTES_KEY, Some(bytes as i64), &TextArgs::new(), default);
        }

        let mut value = bytes as f64 / 1024.0;
        let mut unit = 0;
        while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
            value /= 1024.0;
            unit += 1;
        }
        let decimals = if value < 10.0 { 1 } else { 0 };
        let (key, default) = BYTE_UNITS[unit];
        let data = TextArgs::new().with("value", self.format_number(value, decimals));
        self.resolve_or(key, None, &data, default)
    }

    fn wrap(&self, key: &str, text: &str, default: &str) -> String {
        self.resolve_or(key, None, &TextArgs::new().with("text", text), default)
    }
}

/// Upper-cases the first character of `text`.
pub fn upper_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn format_with_separators(value: f64, decimals: usize, group: &str, decimal: &str) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let mut out = String::new();
    if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            out.push_str(group);
        }
        out.push(digit);
    }
    if let Some(fraction) = fraction {
        out.push_str(decimal);
        out.push_str(fraction);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TxOptions;
    use rstest::rstest;

    fn english() -> Tx {
        Tx::new(TxOptions::builder().culture("en").build()).unwrap()
    }

    #[test]
    fn defaults_without_system_keys() {
        let tx = english();
        assert_eq!(tx.quote("a"), "\u{201c}a\u{201d}");
        assert_eq!(tx.parentheses("a"), "(a)");
        assert_eq!(tx.colon("Name"), "Name:");
        assert_eq!(tx.format_number(1234567.891, 2), "1,234,567.89");
    }

    #[test]
    fn system_keys_override_defaults() {
        let tx = Tx::new(TxOptions::builder().culture("fr").build()).unwrap();
        tx.add_text("fr", COLON_KEY, None, None, "{text} :").unwrap();
        tx.add_text("fr", QUOTE_KEY, None, None, "« {text} »").unwrap();
        tx.add_text("fr", GROUP_SEPARATOR_KEY, None, None, " ").unwrap();
        tx.add_text("fr", DECIMAL_SEPARATOR_KEY, None, None, ",").unwrap();
        tx.add_text("fr", "title", None, None, "Titre").unwrap();

        assert_eq!(tx.colon("Nom"), "Nom :");
        assert_eq!(tx.quote_key("title").as_deref(), Some("« Titre »"));
        assert_eq!(tx.quote_key("missing"), None);
        assert_eq!(tx.format_number(-9876.5, 1), "-9 876,5");
    }

    #[rstest]
    #[case(0, "0 bytes")]
    #[case(1, "1 byte")]
    #[case(1023, "1023 bytes")]
    #[case(1536, "1.5 KB")]
    #[case(10 * 1024 * 1024, "10 MB")]
    #[case(3 * 1024 * 1024 * 1024, "3.0 GB")]
    fn byte_sizes(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(english().format_byte_size(bytes), expected);
    }

    #[test]
    fn byte_size_forms_come_from_the_dictionary() {
        let tx = english();
        tx.add_text("en", BYTES_KEY, Some(1), None, "one byte").unwrap();
        tx.add_text("en", BYTES_KEY, None, None, "{#} B").unwrap();
        assert_eq!(tx.format_byte_size(1), "one byte");
        assert_eq!(tx.format_byte_size(7), "7 B");
    }

    #[rstest]
    #[case("hello", "Hello")]
    #[case("ßtraße", "SStraße")]
    #[case("", "")]
    fn upper_first_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(upper_first(input), expected);
    }

    #[test]
    fn small_numbers_have_no_group_separator() {
        assert_eq!(format_with_separators(999.0, 0, ",", "."), "999");
        assert_eq!(format_with_separators(-0.01, 1, ",", "."), "0.0");
        assert_eq!(format_with_separators(1000.0, 0, "'", "."), "1'000");
    }
}
