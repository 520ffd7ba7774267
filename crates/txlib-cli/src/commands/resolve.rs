//! Resolve command implementation.

use super::DictionaryArgs;
use crate::ui;
use anyhow::Result;
use clap::Parser;
use txlib::TextArgs;

/// Arguments for the resolve command.
#[derive(Parser)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub dictionary: DictionaryArgs,

    /// Count used to pick the plural form and fill `{#}`.
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    pub count: Option<i64>,

    /// Placeholder value as `name=value`; may be repeated.
    #[arg(short, long = "arg", value_parser = parse_arg)]
    pub args: Vec<(String, String)>,

    /// The text key.
    pub key: String,
}

fn parse_arg(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{}'", value)),
    }
}

/// Run the resolve command. Returns `false` when the key is unresolved.
pub fn run_resolve(args: ResolveArgs) -> Result<bool> {
    let tx = args.dictionary.open(false)?;
    let data: TextArgs = args.args.into_iter().collect();

    let resolved = tx.try_resolve_full(&args.key, args.count, &data)?;
    tx.shutdown()?;

    match resolved {
        Some(text) => {
            println!("{}", text);
            Ok(true)
        },
        None => {
            ui::print_unresolved(&args.key, &tx.culture());
            Ok(false)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_value_pairs() {
        assert_eq!(
            parse_arg("name=Bob=Alice"),
            Ok(("name".to_string(), "Bob=Alice".to_string()))
        );
        assert_eq!(parse_arg("empty="), Ok(("empty".to_string(), String::new())));
        assert!(parse_arg("=x").is_err());
        assert!(parse_arg("novalue").is_err());
    }
}
