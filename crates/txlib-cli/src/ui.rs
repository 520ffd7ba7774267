//! Console output.

use colored::Colorize as _;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use txlib::LoadIssue;

const PREFIX: &str = "[tx]";

/// Installs the log subscriber. `RUST_LOG` overrides the default `warn` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn print_error(error: &anyhow::Error) {
    eprintln!("{} {:#}", PREFIX.red().bold(), error);
}

pub fn print_checked_file(path: &Path, texts: usize) {
    println!(
        "{} {} {}",
        PREFIX.cyan().bold(),
        path.display(),
        format!("({} texts)", texts).dimmed()
    );
}

pub fn print_issue(issue: &LoadIssue) {
    println!("{} {}", PREFIX.yellow().bold(), issue.to_string().yellow());
}

pub fn print_file_error(path: &Path, error: &txlib::TxError) {
    println!(
        "{} {} {}",
        PREFIX.red().bold(),
        path.display().to_string().red(),
        error
    );
}

pub fn print_check_summary(files: usize, texts: usize, problems: usize) {
    let summary = format!("{} files, {} texts, {} problems", files, texts, problems);
    if problems == 0 {
        println!("{} {}", PREFIX.green().bold(), summary.green());
    } else {
        println!("{} {}", PREFIX.red().bold(), summary.red());
    }
}

pub fn print_unresolved(key: &str, culture: &str) {
    eprintln!(
        "{} {} {}",
        PREFIX.red().bold(),
        "No text for".red(),
        format!("'{}' ({})", key, culture).white().bold()
    );
}

pub fn print_reloaded(cultures: usize, keys: usize) {
    println!(
        "{} {} {}",
        PREFIX.cyan().bold(),
        "Reloaded".dimmed(),
        format!("{} cultures, {} keys", cultures, keys).green()
    );
}

pub fn print_text(key: &str, text: Option<&str>) {
    match text {
        Some(text) => println!("{} = {}", key.bold(), text),
        None => println!("{} = {}", key.bold(), "<missing>".red()),
    }
}
