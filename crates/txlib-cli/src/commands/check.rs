//! Check command implementation.

use crate::ui;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use txlib::loader;

/// Arguments for the check command.
#[derive(Parser)]
pub struct CheckArgs {
    /// Dictionary files, or directories whose `*.xml` files are checked.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

/// Run the check command. Returns `false` when any file has problems.
pub fn run_check(args: CheckArgs) -> Result<bool> {
    let mut files = Vec::new();
    for path in &args.paths {
        if path.is_dir() {
            files.extend(loader::dictionary_files(path, None)?);
        } else {
            files.push(path.clone());
        }
    }

    let mut texts = 0;
    let mut problems = 0;
    for path in &files {
        match loader::parse_file(path) {
            Ok(loaded) => {
                ui::print_checked_file(path, loaded.texts);
                for issue in &loaded.issues {
                    ui::print_issue(issue);
                }
                texts += loaded.texts;
                problems += loaded.issues.len();
            },
            Err(e) => {
                ui::print_file_error(path, &e);
                problems += 1;
            },
        }
    }

    ui::print_check_summary(files.len(), texts, problems);
    Ok(problems == 0)
}
