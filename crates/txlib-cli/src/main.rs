use clap::{Parser, Subcommand};
use std::process::ExitCode;
use txlib_cli::commands::{
    CheckArgs, KeysArgs, ResolveArgs, WatchArgs, run_check, run_keys, run_resolve, run_watch,
};

#[derive(Parser)]
#[command(name = "tx")]
#[command(about = "Check and query txlib dictionary files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse dictionary files and report malformed entries
    Check(CheckArgs),

    /// Resolve a text key
    Resolve(ResolveArgs),

    /// List the keys of a culture
    Keys(KeysArgs),

    /// Print texts again whenever the dictionary files change
    Watch(WatchArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    txlib_cli::ui::init_logging();

    let result = match cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Resolve(args) => run_resolve(args),
        Commands::Keys(args) => run_keys(args),
        Commands::Watch(args) => run_watch(args),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            txlib_cli::ui::print_error(&e);
            ExitCode::from(2)
        },
    }
}
