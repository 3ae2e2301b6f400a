//! Command-line interface for tf-inventory
//! Ansible runs this binary as a dynamic inventory script.
//!
//! Usage:
//!   tf-inventory --list                 - Print the whole inventory
//!   tf-inventory --host `<name>`        - Print the variables of one host
//!
//! `--root` and `--config` change where manifests are searched and which settings apply.

mod commands;

use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use commands::{CliError, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("tf-inventory")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Ansible dynamic inventory built from Terraform manifest files")
        .arg_required_else_help(true)
        .arg(
            Arg::new("list")
                .long("list")
                .help("Print the full inventory as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Print the variables of a single host as JSON"),
        )
        .group(
            ArgGroup::new("mode")
                .args(["list", "host"])
                .required(true),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .short('r')
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Directory searched for manifests (default: from configuration)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("TOML file layered over the built-in defaults"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log debug detail to stderr, overriding RUST_LOG")
                .action(ArgAction::SetTrue),
        )
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tf-inventory: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout carries only the inventory document.
fn init_tracing(verbose: bool) {
    let directives = log_directives(verbose, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// `-v` means debug regardless of `RUST_LOG`; otherwise a non-blank `RUST_LOG`
/// applies, falling back to warnings only.
fn log_directives(verbose: bool, rust_log: Option<String>) -> String {
    if verbose {
        return "debug".to_string();
    }
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => directives,
        _ => "warn".to_string(),
    }
}

fn run(matches: &ArgMatches) -> Result<(), CliError> {
    let settings = Settings::load(
        matches.get_one::<PathBuf>("config").map(PathBuf::as_path),
        matches.get_one::<PathBuf>("root").cloned(),
    )?;

    if matches.get_flag("list") {
        return commands::handle_list_command(&settings);
    }
    if let Some(host) = matches.get_one::<String>("host") {
        return commands::handle_host_command(&settings, host);
    }
    Ok(())
}
