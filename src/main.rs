mod agents;
mod cli;
mod composer;
mod config;
mod constraint;
mod error;
mod registry;
mod workflow;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Plan {
            report,
            no_dev,
            with_transitive,
            json,
        } => workflow::execute_plan(&cli.path, report.as_deref(), no_dev, with_transitive, json),
        Commands::Impact {
            package,
            version,
            depth,
            json,
        } => workflow::execute_impact(&cli.path, &package, &version, depth, json),
        Commands::Satisfies {
            version,
            constraint,
        } => {
            if !workflow::execute_satisfies(&version, &constraint) {
                process::exit(1);
            }
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
