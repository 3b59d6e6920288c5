use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "upkeep",
    about = "Plan safe Composer dependency upgrades",
    version,
    author
)]
pub struct Cli {
    /// Path to the project directory (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    pub path: String,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve safe versions for outdated packages and order them into batches
    Plan {
        /// Read candidates from `composer outdated --direct --format=json` output
        #[arg(long, value_name = "FILE")]
        report: Option<String>,

        /// Leave require-dev packages out of the candidates
        #[arg(long)]
        no_dev: bool,

        /// Schedule recommended transitive updates alongside the candidates
        #[arg(long)]
        with_transitive: bool,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which installed packages a version change would break
    Impact {
        /// Package name (vendor/name)
        #[arg(value_name = "PACKAGE")]
        package: String,

        /// Version to evaluate
        #[arg(value_name = "VERSION")]
        version: String,

        /// Max depth of the transitive walk
        #[arg(long)]
        depth: Option<usize>,

        /// Print the impact report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a version satisfies a constraint
    Satisfies {
        #[arg(value_name = "VERSION")]
        version: String,

        #[arg(value_name = "CONSTRAINT")]
        constraint: String,
    },
}
