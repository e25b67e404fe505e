#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::uninlined_format_args)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "splitpack")]
#[command(author, version, about = "Extract and rewrite module dependencies", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Rewrite dependency references in source files
    Transform {
        /// Files to transform
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Replace a global with an expression (e.g., __DEV__=false)
        #[arg(long, short = 'D', value_name = "NAME=EXPR")]
        define: Vec<String>,

        /// Config file (defaults to splitpack.json in the working directory)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Fail when a relative request does not exist on disk
        #[arg(long)]
        check_exists: bool,

        /// Do not generate source maps
        #[arg(long)]
        no_source_map: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    logging::init(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Version => commands::version::run(cli.json),
        Commands::Transform {
            files,
            define,
            config,
            check_exists,
            no_source_map,
        } => {
            let action = commands::transform::TransformAction {
                files,
                cwd,
                config,
                define,
                check_exists,
                source_maps: !no_source_map,
            };
            commands::transform::run(action, cli.json)
        }
    }
}
