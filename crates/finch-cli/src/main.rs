use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

mod commands;
mod config;

use commands::{eval::EvalCommand, run::RunCommand};

#[derive(Parser)]
#[command(name = "finch", version, about = "Finch scripting language")]
struct Cli {
    /// Path to a finch.toml (searched upward from the cwd by default)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script file
    Run(RunCommand),
    /// Run a snippet given on the command line
    Eval(EvalCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(cmd) => cmd.run(&config),
        Commands::Eval(cmd) => cmd.run(&config),
    }
}
