mod commands;
mod config;
mod editor;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{convert, init, replay, ConvertArgs, InitArgs, ReplayArgs};
use config::Config;
use tracing_subscriber::EnvFilter;

/// Quire CLI - structured document conversion and replay
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (overrides the config file and RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a quire.config.json
    Init(InitArgs),

    /// Convert a document between data, model and editing markup
    Convert(ConvertArgs),

    /// Apply serialized batches to a document
    Replay(ReplayArgs),
}

fn init_logging(filter: EnvFilter) {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let filter = match &cli.log {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = Config::load(&cwd)
                .map(|config| config.log_level)
                .unwrap_or_else(|_| "warn".to_string());
            EnvFilter::new(level)
        }),
    };
    init_logging(filter);

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Convert(args) => convert(args, &cwd),
        Command::Replay(args) => replay(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
