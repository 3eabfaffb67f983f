//! CLI application for Vietnamese birth certificate OCR.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, extract, models};

/// Read the child's, mother's and father's names from scanned birth certificates
#[derive(Parser)]
#[command(name = "khaisinh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract fields from a single certificate image
    Extract(extract::ExtractArgs),

    /// Extract fields from many images
    Batch(batch::BatchArgs),

    /// Inspect model files
    Models(models::ModelsArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    install_logging(cli.verbose)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Extract(args) => extract::run(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Models(args) => models::run(args, config_path).await,
        Commands::Config(args) => config::run(args).await,
    }
}

/// Map `-v` repetitions to a log level. Warnings are always shown.
fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Log to stderr so stdout carries only extraction output.
fn install_logging(verbose: u8) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
