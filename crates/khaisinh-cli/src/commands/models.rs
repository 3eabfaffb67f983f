//! Models command - inspect the model files the pipeline loads.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use khaisinh_core::ocr::RecognizerSpec;
use khaisinh_core::{KhaiSinhConfig, ModelPaths};

use super::load_config;

/// Arguments for the models command.
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    command: ModelsCommand,
}

#[derive(Subcommand)]
enum ModelsCommand {
    /// Check that every model file exists
    Check(CheckArgs),
}

#[derive(Args)]
struct CheckArgs {
    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

pub async fn run(args: ModelsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        ModelsCommand::Check(check_args) => {
            let config = load_config(config_path, check_args.model_dir.as_deref())?;
            check_models(&config)
        }
    }
}

fn check_models(config: &KhaiSinhConfig) -> anyhow::Result<()> {
    println!("{}", style("Model Status").bold());
    println!("Model directory: {}", config.models.model_dir.display());
    println!();

    print_file("detector", &config.detector_path());

    let recognizer_config = config.recognizer_config_path();
    print_file("recognizer config", &recognizer_config);

    if recognizer_config.exists() {
        match RecognizerSpec::from_file(&recognizer_config) {
            Ok(spec) => {
                print_file("recognizer", &spec.model);
                match &spec.dictionary {
                    Some(dictionary) => print_file("dictionary", dictionary),
                    None => println!("    {} {:<20} built-in", style("✓").green(), "dictionary"),
                }
            }
            Err(e) => println!("    {} recognizer config unreadable: {}", style("✗").red(), e),
        }
    }

    println!();
    match ModelPaths::resolve(config) {
        Ok(_) => {
            println!("{} Ready", style("✓").green());
            Ok(())
        }
        Err(e) => anyhow::bail!("Models are not ready: {}", e),
    }
}

fn print_file(name: &str, path: &Path) {
    match fs::metadata(path) {
        Ok(metadata) => println!(
            "    {} {:<20} {:>10}  {}",
            style("✓").green(),
            name,
            format_size(metadata.len()),
            path.display()
        ),
        Err(_) => println!(
            "    {} {:<20} {:>10}  {}",
            style("✗").red(),
            name,
            "missing",
            path.display()
        ),
    }
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1}GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.1}MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1}KB", bytes as f64 / 1_000.0)
    } else {
        format!("{}B", bytes)
    }
}
