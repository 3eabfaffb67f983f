//! Batch processing command for multiple certificate images.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use khaisinh_core::{create_extractor, load_image, BirthCertificate, ExtractionReport, ExtractionStatus};

use super::{is_image_path, load_config, ExtractionResponse};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching input images
    #[arg(required = true)]
    input: String,

    /// Output directory for one JSON envelope per image
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,

    /// Also write summary.csv
    #[arg(long)]
    summary: bool,

    /// Include confidence, bounding boxes and run details
    #[arg(long)]
    metadata: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    report: Option<ExtractionReport>,
    error: Option<String>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_image_path(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching images found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} images to process",
        style("ℹ").blue(),
        files.len()
    );

    let config = load_config(config_path, args.model_dir.as_deref())?;
    let extractor = create_extractor(&config)
        .map_err(|e| anyhow::anyhow!("Failed to load models: {}", e))?;

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());

    for path in files {
        match load_image(&path) {
            Ok(image) => {
                let report = extractor.extract_report(&image, extractor.field_filter());
                debug!("{}: {:?}", path.display(), report.status);
                results.push(FileResult {
                    path,
                    report: Some(report),
                    error: None,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(FileResult {
                        path,
                        report: None,
                        error: Some(error_msg),
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let mut extracted = 0;
    let mut failed = Vec::new();
    let mut responses = Vec::new();

    for result in results {
        let filename = file_name(&result.path);
        let Some(report) = result.report else {
            failed.push((filename, result.error.unwrap_or_default()));
            continue;
        };
        if report.status == ExtractionStatus::Extracted {
            extracted += 1;
        }

        let response = ExtractionResponse::from_report(&filename, report, args.metadata);
        match &args.output_dir {
            Some(output_dir) => {
                let stem = result
                    .path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("certificate");
                let output_path = output_dir.join(format!("{}.json", stem));
                fs::write(&output_path, serde_json::to_string_pretty(&response)?)?;
                debug!("Wrote output to {}", output_path.display());
            }
            None => responses.push(response),
        }
    }

    if !responses.is_empty() {
        println!("{}", serde_json::to_string_pretty(&responses)?);
    }

    info!("Batch finished in {:?}", start.elapsed());

    println!();
    println!(
        "{} Processed images in {:?}",
        style("✓").green(),
        start.elapsed()
    );
    println!(
        "   {} with fields, {} failed",
        style(extracted).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for (filename, error) in &failed {
            println!("  - {}: {}", filename, error);
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string()
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "child_name",
        "mother_name",
        "father_name",
        "document_type",
        "fields",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = file_name(&result.path);

        if let Some(report) = &result.report {
            let cert = BirthCertificate::from_fields(&report.fields);
            let status = serde_json::to_value(report.status)?;
            wtr.write_record([
                filename.as_str(),
                status.as_str().unwrap_or(""),
                cert.child_name.as_deref().unwrap_or(""),
                cert.mother_name.as_deref().unwrap_or(""),
                cert.father_name.as_deref().unwrap_or(""),
                cert.document_type.as_deref().unwrap_or(""),
                &report.fields.len().to_string(),
                &report.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename.as_str(),
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use khaisinh_core::{labels, BoundingBox, FieldMap, FieldRecord};

    #[test]
    fn test_summary_rows() {
        let mut fields = FieldMap::new();
        fields.insert(
            labels::CHILD_NAME,
            FieldRecord {
                value: "NGUYỄN VĂN AN".to_string(),
                confidence: 0.9,
                bbox: BoundingBox::new(0, 0, 10, 10),
            },
        );
        let results = vec![
            FileResult {
                path: PathBuf::from("scans/a.png"),
                report: Some(ExtractionReport {
                    fields,
                    status: ExtractionStatus::Extracted,
                    regions_detected: 4,
                    processing_time_ms: 15,
                }),
                error: None,
            },
            FileResult {
                path: PathBuf::from("scans/b.png"),
                report: None,
                error: Some("corrupt".to_string()),
            },
        ];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        write_summary(&path, &results).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "a.png,extracted,NGUYỄN VĂN AN,,,,1,15,");
        assert_eq!(lines[2], "b.png,error,,,,,,,corrupt");
    }
}
