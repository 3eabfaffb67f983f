//! Extract command - read fields from a single certificate image.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use khaisinh_core::{create_extractor, load_image};

use super::{is_image_path, load_config, ExtractionResponse};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input image
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Include confidence, bounding boxes and run details
    #[arg(long)]
    metadata: bool,

    /// Only extract these labels (comma separated)
    #[arg(long, value_delimiter = ',')]
    fields: Option<Vec<String>>,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON envelope
    Json,
    /// CSV with one row per field
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    if !is_image_path(&args.input) {
        anyhow::bail!("File must be an image: {}", args.input.display());
    }

    let mut config = load_config(config_path, args.model_dir.as_deref())?;
    if let Some(fields) = &args.fields {
        config.extraction.fields = Some(fields.clone());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );

    pb.set_message("Loading models...");
    let extractor = create_extractor(&config)
        .map_err(|e| anyhow::anyhow!("Failed to load models: {}", e))?;

    pb.set_message("Loading image...");
    let image = load_image(&args.input)?;

    pb.set_message("Extracting fields...");
    let report = extractor.extract_report(&image, extractor.field_filter());
    pb.finish_and_clear();

    debug!(
        "{:?}: {} regions, {} fields",
        report.status,
        report.regions_detected,
        report.fields.len()
    );

    let filename = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();
    let response = ExtractionResponse::from_report(&filename, report, args.metadata);
    let output = format_response(&response, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    info!("Processed {} in {:?}", filename, start.elapsed());

    Ok(())
}

pub fn format_response(response: &ExtractionResponse, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(response)?),
        OutputFormat::Csv => format_csv(response),
        OutputFormat::Text => Ok(format_text(response)),
    }
}

fn format_csv(response: &ExtractionResponse) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["filename", "field", "value", "confidence"])?;

    for (label, value) in &response.data {
        let confidence = response
            .metadata
            .as_ref()
            .and_then(|m| m.fields.get(label))
            .map(|r| format!("{:.3}", r.confidence))
            .unwrap_or_default();
        wtr.write_record([
            response.filename.as_str(),
            label.as_str(),
            value.as_str(),
            confidence.as_str(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(response: &ExtractionResponse) -> String {
    let mut output = format!("File: {}\n", response.filename);

    if response.data.is_empty() {
        output.push_str("No fields extracted\n");
    }

    let width = response.data.keys().map(|k| k.chars().count()).max().unwrap_or(0);
    for (label, value) in &response.data {
        let pad = width - label.chars().count();
        output.push_str(&format!("  {}{}  {}\n", label, " ".repeat(pad), value));
    }

    if let Some(metadata) = &response.metadata {
        output.push_str(&format!(
            "\nStatus: {:?} ({} regions, {}ms)\n",
            metadata.status, metadata.regions_detected, metadata.processing_time_ms
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use khaisinh_core::{labels, BoundingBox, ExtractionReport, ExtractionStatus, FieldMap, FieldRecord};

    fn response(with_metadata: bool) -> ExtractionResponse {
        let mut fields = FieldMap::new();
        fields.insert(
            labels::MOTHER_NAME,
            FieldRecord {
                value: "TRẦN THỊ HOA".to_string(),
                confidence: 0.875,
                bbox: BoundingBox::new(0, 0, 10, 10),
            },
        );
        fields.insert(
            labels::DOCUMENT_TYPE,
            FieldRecord {
                value: "Giấy khai sinh".to_string(),
                confidence: 0.5,
                bbox: BoundingBox::new(0, 20, 10, 30),
            },
        );
        let report = ExtractionReport {
            fields,
            status: ExtractionStatus::Extracted,
            regions_detected: 2,
            processing_time_ms: 40,
        };
        ExtractionResponse::from_report("ks.jpg", report, with_metadata)
    }

    #[test]
    fn test_csv_rows() {
        let csv = format_response(&response(true), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "filename,field,value,confidence");
        assert_eq!(lines[1], "ks.jpg,Họ và tên Mẹ,TRẦN THỊ HOA,0.875");
        assert_eq!(lines[2], "ks.jpg,object,Giấy khai sinh,0.500");
    }

    #[test]
    fn test_csv_without_metadata_has_blank_confidence() {
        let csv = format_response(&response(false), OutputFormat::Csv).unwrap();
        assert!(csv.lines().nth(1).unwrap().ends_with("TRẦN THỊ HOA,"));
    }

    #[test]
    fn test_text_output() {
        let text = format_response(&response(false), OutputFormat::Text).unwrap();
        assert!(text.starts_with("File: ks.jpg\n"));
        assert!(text.contains("Họ và tên Mẹ  TRẦN THỊ HOA"));
        assert!(!text.contains("Status:"));
    }
}
