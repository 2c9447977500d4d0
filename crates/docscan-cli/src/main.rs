// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan — Command-line front end for the document scanner.
//
// Reads a photo from disk, runs one pipeline operation, and writes the
// rectified page (or prints the detection as JSON). Failures are reported
// in plain English on stderr with a non-zero exit status.

mod args;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use docscan_core::error::Result;
use docscan_core::human_errors::humanize_error;
use docscan_core::{Point2D, ScanConfig};
use docscan_document::{DocumentScanner, ScanResult};
use tracing::{debug, info};

use crate::args::{OutputKind, parse_corner};

#[derive(Parser)]
#[command(name = "docscan")]
#[command(about = "Find a page in a photo and flatten it into a scan")]
struct Cli {
    /// JSON file with scanner parameters; missing fields keep their defaults
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the detected page corners, preview scale and preview JPEG as JSON
    Detect {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
    /// Detect the page and rectify it, using the whole photo if none is found
    Scan {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Rectify and enhance the page at the given corners
    Process {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        #[command(flatten)]
        corners: CornerArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Rectify the page at the given corners without enhancement
    Crop {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        #[command(flatten)]
        corners: CornerArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct CornerArgs {
    /// Four page corners in pixels, in any order
    #[arg(
        long,
        required = true,
        num_args = 4,
        value_name = "X,Y",
        value_parser = parse_corner,
        allow_hyphen_values = true
    )]
    corners: Vec<Point2D>,
}

#[derive(Args)]
struct OutputArgs {
    /// Where to write the page; JPEG for .jpg/.jpeg, PNG otherwise
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Quality for JPEG output
    #[arg(long, default_value_t = 95, value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(error = %err, "Command failed");
            let human = humanize_error(&err);
            eprintln!("error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ScanConfig::from_json(&fs::read_to_string(path)?)?,
        None => ScanConfig::default(),
    };
    let scanner = DocumentScanner::new(config)?;

    match cli.command {
        Command::Detect { image } => {
            let preview = scanner.detect_document_bytes(&fs::read(&image)?)?;
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        Command::Scan { image, output } => {
            let result = scanner.scan_document_bytes(&fs::read(&image)?)?;
            write_result(result, &output)?;
        }
        Command::Process {
            image,
            corners,
            output,
        } => {
            let result =
                scanner.process_with_corners_bytes(&fs::read(&image)?, &corners.corners)?;
            write_result(result, &output)?;
        }
        Command::Crop {
            image,
            corners,
            output,
        } => {
            let result = scanner.crop_document_bytes(&fs::read(&image)?, &corners.corners)?;
            write_result(result, &output)?;
        }
    }
    Ok(())
}

fn write_result(result: ScanResult, output: &OutputArgs) -> Result<()> {
    let size = result.size();
    let source = result.source;
    let raster = result.into_raster();
    let bytes = match OutputKind::for_path(&output.output) {
        OutputKind::Jpeg => raster.to_jpeg_bytes(output.jpeg_quality)?,
        OutputKind::Png => raster.to_png_bytes()?,
    };
    write_file(&output.output, &bytes)?;
    info!(
        path = %output.output.display(),
        width = size.width,
        height = size.height,
        ?source,
        "Page written"
    );
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}
