//! rslabel: tiling and dataset export for annotated remote-sensing rasters.
//!
//! Annotations live in LabelMe-style JSON label files, one per raster, with
//! points in map coordinates. rslabel cuts rasters and their labels into
//! fixed-size tiles and exports label files as COCO JSON or Pascal VOC
//! datasets.
//!
//! # Modules
//!
//! - [`geo`]: Coordinates, geotransforms, tile grids and shape clipping
//! - [`label`]: The label file model and its JSON codec
//! - [`tiling`]: Splitting label files and rasters into tiles
//! - [`export`]: COCO and VOC exporters and the export pipeline
//! - [`raster`]: The raster backend trait and its `image`-based default
//! - [`config`]: Export configuration
//! - [`report`]: Per-run counts and issues
//! - [`error`]: Error types for rslabel operations

pub mod config;
pub mod error;
pub mod export;
pub mod geo;
pub mod label;
pub mod raster;
pub mod report;
pub mod tiling;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub use config::{ExportConfig, ExportFormat};
pub use error::RsLabelError;
pub use raster::{ImageRasterBackend, RasterBackend};
pub use report::RunReport;

/// The rslabel CLI application.
#[derive(Parser)]
#[command(name = "rslabel")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Split label files and their rasters into tiles.
    Split(SplitArgs),
    /// Export label files as a COCO or VOC dataset.
    Export(ExportArgs),
    /// Write a labels.txt listing every label used under a directory.
    Labels(LabelsArgs),
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args)]
struct SplitArgs {
    /// Directory searched recursively for label files.
    input: PathBuf,

    /// Output directory; tiles are written under `<output>/tiles`.
    #[arg(short, long)]
    output: PathBuf,

    /// Tile edge length in pixels.
    #[arg(long, default_value_t = config::DEFAULT_TILE_SIZE)]
    tile_size: u32,

    /// Report format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Directory searched recursively for label files.
    input: Option<PathBuf>,

    /// Output directory for the dataset.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Dataset format.
    #[arg(long, value_enum)]
    format: Option<ExportFormat>,

    /// Split into tiles before exporting.
    #[arg(long)]
    tiled: bool,

    /// Tile edge length in pixels.
    #[arg(long)]
    tile_size: Option<u32>,

    /// Clear a non-empty output directory.
    #[arg(long)]
    overwrite: bool,

    /// Path of labels.txt (default: <output>/labels.txt).
    #[arg(long)]
    class_list: Option<PathBuf>,

    /// YAML config file; flags given on the command line take precedence.
    #[arg(long, env = "RSLABEL_CONFIG")]
    config: Option<PathBuf>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

#[derive(clap::Args)]
struct LabelsArgs {
    /// Directory searched recursively for label files.
    input: PathBuf,

    /// Where to write labels.txt.
    #[arg(short, long)]
    output: PathBuf,
}

/// Run the rslabel CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), RsLabelError> {
    let cli = Cli::parse();
    let backend = ImageRasterBackend::new();

    match cli.command {
        Some(Commands::Split(args)) => run_split(args, &backend),
        Some(Commands::Export(args)) => run_export(args, &backend),
        Some(Commands::Labels(args)) => run_labels(args),
        None => {
            println!("rslabel {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Tiling and dataset export for annotated remote-sensing rasters.");
            println!();
            println!("Run 'rslabel --help' for usage information.");
            Ok(())
        }
    }
}

fn run_split(args: SplitArgs, backend: &dyn RasterBackend) -> Result<(), RsLabelError> {
    let mut config = ExportConfig::new(args.input, args.output);
    config.tile_size = args.tile_size;

    let report = tiling::split_dataset(&config, backend)?;
    print_report("Split", &report, args.report)
}

fn run_export(args: ExportArgs, backend: &dyn RasterBackend) -> Result<(), RsLabelError> {
    let config = export_config_from_args(&args)?;
    let report = export::run_export(&config, backend)?;
    print_report("Export", &report, args.report)
}

fn export_config_from_args(args: &ExportArgs) -> Result<ExportConfig, RsLabelError> {
    let mut config = match &args.config {
        Some(path) => ExportConfig::from_yaml_file(path)?,
        None => ExportConfig::default(),
    };

    if let Some(input) = &args.input {
        config.input_dir = input.clone();
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if args.tiled {
        config.tiled = true;
    }
    if let Some(tile_size) = args.tile_size {
        config.tile_size = tile_size;
    }
    if args.overwrite {
        config.overwrite = true;
    }
    if let Some(class_list) = &args.class_list {
        config.class_list = Some(class_list.clone());
    }

    config.validate()?;
    Ok(config)
}

fn run_labels(args: LabelsArgs) -> Result<(), RsLabelError> {
    let config = ExportConfig::new(&args.input, PathBuf::new());
    let labels = export::collect_labels(&args.input, &config)?;
    export::write_labels_txt(&args.output, &labels)?;
    println!(
        "Wrote {} labels to {}",
        labels.len(),
        args.output.display()
    );
    Ok(())
}

fn print_report(
    title: &str,
    report: &RunReport,
    format: ReportFormat,
) -> Result<(), RsLabelError> {
    match format {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(report)
                .map_err(|e| RsLabelError::Io(std::io::Error::other(e)))?;
            println!("{json}");
        }
        ReportFormat::Text => {
            println!("{title} finished ({}):", report.action);
            print!("{report}");
        }
    }
    Ok(())
}
