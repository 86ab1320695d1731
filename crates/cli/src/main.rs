//! Verdant CLI - NDVI vegetation change analysis

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use verdant_algorithms::pipeline::{analyze, load_inputs, write_outputs, ChangeConfig, PipelinePaths};
use verdant_core::io::read_geotiff;
use verdant_core::Raster;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "verdant")]
#[command(author, version, about = "NDVI vegetation change analysis", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Compare two NDVI rasters and write change products
    Change(ChangeArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct ChangeArgs {
    /// Project directory holding data/inputs and data/outputs
    #[arg(short, long, default_value = ".")]
    base_dir: PathBuf,
    /// Reference (earlier) NDVI raster [default: <base>/data/inputs/July_2024_...]
    #[arg(long)]
    reference: Option<PathBuf>,
    /// Comparison (later) NDVI raster [default: <base>/data/inputs/July_2025_...]
    #[arg(long)]
    comparison: Option<PathBuf>,
    /// Output directory [default: <base>/data/outputs]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// JSON configuration file (thresholds, area, restoration)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Share of the lost area to replant (0-1)
    #[arg(long)]
    recovery_fraction: Option<f64>,
    /// Canopy area of one tree in m²
    #[arg(long)]
    crown_m2_per_tree: Option<f64>,
    /// Latitude (degrees) used for the pixel area approximation
    #[arg(long)]
    reference_latitude: Option<f64>,
}

impl ChangeArgs {
    fn paths(&self) -> PipelinePaths {
        let mut paths = PipelinePaths::from_base_dir(&self.base_dir);
        if let Some(reference) = &self.reference {
            paths.reference = reference.clone();
        }
        if let Some(comparison) = &self.comparison {
            paths.comparison = comparison.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            paths.output_dir = output_dir.clone();
        }
        paths
    }

    /// Config file (or defaults) with command-line overrides applied
    fn config(&self) -> Result<ChangeConfig> {
        let mut config = match &self.config {
            Some(path) => ChangeConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ChangeConfig::default(),
        };
        if let Some(v) = self.recovery_fraction {
            config.restoration.recovery_fraction = v;
        }
        if let Some(v) = self.crown_m2_per_tree {
            config.restoration.crown_m2_per_tree = v;
        }
        if let Some(v) = self.reference_latitude {
            config.area.reference_latitude = v;
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn saved(name: &str, path: &Path) {
    println!("{} saved to: {}", name, path.display());
}

// ─── Commands ───────────────────────────────────────────────────────────

fn info_command(input: &Path) -> Result<()> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f32> = read_geotiff(input).context("Failed to read raster")?;
    pb.finish_and_clear();

    let (rows, cols) = raster.shape();
    let bounds = raster.bounds();
    let stats = raster.statistics();
    let (pw, ph) = raster.transform().pixel_size();

    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
    println!("Pixel size: {} x {}", pw, ph);
    println!(
        "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        bounds.0, bounds.1, bounds.2, bounds.3
    );
    match raster.crs() {
        Some(crs) => println!("CRS: {}", crs),
        None => println!("CRS: unknown"),
    }
    if let Some(nodata) = raster.nodata() {
        println!("NoData: {}", nodata);
    }
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    if !raster.is_empty() {
        println!(
            "  Valid cells: {} ({:.1}%)",
            stats.valid_count,
            100.0 * stats.valid_count as f64 / raster.len() as f64
        );
    }
    Ok(())
}

fn change_command(args: &ChangeArgs) -> Result<()> {
    let config = args.config()?;
    let paths = args.paths();
    let start = Instant::now();

    let pb = spinner("Reading rasters...");
    let (reference, comparison) = load_inputs(&paths).context("Failed to read input rasters")?;
    pb.finish_and_clear();
    info!(
        "Reference: {} x {}, comparison: {} x {}",
        reference.cols(),
        reference.rows(),
        comparison.cols(),
        comparison.rows()
    );

    let pb = spinner("Analyzing change...");
    let analysis = analyze(&reference, &comparison, &config).context("Change analysis failed")?;
    pb.finish_and_clear();

    let pb = spinner("Writing outputs...");
    let outputs = write_outputs(&analysis, &paths.output_dir)
        .with_context(|| format!("Failed to write outputs to {}", paths.output_dir.display()))?;
    pb.finish_and_clear();

    saved("Delta NDVI raster", &outputs.delta);
    for (name, path) in [("Decrease polygons", &outputs.decrease), ("Increase polygons", &outputs.increase)] {
        match path {
            Some(path) => saved(name, path),
            None => println!("{}: none found", name),
        }
    }
    println!(
        "Loss area ≈ {:.2} km², Gain area ≈ {:.2} km²",
        outputs.summary.loss_km2, outputs.summary.gain_km2
    );
    println!("Trees needed: {}", outputs.summary.trees_needed);
    saved("Summary", &outputs.summary_path);
    println!("  Processing time: {:.2?}", start.elapsed());
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match &cli.command {
        Commands::Info { input } => info_command(input),
        Commands::Change(args) => change_command(args),
    }
}
