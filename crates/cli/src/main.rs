//! tidewatch CLI - map sensor water levels to inundation depth

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tidewatch_algorithms::inundation::RasterTerrain;
use tidewatch_algorithms::mapping::MappingConfig;
use tidewatch_algorithms::measurement::{latest_per_sensor, Measurement, TimeWindow};
use tidewatch_algorithms::pipeline::map_inundation;
use tidewatch_core::io::{read_geotiff, write_geotiff};
use tidewatch_core::{AxisSpec, GridSpec, Raster};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tidewatch")]
#[command(author, version, about = "Inundation mapping from water-level sensors", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a terrain raster
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Map the latest sensor readings to inundation depth
    Map {
        /// Measurements as a JSON array of {lon, lat, value, timestamp}
        #[arg(short, long)]
        measurements: PathBuf,
        /// Terrain elevation GeoTIFF covering the fine grid
        #[arg(short, long)]
        terrain: PathBuf,
        /// Output records (JSON)
        #[arg(short, long)]
        output: PathBuf,
        /// Run configuration (JSON); built-in defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Also write the fine depth field as a GeoTIFF
        #[arg(long)]
        depth_raster: Option<PathBuf>,
        /// End of the time window (RFC 3339); defaults to the newest reading
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        /// Length of the time window in hours
        #[arg(long, default_value = "1")]
        hours: u32,
        /// Override the decorrelation length scale (degrees, both axes)
        #[arg(long)]
        scale: Option<f64>,
        /// Override the nugget variance
        #[arg(long)]
        nugget: Option<f64>,
        /// Override the error-variance masking threshold
        #[arg(long)]
        error_threshold: Option<f64>,
        /// Override the depth mapped to full intensity
        #[arg(long)]
        max_display_depth: Option<f64>,
        /// Skip error variance and confidence masking
        #[arg(long)]
        no_error: bool,
    },
    /// Print the effective run configuration as JSON
    Config {
        /// Run configuration (JSON); built-in defaults when omitted
        config: Option<PathBuf>,
    },
}

// ─── Run configuration ──────────────────────────────────────────────────

/// Grids and mapping parameters for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RunConfig {
    coarse: GridSpec,
    fine: GridSpec,
    mapping: MappingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        // Chatham County, Georgia
        Self {
            coarse: GridSpec::new(
                AxisSpec::new(-81.3, -80.8, 0.01),
                AxisSpec::new(31.85, 32.25, 0.01),
            ),
            fine: GridSpec::new(
                AxisSpec::new(-81.3, -80.8, 0.002),
                AxisSpec::new(31.85, 32.25, 0.002),
            ),
            mapping: MappingConfig::default(),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file)).context("Failed to parse config")
        }
        None => Ok(RunConfig::default()),
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_measurements(path: &Path) -> Result<Vec<Measurement>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open measurements {}", path.display()))?;
    let measurements: Vec<Measurement> =
        serde_json::from_reader(BufReader::new(file)).context("Failed to parse measurements")?;
    info!("Measurements: {}", measurements.len());
    Ok(measurements)
}

fn read_terrain(path: &Path) -> Result<RasterTerrain> {
    let pb = spinner("Reading terrain...");
    let terrain = RasterTerrain::open(path).context("Failed to read terrain")?;
    pb.finish_and_clear();
    let (rows, cols) = terrain.raster().shape();
    info!("Terrain: {} x {}", cols, rows);
    Ok(terrain)
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), value).context("Failed to write JSON")
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let raster: Raster<f64> = read_geotiff(&input).context("Failed to read raster")?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();
            let gt = raster.transform();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Pixel size: {} x {}", gt.pixel_width, gt.pixel_height);
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            println!(
                "Row order: {}",
                if gt.is_north_up() { "north to south" } else { "south to north" }
            );
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let (Some(min), Some(max), Some(mean)) = (stats.min, stats.max, stats.mean) {
                println!("  Min: {:.4}", min);
                println!("  Max: {:.4}", max);
                println!("  Mean: {:.4}", mean);
            }
            println!("  Valid cells: {}", stats.valid_count);
            println!("  NoData cells: {}", stats.nodata_count);
        }

        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }

        Commands::Map {
            measurements,
            terrain,
            output,
            config,
            depth_raster,
            end,
            hours,
            scale,
            nugget,
            error_threshold,
            max_display_depth,
            no_error,
        } => {
            let mut run = load_config(config.as_deref())?;
            if let Some(scale) = scale {
                run.mapping.kernel.lon_scale = scale;
                run.mapping.kernel.lat_scale = scale;
            }
            if let Some(nugget) = nugget {
                run.mapping.kernel.nugget = nugget;
            }
            if let Some(threshold) = error_threshold {
                run.mapping.error_threshold = threshold;
            }
            if let Some(depth) = max_display_depth {
                run.mapping.max_display_depth = depth;
            }
            if no_error {
                run.mapping.compute_error = false;
            }

            let readings = read_measurements(&measurements)?;
            let end = match end.or_else(|| readings.iter().map(|m| m.timestamp).max()) {
                Some(end) => end,
                None => anyhow::bail!("No measurements in {}", measurements.display()),
            };
            let window = TimeWindow::last_hours(end, hours);
            let sensors = latest_per_sensor(&readings, &window)?;
            info!("Sensors in window {} .. {}: {}", window.start, window.end, sensors.len());

            let dem = read_terrain(&terrain)?;

            let start = Instant::now();
            let pb = spinner("Mapping inundation...");
            let result = map_inundation(&sensors, &run.coarse, &run.fine, &run.mapping, &dem);
            pb.finish_and_clear();

            let map = match result {
                Ok(map) => map,
                Err(e) if e.is_recoverable() => {
                    warn!("{}; try a wider time window (--hours)", e);
                    return Err(e.into());
                }
                Err(e) => return Err(e).context("Inundation mapping failed"),
            };
            let elapsed = start.elapsed();

            let trend = map.diagnostics.trend.coefficients();
            info!(
                "Trend: {:.4} + {:.4}·lon + {:.4}·lat",
                trend[0], trend[1], trend[2]
            );
            info!("Flooded nodes: {}", map.records.len());

            write_json(&map.records, &output)?;
            done("Inundation records", &output, elapsed);

            if let Some(path) = depth_raster {
                let d = &map.diagnostics;
                let raster = d
                    .fine_grid
                    .to_raster(&d.depth)
                    .context("Failed to build depth raster")?;
                let pb = spinner("Writing depth raster...");
                write_geotiff(&raster, &path).context("Failed to write depth raster")?;
                pb.finish_and_clear();
                done("Depth raster", &path, elapsed);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_partial_config_keeps_default_grids() {
        let run: RunConfig =
            serde_json::from_str(r#"{ "mapping": { "error_threshold": 0.3 } }"#).unwrap();
        assert_eq!(run.mapping.error_threshold, 0.3);
        assert_eq!(run.coarse, RunConfig::default().coarse);
        assert!(run.coarse.build().is_ok());
        assert!(run.fine.build().is_ok());
    }

    #[test]
    fn test_map_arguments_parse() {
        let cli = Cli::try_parse_from([
            "tidewatch",
            "map",
            "-m",
            "readings.json",
            "-t",
            "dem.tif",
            "-o",
            "records.json",
            "--end",
            "2024-09-27T12:00:00Z",
            "--hours",
            "3",
            "--no-error",
        ])
        .unwrap();
        match cli.command {
            Commands::Map { hours, no_error, end, .. } => {
                assert_eq!(hours, 3);
                assert!(no_error);
                assert!(end.is_some());
            }
            _ => panic!("expected map"),
        }
    }
}
