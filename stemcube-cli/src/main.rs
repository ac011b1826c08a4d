//! Command-line tool for inspecting and reducing 4D-STEM scans.
#![allow(clippy::uninlined_format_args, clippy::cast_precision_loss)]

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use stemcube_core::{BinningFactor, DataCube, MetadataSchema, OriginalMetadata, ReductionPlan};
use stemcube_io::{read_metadata_tree, read_reduction_plan, read_schema, RawCubeReader, RawDtype};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    StemcubeIo(#[from] stemcube_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] stemcube_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Output error: {0}")]
    Output(#[from] io::Error),
}

/// Sample type of the raw input file.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Dtype {
    U8,
    U16,
    U32,
    F32,
    F64,
}

impl From<Dtype> for RawDtype {
    fn from(dtype: Dtype) -> Self {
        match dtype {
            Dtype::U8 => RawDtype::U8,
            Dtype::U16 => RawDtype::U16,
            Dtype::U32 => RawDtype::U32,
            Dtype::F32 => RawDtype::F32,
            Dtype::F64 => RawDtype::F64,
        }
    }
}

/// Inspect, resolve metadata for, and bin 4D-STEM scans.
#[derive(Parser)]
#[command(name = "stemcube")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Raw input description shared by data subcommands.
#[derive(Args)]
struct RawInput {
    /// Headerless little-endian raw file in [R_y, R_x, Q_y, Q_x] order
    input: PathBuf,

    /// Sample type of the raw file
    #[arg(short, long, value_enum, default_value = "f32")]
    dtype: Dtype,

    /// Real-space extents as RYxRX
    #[arg(long, value_parser = parse_extents)]
    scan: (usize, usize),

    /// Diffraction-space extents as QYxQX
    #[arg(long, value_parser = parse_extents)]
    diffraction: (usize, usize),
}

/// Original metadata documents.
#[derive(Args)]
struct MetadataInput {
    /// Full metadata tree (JSON)
    #[arg(long)]
    full: Option<PathBuf>,

    /// Curated shortlist tree (JSON); wins over --full
    #[arg(long)]
    shortlist: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show extents and total intensity of a raw scan
    Info {
        #[command(flatten)]
        raw: RawInput,
    },

    /// Resolve metadata trees into the normalized record and print it as JSON
    Metadata {
        #[command(flatten)]
        metadata: MetadataInput,

        /// Field table (JSON); built-in table when omitted
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// Crop and bin a raw scan in memory and report the result
    Bin {
        #[command(flatten)]
        raw: RawInput,

        #[command(flatten)]
        metadata: MetadataInput,

        /// Diffraction-space binning factor
        #[arg(long, allow_negative_numbers = true)]
        bin_q: Option<f64>,

        /// Real-space binning factor
        #[arg(long, allow_negative_numbers = true)]
        bin_r: Option<f64>,

        /// Reduction plan (JSON); --bin-q/--bin-r override its factors
        #[arg(long)]
        plan: Option<PathBuf>,
    },
}

fn parse_extents(s: &str) -> std::result::Result<(usize, usize), String> {
    let (y, x) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected RYxRX, got '{s}'"))?;
    let y = y.trim().parse::<usize>().map_err(|e| format!("bad extent '{y}': {e}"))?;
    let x = x.trim().parse::<usize>().map_err(|e| format!("bad extent '{x}': {e}"))?;
    Ok((y, x))
}

fn load_original(metadata: &MetadataInput) -> Result<OriginalMetadata> {
    let read = |path: &Option<PathBuf>| path.as_deref().map(read_metadata_tree).transpose();
    Ok(OriginalMetadata::new(read(&metadata.full)?, read(&metadata.shortlist)?))
}

fn open_cube(raw: &RawInput, original: OriginalMetadata) -> Result<DataCube<f64>> {
    let reader = RawCubeReader::open(&raw.input, raw.dtype.into())?;
    Ok(reader.read_cube(raw.scan, raw.diffraction, original)?)
}

fn write_summary(out: &mut impl Write, label: &str, cube: &DataCube<f64>) -> io::Result<()> {
    let (ry, rx) = cube.scan_shape();
    let (qy, qx) = cube.diffraction_shape();
    writeln!(out, "{label}:")?;
    writeln!(out, "  Scan shape (R_y x R_x): {} x {}", ry, rx)?;
    writeln!(out, "  Diffraction shape (Q_y x Q_x): {} x {}", qy, qx)?;
    writeln!(out, "  Scan positions: {}", cube.total_scan_positions())?;
    writeln!(out, "  Total intensity: {:.6e}", cube.total_intensity())
}

fn describe(path: &Path, dtype: Dtype) -> String {
    format!("{} ({:?})", path.display(), dtype)
}

fn run(command: Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Info { raw } => {
            let cube = open_cube(&raw, OriginalMetadata::default())?;
            writeln!(out, "File: {}", describe(&raw.input, raw.dtype))?;
            write_summary(out, "Dataset", &cube)?;
        }

        Commands::Metadata { metadata, schema } => {
            let schema = match schema {
                Some(path) => read_schema(path)?,
                None => MetadataSchema::default(),
            };
            let original = load_original(&metadata)?;
            let record = stemcube_core::MetadataRecord::resolve(original, &schema)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&record)?)?;
        }

        Commands::Bin {
            raw,
            metadata,
            bin_q,
            bin_r,
            plan,
        } => {
            let mut plan = match plan {
                Some(path) => read_reduction_plan(path)?,
                None => ReductionPlan::new(),
            };
            if let Some(factor) = bin_q {
                plan.bin_q = BinningFactor::try_from(factor)?;
            }
            if let Some(factor) = bin_r {
                plan.bin_r = BinningFactor::try_from(factor)?;
            }

            let original = load_original(&metadata)?;
            let mut cube = open_cube(&raw, original)?;
            writeln!(out, "File: {}", describe(&raw.input, raw.dtype))?;
            write_summary(out, "Before", &cube)?;

            if plan.is_noop() {
                log::info!("reduction plan is a no-op");
            }
            cube.crop_and_bin(&plan)?;
            write_summary(out, "After", &cube)?;
            writeln!(out, "Binning: bin_q = {}, bin_r = {}", plan.bin_q, plan.bin_r)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    run(cli.command, &mut io::stdout().lock())
}
