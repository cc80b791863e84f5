//! gcp-markers CLI — marker feature import and marker-based geo-registration.

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

use gcp_markers_core::{Delimiter, ViewLookup};
use gcp_markers_features::DescriptorType;
use gcp_markers_transform::{MarkerType, Offset, StructureExtraction, TransformCommand};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "gcp-markers")]
#[command(
    about = "Import externally detected ground-control markers and geo-register SfM reconstructions"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a marker match CSV into per-view feature/descriptor files.
    ImportFeatures(ImportArgs),

    /// Build the marker alignment parameter and run the transform tool.
    Transform(TransformArgs),
}

#[derive(Debug, Clone, Args)]
struct ImportArgs {
    /// SfMData file carrying the `views` array (image path → view id).
    #[arg(long)]
    input: PathBuf,

    /// CSV with rows markerX, markerY, imageFileName, markerID, markerSize.
    #[arg(long)]
    matches: PathBuf,

    /// Delimiter used in the match CSV.
    #[arg(long, value_enum, default_value_t = DelimiterArg::Space)]
    delimiter: DelimiterArg,

    /// Descriptor type to create for the imported marker data.
    #[arg(long = "type", value_enum, default_value_t = DescriptorTypeArg::Cctag3)]
    descriptor_type: DescriptorTypeArg,

    /// Output directory for the features and descriptors files (*.feat, *.desc).
    #[arg(long)]
    output: PathBuf,

    /// Verbosity level.
    #[arg(long, value_enum, default_value_t = VerboseLevelArg::Info)]
    verbose_level: VerboseLevelArg,
}

#[derive(Debug, Clone, Args)]
#[command(group(
    ArgGroup::new("id_source")
        .required(true)
        .args(["markers", "extract_cmd"]),
))]
struct TransformArgs {
    /// SfMData file to align.
    #[arg(long)]
    input: PathBuf,

    /// Transform tool executable.
    #[arg(long, default_value = "aliceVision_sfmTransform")]
    tool: String,

    /// Comma-separated marker IDs to use (manual mode).
    #[arg(long)]
    markers: Option<String>,

    /// Structure-extraction command, whitespace-split (auto mode).
    #[arg(long)]
    extract_cmd: Option<String>,

    /// JSON document the extraction command writes.
    #[arg(long, requires = "extract_cmd")]
    structure: Option<PathBuf>,

    /// CSV holding all available marker coordinates
    /// (markerID, easting, northing, elevation).
    #[arg(long)]
    coordinates: PathBuf,

    /// Delimiter used in the coordinate CSV.
    #[arg(long, value_enum, default_value_t = DelimiterArg::Semicolon)]
    delimiter: DelimiterArg,

    /// Offset along X axis added to every easting.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset_x: f64,

    /// Offset along Y axis added to every northing.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset_y: f64,

    /// Offset along Z axis added to every elevation.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset_z: f64,

    /// Marker type to use for the transformation.
    #[arg(long, value_enum, default_value_t = MarkerTypeArg::Cctag3)]
    marker_type: MarkerTypeArg,

    /// Number of decimal places to pass to the transformation algorithm.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(0..=10))]
    precision: u8,

    /// Aligned SfMData output path.
    #[arg(long)]
    output: PathBuf,

    /// Path to the output SfMData file with cameras (views and poses).
    #[arg(long)]
    output_views_poses: PathBuf,

    /// Skip the scale part of the transformation.
    #[arg(long)]
    no_scale: bool,

    /// Skip the rotation part of the transformation.
    #[arg(long)]
    no_rotation: bool,

    /// Skip the translation part of the transformation.
    #[arg(long)]
    no_translation: bool,

    /// Working directory for the spawned tool.
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// Log file receiving the tool's combined stdout/stderr.
    #[arg(long)]
    log_file: PathBuf,

    /// Verbosity level.
    #[arg(long, value_enum, default_value_t = VerboseLevelArg::Info)]
    verbose_level: VerboseLevelArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DelimiterArg {
    Space,
    Tab,
    Comma,
    Colon,
    Semicolon,
}

impl From<DelimiterArg> for Delimiter {
    fn from(arg: DelimiterArg) -> Self {
        match arg {
            DelimiterArg::Space => Delimiter::Space,
            DelimiterArg::Tab => Delimiter::Tab,
            DelimiterArg::Comma => Delimiter::Comma,
            DelimiterArg::Colon => Delimiter::Colon,
            DelimiterArg::Semicolon => Delimiter::Semicolon,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DescriptorTypeArg {
    Cctag3,
    Cctag4,
}

impl From<DescriptorTypeArg> for DescriptorType {
    fn from(arg: DescriptorTypeArg) -> Self {
        match arg {
            DescriptorTypeArg::Cctag3 => DescriptorType::Cctag3,
            DescriptorTypeArg::Cctag4 => DescriptorType::Cctag4,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MarkerTypeArg {
    Cctag3,
    Cctag4,
    Tag16h5,
}

impl From<MarkerTypeArg> for MarkerType {
    fn from(arg: MarkerTypeArg) -> Self {
        match arg {
            MarkerTypeArg::Cctag3 => MarkerType::Cctag3,
            MarkerTypeArg::Cctag4 => MarkerType::Cctag4,
            MarkerTypeArg::Tag16h5 => MarkerType::Tag16h5,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VerboseLevelArg {
    Fatal,
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

impl VerboseLevelArg {
    fn filter(self) -> LevelFilter {
        match self {
            VerboseLevelArg::Fatal | VerboseLevelArg::Error => LevelFilter::Error,
            VerboseLevelArg::Warning => LevelFilter::Warn,
            VerboseLevelArg::Info => LevelFilter::Info,
            VerboseLevelArg::Debug => LevelFilter::Debug,
            VerboseLevelArg::Trace => LevelFilter::Trace,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            VerboseLevelArg::Fatal => "fatal",
            VerboseLevelArg::Error => "error",
            VerboseLevelArg::Warning => "warning",
            VerboseLevelArg::Info => "info",
            VerboseLevelArg::Debug => "debug",
            VerboseLevelArg::Trace => "trace",
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::ImportFeatures(args) => run_import(args),
        Commands::Transform(args) => run_transform(args),
    };
    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run_import(args: ImportArgs) -> CliResult<()> {
    gcp_markers_core::init_with_level(args.verbose_level.filter())?;
    log::info!("Importing marker data");

    if !args.matches.is_file() {
        return Err(format!(
            "marker features list file not found: {}",
            args.matches.display()
        )
        .into());
    }

    let lookup = ViewLookup::load(&args.input)?;
    let groups = gcp_markers_features::load_detections(&args.matches, args.delimiter.into())?;
    std::fs::create_dir_all(&args.output)?;
    gcp_markers_features::write_descriptors(
        &args.output,
        &groups,
        &lookup,
        args.descriptor_type.into(),
    )?;

    log::info!("Task done");
    Ok(())
}

fn run_transform(args: TransformArgs) -> CliResult<()> {
    gcp_markers_core::init_with_level(args.verbose_level.filter())?;

    log::info!("Loading marker coordinates");
    let offset = Offset {
        x: args.offset_x,
        y: args.offset_y,
        z: args.offset_z,
    };
    let table =
        gcp_markers_transform::load_coordinates(&args.coordinates, args.delimiter.into(), offset)?;

    let ids = match (&args.markers, &args.extract_cmd) {
        (Some(list), _) => gcp_markers_transform::parse_manual_ids(list),
        (None, Some(command_line)) => {
            let structure = args
                .structure
                .as_ref()
                .ok_or("auto mode requires --structure")?;
            let command: Vec<String> = command_line
                .split_whitespace()
                .map(str::to_string)
                .collect();
            gcp_markers_transform::extract_marker_ids(
                &StructureExtraction {
                    command: &command,
                    workdir: &args.workdir,
                    log_path: &args.log_file,
                    structure_path: structure,
                },
                None,
            )?
        }
        (None, None) => return Err("one of --markers or --extract-cmd is required".into()),
    };

    let resolved = gcp_markers_transform::resolve_markers(&ids, &table)?;
    let markers_param =
        gcp_markers_transform::build_markers_param(&resolved, args.precision as usize);

    let limits = gcp_markers_transform::detect_resource_limits();
    let command = TransformCommand {
        tool: args.tool,
        input: args.input,
        output: args.output,
        views_poses_output: args.output_views_poses,
        marker_type: args.marker_type.into(),
        apply_scale: !args.no_scale,
        apply_rotation: !args.no_rotation,
        apply_translation: !args.no_translation,
        verbose_level: args.verbose_level.as_str().to_string(),
    };
    let argv = command.to_argv(&markers_param, &limits);
    gcp_markers_transform::run_logged(&argv, &args.workdir, &args.log_file, None)?;

    log::info!("Task done");
    Ok(())
}
