//! charuco-calib CLI: board inspection and session report summaries.

use charuco_calib::core::{init_from_env, ArucoDictionary, BoardSpec};
use charuco_calib::io::SessionReport;
use charuco_calib::pipeline::DetectionStatus;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use serde_json::json;
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "charuco-calib")]
#[command(about = "Multi-image ChArUco camera calibration utilities")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a board and print its derived geometry as JSON.
    BoardInfo(BoardArgs),

    /// Print a per-image summary of a stored session report.
    Summary {
        /// Path to a session report (JSON).
        report: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct BoardArgs {
    /// Marker dictionary, e.g. DICT_4X4_1000 or 5x5_250.
    #[arg(long, default_value = "DICT_4X4_1000")]
    dictionary: ArucoDictionary,

    /// Number of squares along x.
    #[arg(long, default_value_t = 30)]
    columns: u32,

    /// Number of squares along y.
    #[arg(long, default_value_t = 21)]
    rows: u32,

    /// Marker side length.
    #[arg(long, default_value_t = 0.019)]
    marker_size: f32,

    /// Square side length, in the same unit as the marker size.
    #[arg(long, default_value_t = 0.025)]
    square_size: f32,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> CliResult<()> {
    init_from_env(LevelFilter::Warn)?;

    let cli = Cli::parse();
    match cli.command {
        Commands::BoardInfo(args) => run_board_info(&args),
        Commands::Summary { report } => run_summary(&report),
    }
}

// ── board-info ────────────────────────────────────────────────────────

fn run_board_info(args: &BoardArgs) -> CliResult<()> {
    let board = BoardSpec::new(
        args.dictionary,
        args.columns,
        args.rows,
        args.marker_size,
        args.square_size,
    )?;

    let info = json!({
        "dictionary": board.dictionary,
        "columns": board.columns,
        "rows": board.rows,
        "marker_size": board.marker_size,
        "square_size": board.square_size,
        "squares": board.square_count(),
        "markers": board.marker_count(),
        "dictionary_capacity": board.dictionary.capacity(),
        "inner_corners": board.inner_corner_count(),
        "width": board.columns as f32 * board.square_size,
        "height": board.rows as f32 * board.square_size,
    });
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

// ── summary ───────────────────────────────────────────────────────────

fn run_summary(path: &Path) -> CliResult<()> {
    let report = SessionReport::load_json(path)?;
    let board = &report.board;

    println!(
        "board: {}x{} {} (square {}, marker {})",
        board.columns, board.rows, board.dictionary, board.square_size, board.marker_size
    );

    match &report.detection {
        Some(det) => {
            println!(
                "images: {} ({} usable, {} not detected, {} unreadable)",
                det.outcomes.len(),
                det.usable_count(),
                det.not_detected_count(),
                det.load_failed_count()
            );
            for outcome in &det.outcomes {
                println!(
                    "  [{}] {}: {}",
                    outcome.index,
                    outcome.path.display(),
                    describe(&outcome.status)
                );
            }
            if det.cancelled {
                println!("  (detection was cancelled)");
            }
        }
        None => println!("images: detection not run"),
    }

    if let Some(agg) = &report.aggregation {
        println!(
            "aggregation: {} included, {} excluded",
            agg.included, agg.excluded
        );
    }

    match &report.calibration {
        Some(calib) => {
            let (cx, cy) = calib.principal_point();
            println!(
                "calibration: fx={:.2} fy={:.2} cx={:.2} cy={:.2} rms={:.4}px over {} views",
                calib.fx(),
                calib.fy(),
                cx,
                cy,
                calib.reprojection_error,
                calib.poses.len()
            );
        }
        None => println!("calibration: none"),
    }
    if let Some(err) = &report.error {
        println!("error: {err}");
    }
    Ok(())
}

fn describe(status: &DetectionStatus) -> String {
    match status {
        DetectionStatus::Detected { corners, markers } => {
            format!("detected ({corners} corners, {markers} markers)")
        }
        DetectionStatus::NotDetected { reason: None } => "not detected".to_string(),
        DetectionStatus::NotDetected {
            reason: Some(reason),
        } => format!("not detected ({reason})"),
        DetectionStatus::LoadFailed { error } => format!("load failed: {error}"),
        DetectionStatus::Cancelled => "cancelled".to_string(),
    }
}
