//! Synheart Stress Features CLI
//!
//! Extracts windowed ACC/BVP/TEMP features from wearable recordings.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use synheart_stress_features::{
    audit::create_shared_log_with_persistence,
    config::Config,
    core::{
        export::{read_csv_header, write_report},
        schema::{output_columns, validate_columns, FEATURE_SCHEMA_VERSION, MODEL_INPUT_COLUMNS},
        ExportFormat, FeaturePipeline, PipelineError, ReportBuilder,
    },
    recording::{load_csv, Signal},
    VERSION,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "synheart-stress")]
#[command(author = "Synheart")]
#[command(version = VERSION)]
#[command(about = "Windowed stress features from wearable recordings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the merged feature table from a recording
    Extract {
        /// Recording CSV with ACC_x, ACC_y, ACC_z, BVP and TEMP columns
        input: PathBuf,

        /// Output file (defaults to the export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output format (csv, json or jsonl)
        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// BVP window shift in seconds (larger is faster)
        #[arg(long)]
        bvp_shift: Option<f64>,

        /// Run the three signal passes on separate threads
        #[arg(long)]
        parallel: bool,
    },

    /// Show per-signal sample and window counts of a recording
    Inspect {
        /// Recording CSV
        input: PathBuf,
    },

    /// Check a feature CSV against the classifier schema
    Check {
        /// Feature table CSV
        features: PathBuf,
    },

    /// Print the feature schema
    Schema,

    /// Show cumulative extraction statistics
    Status {
        /// Clear the statistics after showing them
        #[arg(long)]
        reset: bool,
    },

    /// Show configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            input,
            output,
            format,
            bvp_shift,
            parallel,
        } => cmd_extract(&input, output, format, bvp_shift, parallel),
        Commands::Inspect { input } => cmd_inspect(&input),
        Commands::Check { features } => cmd_check(&features),
        Commands::Schema => {
            cmd_schema();
            Ok(())
        }
        Commands::Status { reset } => cmd_status(reset),
        Commands::Config => cmd_config(),
    }
}

/// Log to stderr so stdout stays usable for results.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn cmd_extract(
    input: &Path,
    output: Option<PathBuf>,
    format: ExportFormat,
    bvp_shift: Option<f64>,
    parallel: bool,
) -> anyhow::Result<()> {
    let config = Config::load_or_default();
    let mut pipeline_config = config.pipeline;
    if let Some(shift) = bvp_shift {
        pipeline_config.bvp.shift_secs = shift;
    }
    pipeline_config.parallel |= parallel;

    let recording = load_csv(input, &config.columns)
        .with_context(|| format!("failed to load recording {}", input.display()))?;
    info!(rows = recording.rows(), "Loaded {}", input.display());

    let log = create_shared_log_with_persistence(config.stats_path());
    let pipeline = FeaturePipeline::new(pipeline_config).with_log(Arc::clone(&log));
    ctrlc_handler(pipeline.cancel_flag())?;

    let result = pipeline.run(&recording);
    if let Err(e) = log.save() {
        eprintln!("Warning: Could not save extraction stats: {e}");
    }

    let table = match result {
        Ok(table) => table,
        Err(e @ (PipelineError::InsufficientData { .. } | PipelineError::UnresolvableGaps { .. })) => {
            eprintln!("Error: cannot extract features from {}", input.display());
            eprintln!("  {e}");
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    let source = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    let report = ReportBuilder::new().with_source(source).build(&table);

    let output_path = match output {
        Some(path) => path,
        None => {
            config
                .ensure_directories()
                .context("could not create export directory")?;
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "recording".to_string());
            config.export_path.join(format!(
                "{stem}_features_{}.{}",
                Utc::now().format("%Y%m%d_%H%M%S"),
                format.extension()
            ))
        }
    };

    let file = std::fs::File::create(&output_path)
        .with_context(|| format!("failed to create {}", output_path.display()))?;
    write_report(&report, format, BufWriter::new(file))
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    println!(
        "Wrote {} feature rows to {}",
        report.rows.len(),
        output_path.display()
    );
    Ok(())
}

fn cmd_inspect(input: &Path) -> anyhow::Result<()> {
    let config = Config::load_or_default();
    let recording = load_csv(input, &config.columns)
        .with_context(|| format!("failed to load recording {}", input.display()))?;
    let summary = recording.summary();

    println!("Recording: {}", input.display());
    println!();
    print!("{summary}");
    println!();
    println!("Windows at current configuration:");
    for signal in Signal::ALL {
        let window = match signal {
            Signal::Accelerometer => config.pipeline.acc,
            Signal::Bvp => config.pipeline.bvp,
            Signal::Temperature => config.pipeline.temp,
        };
        let params = window
            .params()
            .with_context(|| format!("invalid {signal} window configuration"))?;
        let count = params.window_count(summary.get(signal).clean);
        println!(
            "  {:<5} {:>4} Hz, {} s every {} s: {} windows",
            signal.name(),
            window.sampling_rate_hz,
            window.window_secs,
            window.shift_secs,
            count
        );
        if count == 0 {
            println!("        (needs at least {} clean samples)", params.size);
        }
    }
    Ok(())
}

fn cmd_check(features: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::open(features)
        .with_context(|| format!("failed to open {}", features.display()))?;
    let header = read_csv_header(file)
        .with_context(|| format!("failed to read header of {}", features.display()))?;

    match validate_columns(&header) {
        Ok(()) => {
            println!(
                "{}: all {} model inputs present (schema {FEATURE_SCHEMA_VERSION})",
                features.display(),
                MODEL_INPUT_COLUMNS.len()
            );
            Ok(())
        }
        Err(e) => bail!("{}: {e}", features.display()),
    }
}

fn cmd_schema() {
    println!("Feature schema {FEATURE_SCHEMA_VERSION}");
    println!();
    println!("Model inputs (in order):");
    for (i, name) in MODEL_INPUT_COLUMNS.iter().enumerate() {
        println!("  {:>2}. {name}", i + 1);
    }
    println!();
    println!("Output columns: {}", output_columns().join(", "));
}

fn cmd_status(reset: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default();
    let stats_path = config.stats_path();

    println!("Synheart Stress Features v{VERSION}");
    println!();
    if !stats_path.exists() {
        println!("No extraction statistics found.");
        return Ok(());
    }

    let log = create_shared_log_with_persistence(stats_path);
    println!("{}", log.summary());
    if reset {
        log.reset();
        log.save().context("could not save cleared statistics")?;
        println!();
        println!("Statistics cleared.");
    }
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(cancel: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        eprintln!("Cancelling after the current pass...");
        cancel.store(true, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}
