//! HVSR Windowing CLI
//!
//! Time window selection for horizontal-to-vertical spectral ratio processing.

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use hvsr_windowing::{
    config::Config,
    core::{frequency_grid, Recording, SignalSpan, WindowGenerator},
    log::LogDocument,
    params::{format_duration, parse_time_text, Settings, SignalFormat, WindowingParams},
    VERSION,
};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hvsr-window")]
#[command(version = VERSION)]
#[command(about = "Time window selection for HVSR processing", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate time windows and write a windowing log
    Generate {
        /// Parameter file (bare KEY=VALUE block or a full log file)
        #[arg(long, short)]
        params: PathBuf,

        /// Signal file: plain ASCII (one sample per line), SAF, MiniShark or PEER
        #[arg(long)]
        signal: Option<PathBuf>,

        /// Signal file format (detected from the content when omitted)
        #[arg(long)]
        format: Option<SignalFormat>,

        /// Signal start time (seconds or time text)
        #[arg(long, allow_hyphen_values = true)]
        start: Option<String>,

        /// Signal end time (seconds or time text); ignored with --signal
        #[arg(long, allow_hyphen_values = true)]
        end: Option<String>,

        /// Sample interval of the signal file, in seconds
        #[arg(long, conflicts_with = "sampling_frequency")]
        dt: Option<f64>,

        /// Sampling frequency in Hz
        #[arg(long)]
        sampling_frequency: Option<f64>,

        /// Output log path (`-` for stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Check a windowing log for count, order and length consistency
    Check {
        /// Log file to check
        log: PathBuf,

        /// Allowed length difference in seconds (defaults to config)
        #[arg(long)]
        tolerance: Option<f64>,
    },

    /// Show typed parameters parsed from a file
    Params {
        /// Parameter or log file
        file: PathBuf,
    },

    /// Evaluate a time text such as `3d5h6m45s`
    Time {
        #[arg(allow_hyphen_values = true)]
        text: String,
    },

    /// Show or change configuration
    Config {
        /// Annotation written into generated logs
        #[arg(long)]
        set_annotation: Option<String>,

        /// Default length tolerance for `check`, in seconds
        #[arg(long)]
        set_tolerance: Option<f64>,

        /// Directory for generated logs
        #[arg(long)]
        set_output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Commands::Generate {
            params,
            signal,
            format,
            start,
            end,
            dt,
            sampling_frequency,
            output,
        } => cmd_generate(GenerateArgs {
            params,
            signal,
            format,
            start,
            end,
            dt,
            sampling_frequency,
            output,
        }),
        Commands::Check { log, tolerance } => cmd_check(&log, tolerance),
        Commands::Params { file } => cmd_params(&file),
        Commands::Time { text } => cmd_time(&text),
        Commands::Config {
            set_annotation,
            set_tolerance,
            set_output_dir,
        } => cmd_config(set_annotation, set_tolerance, set_output_dir),
    }
}

struct GenerateArgs {
    params: PathBuf,
    signal: Option<PathBuf>,
    format: Option<SignalFormat>,
    start: Option<String>,
    end: Option<String>,
    dt: Option<f64>,
    sampling_frequency: Option<f64>,
    output: Option<PathBuf>,
}

fn read_settings(path: &Path) -> Result<Settings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading parameters from {}", path.display()))?;
    Settings::parse(&text).with_context(|| format!("parsing {}", path.display()))
}

fn time_arg(name: &str, value: Option<&str>) -> Result<f64> {
    let value = value.ok_or_else(|| anyhow!("--{name} is required"))?;
    parse_time_text(value).with_context(|| format!("invalid --{name}"))
}

/// Work out the signal span from the arguments, the parameter block, or both.
fn signal_span(
    args: &GenerateArgs,
    params: &WindowingParams,
    params_path: &Path,
) -> Result<SignalSpan> {
    let signal_path = args.signal.clone().or_else(|| {
        if args.end.is_some() {
            return None;
        }
        // Relative signal references are resolved next to the parameter file.
        params.signal_file.as_ref().map(|file| {
            params_path
                .parent()
                .map(|dir| dir.join(file))
                .unwrap_or_else(|| PathBuf::from(file))
        })
    });

    match signal_path {
        Some(path) => {
            let dt = match (args.dt, args.sampling_frequency) {
                (Some(dt), _) => Some(dt),
                (None, Some(fs)) if fs > 0.0 => Some(1.0 / fs),
                (None, Some(fs)) => bail!("--sampling-frequency must be positive, got {fs}"),
                (None, None) => None,
            };
            let recording = Recording::read(&path, args.format, dt)
                .with_context(|| format!("reading signal {}", path.display()))?;
            let start = match args.start.as_deref() {
                Some(text) => parse_time_text(text).context("invalid --start")?,
                None => recording.start.unwrap_or(0.0),
            };
            tracing::info!(
                format = %recording.format,
                components = recording.components.len(),
                samples = recording.len(),
                sampling_frequency = 1.0 / recording.dt,
                path = %path.display(),
                "Loaded signal"
            );
            Ok(recording.span_with_bad_samples(start, params)?)
        }
        None => {
            let start = time_arg("start", args.start.as_deref())?;
            let end = time_arg("end", args.end.as_deref())?;
            let mut span = SignalSpan::new(start, end);
            if let Some(fs) = args.sampling_frequency {
                span = span.with_sampling_frequency(fs);
            }
            Ok(span)
        }
    }
}

fn cmd_generate(args: GenerateArgs) -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let settings = read_settings(&args.params)?;
    let params = WindowingParams::from_settings(&settings)
        .with_context(|| format!("reading parameters from {}", args.params.display()))?;

    let generator = WindowGenerator::new(params)?;
    let span = signal_span(&args, generator.params(), &args.params)?;
    let windows = generator.generate(&span)?;

    let mut document = LogDocument::new(settings, windows);
    document.log.annotation = vec![config.annotation.clone()];

    match args.output.as_deref() {
        Some(path) if path == Path::new("-") => {
            print!("{document}");
            return Ok(());
        }
        Some(path) => document.write_file(path)?,
        None => {
            if let Err(e) = config.ensure_directories() {
                eprintln!("Warning: Could not create directories: {e}");
            }
            let path = config.output_dir.join(format!(
                "windows_{}.log",
                Utc::now().format("%Y%m%d_%H%M%S")
            ));
            document.write_file(&path)?;
            println!("Wrote {}", path.display());
        }
    }

    println!(
        "Generated {} windows ({} s total)",
        document.log.len(),
        document.log.total_duration()
    );
    Ok(())
}

fn cmd_check(path: &Path, tolerance: Option<f64>) -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let tolerance = tolerance.unwrap_or(config.length_tolerance);

    let document =
        LogDocument::read_file(path).with_context(|| format!("reading {}", path.display()))?;
    let log = &document.log;

    println!("Windowing log: {}", path.display());
    println!("  Windows: {}", log.len());
    println!("  Total duration: {} s", log.total_duration());

    let mut problems = 0;
    if !log.is_ordered() {
        println!("  Start times are not in order");
        problems += 1;
    }
    for mismatch in log.verify_lengths(tolerance) {
        println!(
            "  Row {}: end - start = {} but length = {} (off by {:.6} s)",
            mismatch.index + 1,
            mismatch.window.duration_secs(),
            mismatch.window.length,
            mismatch.difference
        );
        problems += 1;
    }

    if !document.settings.is_empty() {
        match WindowingParams::from_settings(&document.settings) {
            Ok(params) => {
                if let Err(e) = params.validate() {
                    println!("  Parameters are inconsistent: {e}");
                    problems += 1;
                }
            }
            Err(e) => {
                println!("  Parameters could not be read: {e}");
                problems += 1;
            }
        }
    }

    if problems > 0 {
        bail!("{problems} problem(s) found in {}", path.display());
    }
    println!("  OK (tolerance {tolerance} s)");
    Ok(())
}

fn cmd_params(path: &Path) -> Result<()> {
    let settings = read_settings(path)?;
    let params = WindowingParams::from_settings(&settings)?;

    println!("{}", serde_json::to_string_pretty(&params)?);
    if let Err(e) = params.validate() {
        eprintln!("Warning: {e}");
    }
    match frequency_grid(&params.frequency) {
        Ok(grid) => println!("Frequency samples: {}", grid.len()),
        Err(e) => eprintln!("Warning: {e}"),
    }
    Ok(())
}

fn cmd_time(text: &str) -> Result<()> {
    let seconds = parse_time_text(text)?;
    println!("{seconds} s ({})", format_duration(seconds));
    Ok(())
}

fn cmd_config(
    annotation: Option<String>,
    tolerance: Option<f64>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = Config::load().unwrap_or_default();

    if annotation.is_some() || tolerance.is_some() || output_dir.is_some() {
        if let Some(annotation) = annotation {
            config.annotation = annotation;
        }
        if let Some(tolerance) = tolerance {
            if !(tolerance.is_finite() && tolerance >= 0.0) {
                bail!("--set-tolerance must be a non-negative number, got {tolerance}");
            }
            config.length_tolerance = tolerance;
        }
        if let Some(dir) = output_dir {
            config.output_dir = dir;
        }
        config.save().context("saving configuration")?;
        println!("Configuration saved to {}", Config::config_path().display());
        return Ok(());
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
