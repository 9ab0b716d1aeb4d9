use clap::{Args, Parser, Subcommand};
use fmusim_rs::archive::{ArchiveLoader, ExtractedArchive};
use fmusim_rs::fmi2::{LogSink, TracingSink};
use fmusim_rs::model::{Causality, ModelDescription, describe};
use fmusim_rs::sim::{SimulationOptions, simulate_fmu};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "fmusim", about = "Inspect and simulate FMI 2.0 co-simulation models")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a summary of the model description
    Describe(DescribeArgs),
    /// Run a co-simulation from start to stop time
    Simulate(SimulateArgs),
}

#[derive(Debug, Args)]
struct DescribeArgs {
    /// Model description (JSON form of modelDescription.xml)
    #[arg(long)]
    description: PathBuf,

    /// Unpacked archive directory, used to list supported platforms
    #[arg(long)]
    archive_dir: Option<PathBuf>,

    /// Causalities to list (defaults to input, output, independent)
    #[arg(long = "causality")]
    causalities: Vec<String>,
}

#[derive(Debug, Args)]
struct SimulateArgs {
    /// Unpacked archive directory
    #[arg(long)]
    archive_dir: PathBuf,

    /// Model description (JSON form of modelDescription.xml)
    #[arg(long)]
    description: PathBuf,

    /// Simulation options JSON; command-line flags override its fields
    #[arg(long)]
    options: Option<PathBuf>,

    #[arg(long)]
    start_time: Option<f64>,

    #[arg(long)]
    stop_time: Option<f64>,

    #[arg(long)]
    output_interval: Option<f64>,

    /// Wall-clock timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Enable the model's debug logging
    #[arg(long)]
    debug_logging: bool,

    /// Write the recorded result as JSON
    #[arg(long)]
    output_json: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Describe(args) => run_describe(args),
        Command::Simulate(args) => run_simulate(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run_describe(args: DescribeArgs) -> Result<(), String> {
    let md = ModelDescription::from_json_file(&args.description).map_err(|e| e.to_string())?;

    let causalities = if args.causalities.is_empty() {
        vec![Causality::Input, Causality::Output, Causality::Independent]
    } else {
        args.causalities
            .iter()
            .map(|s| Causality::parse(s).ok_or_else(|| format!("unknown causality: {s}")))
            .collect::<Result<Vec<_>, _>>()?
    };

    let platforms = match &args.archive_dir {
        Some(dir) => ExtractedArchive::open(dir)
            .map_err(|e| e.to_string())?
            .supported_platforms(),
        None => Vec::new(),
    };

    print!("{}", describe(&md, &platforms, &causalities));
    Ok(())
}

fn run_simulate(args: SimulateArgs) -> Result<(), String> {
    let md = ModelDescription::from_json_file(&args.description).map_err(|e| e.to_string())?;
    let archive = ExtractedArchive::open(&args.archive_dir).map_err(|e| e.to_string())?;

    let mut options = match &args.options {
        Some(path) => SimulationOptions::from_json_file(path).map_err(|e| e.to_string())?,
        None => SimulationOptions::default(),
    };
    if args.start_time.is_some() {
        options.start_time = args.start_time;
    }
    if args.stop_time.is_some() {
        options.stop_time = args.stop_time;
    }
    if args.output_interval.is_some() {
        options.output_interval = args.output_interval;
    }
    if args.timeout.is_some() {
        options.timeout = args.timeout;
    }
    if args.debug_logging {
        options.debug_logging = true;
    }

    let sink: Arc<dyn LogSink> = Arc::new(TracingSink);
    let result = simulate_fmu(&archive, &md, &options, sink).map_err(|e| e.to_string())?;

    if let Some(path) = &args.output_json {
        let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| format!("write {}: {e}", path.display()))?;
    }

    println!(
        "done @ t={}, steps={}, stop={}",
        result.final_time, result.steps, result.stop_reason
    );
    Ok(())
}
