//! ALIASTRACE CLI
//!
//! Alias queries and trace slicing over binary pointer-event logs.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod commands;

use aliastrace_replay::{MergePolicy, ReplayConfig, ReplayEngine};
use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aliastrace")]
#[command(about = "ALIASTRACE - dynamic alias analysis and slicing over pointer-event logs", long_about = None)]
struct Cli {
    /// Replay configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
    /// Never draw a progress bar
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count the records in a log
    Count {
        /// Path to log file
        #[arg(short, long)]
        log: PathBuf,
    },
    /// Print one line per record
    Dump {
        /// Path to log file
        #[arg(short, long)]
        log: PathBuf,
        /// Newest record first
        #[arg(long)]
        reverse: bool,
    },
    /// List every pair of values that may alias
    Aliases {
        /// Path to log file
        #[arg(short, long)]
        log: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask whether two values ever pointed into the same allocation
    Query {
        /// Path to log file
        #[arg(short, long)]
        log: PathBuf,
        /// First value id
        first: u32,
        /// Second value id
        second: u32,
    },
    /// Slice two pointer values back to their common history
    Slice(SliceArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Count { .. } => "count",
            Self::Dump { .. } => "dump",
            Self::Aliases { .. } => "aliases",
            Self::Query { .. } => "query",
            Self::Slice(_) => "slice",
        }
    }
}

#[derive(Args)]
#[command(group = clap::ArgGroup::new("start").required(true).args(["values", "records"]))]
struct SliceArgs {
    /// Path to log file
    #[arg(short, long)]
    log: PathBuf,
    /// Program metadata (JSON)
    #[arg(short, long)]
    program: PathBuf,
    /// Value ids; starting records are located with a forward pass
    #[arg(long, num_args = 2, value_names = ["A", "B"])]
    values: Option<Vec<u32>>,
    /// Starting record indices
    #[arg(long, num_args = 2, value_names = ["I", "J"])]
    records: Option<Vec<u64>>,
    /// Write the result here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
    /// Keep slicing past the first merge
    #[arg(long)]
    continue_after_merge: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<ReplayConfig> {
    let Some(path) = path else {
        return Ok(ReplayConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    ReplayConfig::from_json(&text).wrap_err_with(|| format!("parsing config {}", path.display()))
}

/// Load the config file and apply command-line overrides
fn resolve_config(cli: &Cli) -> Result<ReplayConfig> {
    let config = resolve_config(&cli)?;
    tracing::info!(config = ?config, source = ?cli.config, "replay configured");
    Ok(config)
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet || !console::Term::stderr().is_term() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} records")
    {
        bar.set_style(style);
    }
    bar
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut config = load_config(cli.config.as_deref())?;
    if let Commands::Slice(args) = &cli.command {
        if args.continue_after_merge {
            config.merge_policy = MergePolicy::Continue;
        }
    }

    let bar = progress_bar(cli.quiet);
    let sink = bar.clone();
    let mut engine = ReplayEngine::new()
        .with_config(config)
        .with_progress(move |done, total| {
            sink.set_length(total);
            sink.set_position(done);
        });

    tracing::info!(command = cli.command.name(), "starting");
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = match cli.command {
        Commands::Count { log } => commands::count(&log, &mut out),
        Commands::Dump { log, reverse } => commands::dump(&log, reverse, &mut out),
        Commands::Aliases { log, json } => commands::aliases(&mut engine, &log, json, &mut out),
        Commands::Query { log, first, second } => {
            commands::query(&mut engine, &log, first, second, &mut out)
        }
        Commands::Slice(args) => {
            let request = commands::SliceRequest {
                log: args.log,
                program: args.program,
                values: args.values,
                records: args.records,
                output: args.output,
                json: args.json,
            };
            commands::slice(&mut engine, &request, &mut out)
        }
    };
    bar.finish_and_clear();
    result
}
