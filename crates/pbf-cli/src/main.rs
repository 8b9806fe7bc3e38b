/// PBF command-line tool: inspect, validate, and summarise OpenStreetMap
/// `.osm.pbf` extracts.
///
/// # Command overview
///
/// ```text
/// pbf <COMMAND> [OPTIONS]
///
/// Commands:
///   inspect    List the frames of a PBF file with their blob and group details
///   validate   Run the full decode pipeline and report success or failure
///   stats      Count entities, restrictions and the bounding box of a file
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Log at debug level (overridden by RUST_LOG)
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                 |
/// |------|-----------------------------------------|
/// | 0    | Success                                 |
/// | 1    | Error (I/O failure, invalid file, etc.) |
///
/// Reports go to stdout; logs and error details go to stderr.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use pbf_decoder::ReaderLimits;
use pbf_driver::ParserConfig;
use pbf_driver::config::DEFAULT_QUEUE_CAPACITY;
use tracing_subscriber::EnvFilter;

mod cmd_inspect;
mod cmd_stats;
mod cmd_validate;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// OpenStreetMap PBF decoding tool.
#[derive(Parser)]
#[command(name = "pbf", version, about = "OpenStreetMap PBF decoder CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// List every frame with its type, sizes, encoding and group kinds.
    Inspect(InspectArgs),
    /// Decode the whole file through the pipeline.
    Validate(ValidateArgs),
    /// Print entity counts, restriction breakdown and bounding box.
    Stats(StatsArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `pbf inspect`.
///
/// ```text
/// ┌──────────────┬───────────────────────────────────────────────────────┐
/// │ Flag         │ Effect                                                │
/// ├──────────────┼───────────────────────────────────────────────────────┤
/// │ --frames N   │ Stop after N frames                                   │
/// │ --no-decode  │ Skip decompression; print frame and blob headers only │
/// └──────────────┴───────────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Path to the `.osm.pbf` file to inspect.
    pub file: PathBuf,

    /// Inspect at most this many frames.
    #[arg(long)]
    pub frames: Option<usize>,

    /// Do not decompress or decode blobs.
    #[arg(long)]
    pub no_decode: bool,
}

/// Arguments for `pbf validate`.
///
/// Runs `initialize` and `run` with a sink that accepts everything. Exit
/// code 0 means both returned success.
#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Path to the `.osm.pbf` file to validate.
    pub file: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Arguments for `pbf stats`.
#[derive(clap::Args)]
pub struct StatsArgs {
    /// Path to the `.osm.pbf` file to analyse.
    pub file: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Pipeline tuning shared by `validate` and `stats`.
///
/// ```text
/// ┌──────────────────┬─────────┬─────────────────────────────────────────┐
/// │ Flag             │ Default │ Effect                                  │
/// ├──────────────────┼─────────┼─────────────────────────────────────────┤
/// │ --consumers      │ 1       │ Decoding contexts draining the queue    │
/// │ --queue-capacity │ 2500    │ Blocks buffered ahead of the consumers  │
/// │ --plain-nodes    │ off     │ Decode non-dense node groups            │
/// │ --max-blob-size  │ 32 MiB  │ Largest accepted blob, in bytes         │
/// └──────────────────┴─────────┴─────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct PipelineArgs {
    #[arg(long, default_value_t = 1)]
    pub consumers: usize,

    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    #[arg(long)]
    pub plain_nodes: bool,

    #[arg(long)]
    pub max_blob_size: Option<usize>,
}

impl PipelineArgs {
    pub fn config(&self) -> ParserConfig {
        let mut limits = ReaderLimits::default();
        if let Some(max) = self.max_blob_size {
            limits.max_blob_size = max;
        }
        ParserConfig {
            queue_capacity: self.queue_capacity,
            consumers: self.consumers,
            plain_nodes: self.plain_nodes,
            limits,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Inspect(args) => cmd_inspect::run(&args).await,
        Commands::Validate(args) => cmd_validate::run(&args).await,
        Commands::Stats(args) => cmd_stats::run(&args).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `-v`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
