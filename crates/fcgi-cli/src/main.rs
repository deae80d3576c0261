/// FastCGI capture tool. Inspects, decodes and validates raw FastCGI byte
/// streams recorded from a web-server-to-application connection.
///
/// # Command overview
///
/// ```text
/// fcgi <COMMAND> [OPTIONS]
///
/// Commands:
///   inspect    Print one line per record (type, request id, lengths)
///   params     Print the parameters of each request
///   validate   Check a capture for structural correctness
///   help       Print help information
///
/// Global options:
///   -v, --verbose             Log decoder activity to stderr
///   --strict-version <BOOL>   Reject records whose version is not 1 [default: true]
///   --max-params-bytes <N>    Per-request cap on PARAMS content
///   -h, --help                Print help
///   -V, --version             Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                   |
/// |------|-------------------------------------------|
/// | 0    | Success                                   |
/// | 1    | Error (I/O failure, malformed stream, …)  |
///
/// All error details go to stderr so stdout can be piped cleanly.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use fcgi_decoder::DecoderConfig;
use tracing_subscriber::{EnvFilter, fmt};

mod cmd_inspect;
mod cmd_params;
mod cmd_validate;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// FastCGI inbound stream decoder.
#[derive(Parser)]
#[command(name = "fcgi", version, about = "FastCGI capture decoder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log decoder activity (records framed, requests started) to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Reject records whose header version is not 1.
    #[arg(long, global = true, default_value_t = true, action = clap::ArgAction::Set)]
    strict_version: bool,

    /// Maximum PARAMS content accepted per request, in bytes.
    #[arg(long, global = true)]
    max_params_bytes: Option<usize>,
}

impl Cli {
    fn decoder_config(&self) -> DecoderConfig {
        let mut config = DecoderConfig {
            strict_version: self.strict_version,
            ..DecoderConfig::default()
        };
        if let Some(limit) = self.max_params_bytes {
            config.max_params_bytes = limit;
        }
        config
    }
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Print one line per record in a capture.
    Inspect(InspectArgs),
    /// Print the completed parameter map of each request.
    Params(ParamsArgs),
    /// Check a capture for structural correctness.
    Validate(ValidateArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `fcgi inspect`.
///
/// Frames the capture record by record without interpreting request
/// state, so it also works on streams `validate` would reject.
///
/// ```text
/// ┌─────────────┬──────────────────────────────────────────────────┐
/// │ Flag        │ Effect                                           │
/// ├─────────────┼──────────────────────────────────────────────────┤
/// │ --show-hex  │ Include a 16-byte-per-line hex dump of content   │
/// └─────────────┴──────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Path to the raw FastCGI capture.
    pub file: PathBuf,

    /// Show a hex dump of each record's content.
    #[arg(long)]
    pub show_hex: bool,
}

/// Arguments for `fcgi params`.
#[derive(clap::Args)]
pub struct ParamsArgs {
    /// Path to the raw FastCGI capture.
    pub file: PathBuf,

    /// Only print the request with this id.
    #[arg(long)]
    pub request_id: Option<u16>,
}

/// Arguments for `fcgi validate`.
#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Path to the raw FastCGI capture.
    pub file: PathBuf,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.decoder_config();
    let result = match cli.command {
        Commands::Inspect(args) => cmd_inspect::run(&args, &config),
        Commands::Params(args) => cmd_params::run(&args, config),
        Commands::Validate(args) => cmd_validate::run(&args, config),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// `RUST_LOG` wins when set; otherwise `--verbose` turns on decoder
/// debug output.
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,fcgi_decoder=trace" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
