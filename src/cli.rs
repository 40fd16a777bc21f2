use clap::Parser;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use log::debug;

/// Non-blocking HTTP notification dispatcher
#[derive(Parser, Debug, Default)]
#[command(name = "notifee")]
#[command(about = "Deliver notifications to an HTTP endpoint through a bounded queue and a pool of workers")]
#[command(version)]
pub struct Args {
    /// Messages to deliver (read from stdin, one per line, when omitted)
    pub messages: Vec<String>,

    /// Endpoint receiving one JSON POST per message
    #[arg(short, long, value_name = "URL")]
    pub url: Option<String>,

    /// Number of delivery workers
    #[arg(short, long, value_name = "COUNT")]
    pub workers: Option<usize>,

    /// Maximum number of queued messages
    #[arg(long, value_name = "COUNT")]
    pub queue_capacity: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// Maximum seconds to wait for workers during shutdown
    #[arg(long, value_name = "SECONDS")]
    pub drain_timeout: Option<f64>,

    /// Maximum seconds to wait for each delivery result
    #[arg(long, value_name = "SECONDS")]
    pub wait: Option<f64>,

    /// Verbose output (debug level logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long)]
    pub debug: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log file path for file output
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL")]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Configuration section name
    #[arg(long, value_name = "SECTION")]
    pub config_name: Option<String>,
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    let args = Args::parse();
    debug!("Parsed CLI arguments: {:?}", args);
    args
}

/// Convert a seconds flag to a Duration, naming the flag on failure
pub fn seconds_arg(flag: &str, seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        anyhow::anyhow!("{} must be a non-negative number of seconds that fits a duration, got {}", flag, seconds)
    })
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    let log_flags_count = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();

    if log_flags_count > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be specified"
        ));
    }

    match args.log_format.to_lowercase().as_str() {
        "text" | "json" => {},
        _ => return Err(anyhow::anyhow!(
            "Invalid log format '{}'. Valid options: text, json", args.log_format
        )),
    }

    if let Some(ref level) = args.log_file_level {
        match level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {},
            _ => return Err(anyhow::anyhow!(
                "Invalid log file level '{}'. Valid levels: error, warn, info, debug, trace", level
            )),
        }
    }

    if args.log_file_level.is_some() && args.log_file.is_none() {
        return Err(anyhow::anyhow!(
            "--log-file-level requires --log-file to be specified"
        ));
    }

    if args.workers == Some(0) {
        return Err(anyhow::anyhow!("--workers must be greater than 0"));
    }

    if args.queue_capacity == Some(0) {
        return Err(anyhow::anyhow!("--queue-capacity must be greater than 0"));
    }

    for (flag, value) in [("--timeout", args.timeout), ("--drain-timeout", args.drain_timeout), ("--wait", args.wait)] {
        if let Some(seconds) = value {
            seconds_arg(flag, seconds)?;
        }
    }

    debug!("CLI arguments validated successfully");
    Ok(())
}
