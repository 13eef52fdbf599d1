use std::path::PathBuf;
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::debug;

/// Presentation shell diagnostics
#[derive(Parser, Debug)]
#[command(name = "appshell")]
#[command(about = "Inspect locators, replay navigation journals and classify faults")]
#[command(version)]
pub struct Args {
    /// Verbose output (debug level logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    /// Log file path for file output
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Configuration section name
    #[arg(long, value_name = "SECTION", global = true)]
    pub config_name: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Parse a navigation locator and print it as JSON
    Locator {
        /// Locator such as "/Orders;/OrderDetail?id=42"
        uri: String,
    },

    /// Navigate through a sequence of steps and print the resulting journal
    Replay {
        /// Locators, or one of: back, forward, clear
        #[arg(required = true)]
        steps: Vec<String>,

        /// Type ids that fail to resolve
        #[arg(long, value_name = "TYPE")]
        unresolvable: Vec<String>,
    },

    /// Classify a sample fault and show any resulting user message
    Classify {
        /// Fault kind, e.g. not-found, validation, busy
        kind: String,

        /// Name of the failing operation
        #[arg(long, default_value = "Sample operation")]
        operation: String,

        /// Detail text carried by the fault
        #[arg(long, default_value = "sample")]
        detail: String,
    },
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    let args = Args::parse();
    debug!("Parsed CLI arguments: {:?}", args);
    args
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    if args.verbose && args.quiet {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose or --quiet may be specified"
        ));
    }

    args.log_format
        .parse::<crate::logging::LogFormat>()
        .map_err(|e| anyhow::anyhow!(e))?;

    if let Some(level) = &args.log_file_level {
        crate::logging::parse_log_level(level)?;
        if args.log_file.is_none() {
            return Err(anyhow::anyhow!("--log-file-level requires --log-file to be specified"));
        }
    }

    if let Command::Classify { kind, .. } = &args.command {
        kind.parse::<crate::faults::FaultKind>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    Ok(())
}
