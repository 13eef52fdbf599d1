use std::io;
use std::process;
use anyhow::Result;
use log::{error, info};

use appshell::{app, cli, logging};

fn main() {
    if let Err(e) = run() {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = cli::parse_args();
    cli::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;
    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;
    info!("appshell {} starting", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    // Locked per write: presenters on runtime workers print to stdout too
    let mut out = io::stdout();
    let result = runtime.block_on(app::execute(&args.command, &config_manager, &mut out));
    log::Log::flush(log::logger());
    result
}
