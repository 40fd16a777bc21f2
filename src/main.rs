use anyhow::Result;
use std::io;
use std::process;
use log::error;
use notifee::{app, cli, logging};

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("Application error: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Returns whether every message was delivered
fn run() -> Result<bool> {
    let args = cli::parse_args();

    cli::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;

    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;

    let dispatcher_config = app::build_dispatcher_config(&args, &config_manager)?;

    let messages = app::collect_messages(&args.messages, io::stdin().lock())?;
    if messages.is_empty() {
        return Err(anyhow::anyhow!("No messages to deliver"));
    }

    let wait = args.wait.map(|seconds| cli::seconds_arg("--wait", seconds)).transpose()?;
    let summary = app::run_dispatch(dispatcher_config, &messages, wait, &mut io::stdout().lock())?;

    Ok(summary.all_delivered())
}
