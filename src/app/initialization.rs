//! Application initialization and configuration

use anyhow::{Context, Result};
use log::{debug, error};
use crate::{cli, config, logging};
use crate::dispatch::DispatcherConfig;

pub fn load_configuration(args: &cli::Args) -> Result<config::ConfigManager> {
    let mut manager = if let Some(config_file) = &args.config_file {
        debug!("Loading configuration from explicit file: {}", config_file.display());
        config::ConfigManager::load_from_file(config_file.clone())?
    } else {
        config::ConfigManager::load()?
    };

    if let Some(section_name) = &args.config_name {
        manager.select_section(section_name.clone());
    }

    Ok(manager)
}

pub fn configure_logging(args: &cli::Args, config: &config::ConfigManager) -> Result<logging::LogConfig> {
    use log::LevelFilter;
    use std::str::FromStr;

    let console_level = if args.debug {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        match config.get_log_level("base", "console-level") {
            Ok(Some(level)) => level,
            Ok(None) => LevelFilter::Warn,
            Err(e) => {
                debug!("Invalid console-level in config, using default: {}", e);
                LevelFilter::Warn
            }
        }
    };

    let format = if !args.log_format.is_empty() && args.log_format != "text" {
        logging::LogFormat::from_str(&args.log_format)
            .map_err(|e| anyhow::anyhow!(e))?
    } else {
        match config.get_value_root("log-format") {
            Some(format_str) => logging::LogFormat::from_str(format_str)
                .unwrap_or(logging::LogFormat::Text),
            None => logging::LogFormat::Text,
        }
    };

    let log_file_path = args.log_file.clone()
        .or_else(|| config.get_path("base", "log-file"));

    let file_log_level = match &args.log_file_level {
        Some(level_str) => Some(logging::parse_log_level(level_str)?),
        None => config.get_log_level("base", "file-log-level").unwrap_or_else(|e| {
            debug!("Invalid file-log-level in config, ignoring: {}", e);
            None
        }),
    };

    let (destination, file_level) = match (log_file_path, file_log_level) {
        (Some(file_path), Some(level)) => (logging::LogDestination::Both(file_path), Some(level)),
        (Some(file_path), None) => (logging::LogDestination::Both(file_path), Some(console_level)),
        (None, None) => (logging::LogDestination::Console, None),
        (None, Some(_)) => {
            error!("Log file level specified without log file");
            return Err(anyhow::anyhow!("Log file level specified without log file"));
        }
    };

    Ok(logging::LogConfig {
        console_level,
        file_level,
        format,
        destination,
    })
}

/// Merge the configuration file with command line overrides
///
/// Command line values take precedence over the `[dispatcher]` section.
pub fn build_dispatcher_config(args: &cli::Args, config: &config::ConfigManager) -> Result<DispatcherConfig> {
    let mut dispatcher = config.get_dispatcher_config()?;

    if let Some(url) = &args.url {
        dispatcher.target_url = url.clone();
    }
    if let Some(workers) = args.workers {
        dispatcher.worker_count = workers;
    }
    if let Some(capacity) = args.queue_capacity {
        dispatcher.queue_capacity = capacity;
    }
    if let Some(seconds) = args.timeout {
        dispatcher.send_timeout = cli::seconds_arg("--timeout", seconds)?;
    }
    if let Some(seconds) = args.drain_timeout {
        dispatcher.drain_timeout = Some(cli::seconds_arg("--drain-timeout", seconds)?);
    }

    if dispatcher.target_url.is_empty() {
        return Err(anyhow::anyhow!(
            "No endpoint configured: pass --url or set url in the [dispatcher] config section"
        ));
    }

    dispatcher.validate().context("Dispatcher configuration validation failed")?;
    debug!("Effective dispatcher configuration: {:?}", dispatcher);
    Ok(dispatcher)
}
