//! Message submission and result reporting

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{BufRead, Write};
use std::time::Duration;
use log::{debug, info};
use crate::dispatch::{Dispatcher, DispatcherConfig, ResultHandle};

/// Totals for one CLI run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub failed: usize,
    pub rejected: usize,
    pub pending: usize,
}

impl DispatchSummary {
    pub fn total(&self) -> usize {
        self.delivered + self.failed + self.rejected + self.pending
    }

    pub fn all_delivered(&self) -> bool {
        self.delivered == self.total()
    }
}

/// Messages from the command line, or non-empty stdin lines when none given
pub fn collect_messages(args: &[String], input: impl BufRead) -> Result<Vec<String>> {
    if !args.is_empty() {
        return Ok(args.to_vec());
    }

    let mut messages = Vec::new();
    for line in input.lines() {
        let line = line.context("Failed to read message from stdin")?;
        if !line.trim().is_empty() {
            messages.push(line);
        }
    }
    debug!("Read {} messages from stdin", messages.len());
    Ok(messages)
}

/// Submit every message, wait for the outcomes and report them to `out`
pub fn run_dispatch(
    config: DispatcherConfig,
    messages: &[String],
    wait: Option<Duration>,
    out: &mut impl Write,
) -> Result<DispatchSummary> {
    let dispatcher = Dispatcher::new(config)?;
    let mut summary = DispatchSummary::default();

    let submitted: Vec<(&String, Option<ResultHandle>)> = messages.iter()
        .map(|message| match dispatcher.submit(message.as_str()) {
            Ok(handle) => (message, Some(handle)),
            Err(e) => {
                summary.rejected += 1;
                let _ = writeln!(out, "{} {} ({})", "REJECTED".red().bold(), message, e);
                (message, None)
            }
        })
        .collect();
    info!("Submitted {} of {} messages", submitted.len() - summary.rejected, messages.len());

    for (message, handle) in &submitted {
        let Some(handle) = handle else { continue };
        match handle.wait(wait) {
            Some(Ok(response)) => {
                summary.delivered += 1;
                writeln!(out, "{} {} (HTTP {}, {}ms)", "DELIVERED".green().bold(), message,
                    response.status, response.duration.as_millis())?;
            }
            Some(Err(e)) => {
                summary.failed += 1;
                writeln!(out, "{} {} ({})", "FAILED".red().bold(), message, e)?;
            }
            None => {
                summary.pending += 1;
                writeln!(out, "{} {}", "PENDING".yellow().bold(), message)?;
            }
        }
    }

    let report = dispatcher.shutdown(dispatcher.config().drain_timeout);
    if !report.is_complete() {
        writeln!(out, "{} {} workers still running after drain timeout",
            "WARNING".yellow().bold(), report.workers_timed_out)?;
    }

    writeln!(out, "{} delivered, {} failed, {} rejected, {} pending",
        summary.delivered, summary.failed, summary.rejected, summary.pending)?;
    Ok(summary)
}
