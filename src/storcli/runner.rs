//! Process-backed command runner
//!
//! Launches the configured storcli binary as a child process and
//! captures its stdout. Exit codes are passed through untouched; the
//! decoder decides what they mean.

use crate::domain::ports::{CommandOutput, CommandRunner};
use crate::error::{Error, Result};
use crate::metrics::{self, CommandOutcome};
use async_trait::async_trait;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs storcli through `tokio::process`
#[derive(Debug, Clone)]
pub struct StorcliRunner {
    /// Program followed by fixed leading arguments
    command: Vec<String>,
}

impl StorcliRunner {
    pub fn new(command: Vec<String>) -> Result<Self> {
        if command.first().map_or(true, |program| program.trim().is_empty()) {
            return Err(Error::Configuration("storcli command is empty".into()));
        }
        Ok(Self { command })
    }

    pub fn program(&self) -> &str {
        &self.command[0]
    }
}

#[async_trait]
impl CommandRunner for StorcliRunner {
    async fn run(&self, args: &[String]) -> Result<CommandOutput> {
        debug!("Running {} {}", self.command.join(" "), args.join(" "));
        let started = Instant::now();

        let output = Command::new(self.program())
            .args(&self.command[1..])
            .args(args)
            .kill_on_drop(true)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                metrics::record_command(CommandOutcome::LaunchError, started.elapsed());
                warn!("Failed to launch {}: {}", self.program(), e);
                return Err(Error::Launch {
                    command: self.program().to_string(),
                    os_code: e.raw_os_error(),
                    reason: e.to_string(),
                });
            }
        };

        let outcome = if output.status.success() {
            CommandOutcome::Ok
        } else {
            CommandOutcome::ToolError
        };
        metrics::record_command(outcome, started.elapsed());

        if !output.stderr.is_empty() {
            debug!("storcli stderr: {}", String::from_utf8_lossy(&output.stderr).trim());
        }

        Ok(CommandOutput::new(
            String::from_utf8_lossy(&output.stdout),
            output.status.code(),
        ))
    }
}
