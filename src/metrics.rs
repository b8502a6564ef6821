//! Prometheus metrics
//!
//! Counters and histograms live in the default prometheus registry and
//! are exposed by the `/metrics` route.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};
use std::time::Duration;

static STORCLI_COMMANDS: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = register_int_counter_vec!(
        "storcli_commands_total",
        "storcli invocations by outcome",
        &["outcome"]
    )
    .expect("storcli_commands_total registers once");
    // export all outcomes from the start, even at zero
    for outcome in [CommandOutcome::Ok, CommandOutcome::ToolError, CommandOutcome::LaunchError] {
        counter.with_label_values(&[outcome.as_label()]);
    }
    counter
});

static STORCLI_COMMAND_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "storcli_command_duration_seconds",
        "Wall time of storcli invocations",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("storcli_command_duration_seconds registers once")
});

/// Outcome label of one tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Process ran and exited with status 0
    Ok,
    /// Process ran and exited with a non-zero status
    ToolError,
    /// Process could not be started
    LaunchError,
}

impl CommandOutcome {
    pub fn as_label(self) -> &'static str {
        match self {
            CommandOutcome::Ok => "ok",
            CommandOutcome::ToolError => "tool_error",
            CommandOutcome::LaunchError => "launch_error",
        }
    }
}

/// Record one tool invocation
pub fn record_command(outcome: CommandOutcome, elapsed: Duration) {
    STORCLI_COMMANDS
        .with_label_values(&[outcome.as_label()])
        .inc();
    STORCLI_COMMAND_DURATION.observe(elapsed.as_secs_f64());
}

/// Number of recorded invocations with the given outcome
pub fn command_count(outcome: CommandOutcome) -> u64 {
    STORCLI_COMMANDS
        .with_label_values(&[outcome.as_label()])
        .get()
}

/// Render all registered metrics in the text exposition format
pub fn render() -> Result<String> {
    Lazy::force(&STORCLI_COMMANDS);
    Lazy::force(&STORCLI_COMMAND_DURATION);

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| Error::Internal(format!("metrics encoding failed: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| Error::Internal(format!("metrics encoding failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_render() {
        let before = command_count(CommandOutcome::LaunchError);
        record_command(CommandOutcome::LaunchError, Duration::from_millis(3));
        assert!(command_count(CommandOutcome::LaunchError) > before);

        let text = render().unwrap();
        assert!(text.contains("storcli_commands_total"));
        assert!(text.contains("storcli_command_duration_seconds"));
    }
}
