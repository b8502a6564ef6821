//! Domain Ports - boundary to the external RAID tool
//!
//! The inventory core never launches processes itself. It talks to the
//! tool through [`CommandRunner`], which production code implements with
//! a child process and tests implement with canned replies.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Raw result of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured stdout, also populated on non-zero exit
    pub stdout: String,
    /// Process exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code,
        }
    }

    /// Successful output with exit code 0
    pub fn success(stdout: impl Into<String>) -> Self {
        Self::new(stdout, Some(0))
    }

    /// Non-zero exit code, if any
    pub fn failure_code(&self) -> Option<i32> {
        self.exit_code.filter(|code| *code != 0)
    }
}

/// Port for running the external tool
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the tool with the given arguments (tool path excluded).
    ///
    /// A non-zero exit status is not an error at this level; only a
    /// failure to start the process is.
    async fn run(&self, args: &[String]) -> Result<CommandOutput>;
}

pub type CommandRunnerRef = Arc<dyn CommandRunner>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_code() {
        assert_eq!(CommandOutput::success("{}").failure_code(), None);
        assert_eq!(CommandOutput::new("", Some(111)).failure_code(), Some(111));
        assert_eq!(CommandOutput::new("", None).failure_code(), None);
    }
}
