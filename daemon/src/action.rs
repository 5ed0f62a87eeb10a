use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use crate::event::ExitReport;

/// Runs one configured action to completion.
///
/// Implementations must not return before the command has finished: the
/// event loop relies on this to keep actions strictly serial.
#[allow(async_fn_in_trait)]
pub trait ActionRunner {
    /// Runs `command`. Only a failure to start it is an error; the command's
    /// own exit status is not.
    async fn run(&mut self, command: &str) -> Result<()>;
}

/// Hands each command string verbatim to `<shell> -c`, inheriting this
/// process's stdio.
pub struct ShellRunner {
    shell: PathBuf,
}

impl ShellRunner {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl ActionRunner for ShellRunner {
    async fn run(&mut self, command: &str) -> Result<()> {
        let status = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .status()
            .await
            .with_context(|| {
                format!("Failed to launch {} for '{command}'", self.shell.display())
            })?;

        debug!("Command '{command}' finished with status {}", ExitReport::from(status));
        Ok(())
    }
}
