/// Attach/detach dispatch.
///
/// The loop consumes [`DaemonEvent`]s in arrival order and, for every line
/// that classifies as an attach and/or detach, runs the matching actions one
/// after another. Nothing here exits the process: every path that should end
/// the daemon is returned as a [`LoopOutcome`] for `main` to act on.
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::action::ActionRunner;
use crate::config::Config;
use crate::event::{classify, DaemonEvent, EventKind};

/// Exit status for every fatal path (`-1` as an unsigned process status).
pub const FATAL_EXIT_CODE: u8 = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Keep reading events.
    Continue,
    /// A shutdown signal was received.
    Shutdown,
    /// The daemon cannot continue; exit with `code`.
    FatalExit { code: u8, reason: String },
}

impl LoopOutcome {
    pub fn fatal(reason: impl Into<String>) -> Self {
        LoopOutcome::FatalExit {
            code: FATAL_EXIT_CODE,
            reason: reason.into(),
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            LoopOutcome::Continue | LoopOutcome::Shutdown => ExitCode::SUCCESS,
            LoopOutcome::FatalExit { code, .. } => ExitCode::from(*code),
        }
    }
}

pub struct EventLoop<'a, R> {
    config: &'a Config,
    runner: R,
}

impl<'a, R: ActionRunner> EventLoop<'a, R> {
    pub fn new(config: &'a Config, runner: R) -> Self {
        Self { config, runner }
    }

    /// Receives events until one of them ends the loop. A closed channel
    /// means the monitor reader is gone without reporting an exit, which is
    /// fatal too.
    pub async fn run(mut self, mut rx: mpsc::Receiver<DaemonEvent>) -> LoopOutcome {
        while let Some(event) = rx.recv().await {
            match self.handle(event).await {
                LoopOutcome::Continue => {}
                outcome => return outcome,
            }
        }

        error!("Monitor event channel closed");
        error!("Exiting");
        LoopOutcome::fatal("monitor event channel closed")
    }

    /// Handles one event, running any triggered actions to completion before
    /// returning.
    pub async fn handle(&mut self, event: DaemonEvent) -> LoopOutcome {
        match event {
            DaemonEvent::Line(line) => self.handle_line(&line).await,
            DaemonEvent::MonitorExited(report) => {
                error!("Monitor has exited with status '{report}'");
                error!("Exiting");
                LoopOutcome::fatal(format!("monitor exited with status {report}"))
            }
            DaemonEvent::Shutdown => {
                info!("Shutting down");
                LoopOutcome::Shutdown
            }
        }
    }

    async fn handle_line(&mut self, line: &str) -> LoopOutcome {
        info!("Monitor event received: '{line}'");
        if line.is_empty() {
            return LoopOutcome::Continue;
        }

        let classification = classify(line);
        if classification.is_other() {
            debug!("No attach/detach marker in line, nothing to run");
            return LoopOutcome::Continue;
        }

        for kind in classification.kinds() {
            info!("{}", kind.message());
            if let Err(e) = self.dispatch(kind).await {
                error!("{e:#}");
                error!("Exiting");
                return LoopOutcome::fatal(format!("{e:#}"));
            }
        }
        LoopOutcome::Continue
    }

    async fn dispatch(&mut self, kind: EventKind) -> anyhow::Result<()> {
        let config = self.config;
        for action in kind.actions(config) {
            info!(
                " {} run '{}' with command '{}'",
                kind.hook_name(),
                action.label,
                action.command
            );
            self.runner.run(&action.command).await?;
        }
        Ok(())
    }
}
