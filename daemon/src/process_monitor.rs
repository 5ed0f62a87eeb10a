use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::StartupError;
use crate::event::{DaemonEvent, ExitReport};

/// The long-running display monitor (e.g. `tvservice -M`) and its combined
/// stdout/stderr stream.
///
/// `tvservice` reports events on stderr, so the command runs behind a shell
/// `exec 2>&1` and both streams arrive in order on one pipe.
pub struct Monitor {
    child: Child,
    output: BufReader<ChildStdout>,
}

impl Monitor {
    /// Starts `command` through `shell`. The child is killed if the monitor is
    /// dropped before it exits.
    pub fn spawn(shell: &Path, command: &str) -> Result<Self, StartupError> {
        let spawn_error = |source| StartupError::MonitorSpawn {
            command: command.to_string(),
            source,
        };

        let mut child = Command::new(shell)
            .arg("-c")
            .arg(format!("exec 2>&1; {command}"))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error(std::io::Error::other("stdout was not captured")))?;

        debug!("Monitor started with pid {:?}", child.id());
        Ok(Self {
            child,
            output: BufReader::new(stdout),
        })
    }

    /// Reads the monitor's output one line at a time and forwards each line,
    /// trimmed, as [`DaemonEvent::Line`]. Empty lines are forwarded too.
    ///
    /// Once an empty read coincides with the process having exited (or the
    /// stream hits end of file), sends [`DaemonEvent::MonitorExited`] and
    /// returns. Also returns if the receiver has gone away.
    pub async fn run(mut self, tx: mpsc::Sender<DaemonEvent>) {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = match self.output.read_until(b'\n', &mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    warn!("Failed to read monitor output, treating as end of stream: {e}");
                    0
                }
            };

            let line = String::from_utf8_lossy(&buf).trim().to_string();
            let finished = line.is_empty() && (read == 0 || self.has_exited());

            if tx.send(DaemonEvent::Line(line)).await.is_err() {
                return;
            }

            if finished {
                let report = self.wait().await;
                let _ = tx.send(DaemonEvent::MonitorExited(report)).await;
                return;
            }
        }
    }

    fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    async fn wait(&mut self) -> ExitReport {
        match self.child.wait().await {
            Ok(status) => status.into(),
            Err(e) => {
                warn!("Failed to collect monitor exit status: {e}");
                ExitReport::default()
            }
        }
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;

    async fn collect(command: &str) -> Vec<DaemonEvent> {
        let monitor = Monitor::spawn(Path::new("/bin/sh"), command).unwrap();
        let (tx, mut rx) = mpsc::channel(32);
        tokio::spawn(monitor.run(tx));

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn lines(events: &[DaemonEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                DaemonEvent::Line(l) => Some(l.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn forwards_trimmed_lines_then_exit_status() {
        let events = collect("printf 'Starting to monitor\\n  [I] HDMI is attached  \\n'; exit 1").await;

        assert_eq!(lines(&events), vec!["Starting to monitor", "[I] HDMI is attached", ""]);
        assert_eq!(
            events.last(),
            Some(&DaemonEvent::MonitorExited(ExitReport { code: Some(1), signal: None }))
        );
    }

    #[tokio::test]
    async fn stderr_is_merged_into_the_stream() {
        let events = collect("echo '[I] HDMI cable is unplugged. Display 2' >&2").await;
        assert_eq!(lines(&events)[0], "[I] HDMI cable is unplugged. Display 2");
    }

    #[tokio::test]
    async fn stdout_and_stderr_keep_their_order() {
        let events = collect("echo one; echo two >&2; echo three").await;
        assert_eq!(lines(&events), vec!["one", "two", "three", ""]);
    }

    #[tokio::test]
    async fn blank_line_from_live_monitor_does_not_end_the_stream() {
        // The blank line is followed by more output, so the process is still
        // running when it is read.
        let events = collect("echo; sleep 0.2; echo after").await;
        assert_eq!(lines(&events), vec!["", "after", ""]);
        assert_eq!(
            events.iter().filter(|e| matches!(e, DaemonEvent::MonitorExited(_))).count(),
            1
        );
    }

    #[tokio::test]
    async fn invalid_utf8_is_decoded_lossily() {
        let events = collect("printf 'HDMI \\377 attached\\n'").await;
        assert!(lines(&events)[0].contains("attached"));
    }

    #[tokio::test]
    async fn missing_monitor_binary_reports_shell_status() {
        let events = collect("definitely-not-a-real-monitor-binary -M").await;
        assert!(lines(&events)[0].contains("not found"));
        assert_eq!(
            events.last(),
            Some(&DaemonEvent::MonitorExited(ExitReport { code: Some(127), signal: None }))
        );
    }

    #[tokio::test]
    async fn missing_shell_is_a_spawn_error() {
        let result = Monitor::spawn(Path::new("/nonexistent/shell"), "tvservice -M");
        assert!(matches!(result, Err(StartupError::MonitorSpawn { .. })));
    }
}
