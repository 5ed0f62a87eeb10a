use std::fmt;

use crate::config::{ActionMap, Config, ON_ATTACH_KEY, ON_DETACH_KEY};

/// Substring marking a display attach in the monitor's output.
pub const ATTACHED_MARKER: &str = "attached";
/// Substring marking a display detach in the monitor's output.
pub const UNPLUGGED_MARKER: &str = "unplugged";

#[derive(Debug, PartialEq, Eq)]
pub enum DaemonEvent {
    /// One line of monitor output, decoded and trimmed. May be empty.
    Line(String),
    /// The monitor's output ended and the process has exited.
    MonitorExited(ExitReport),
    /// Ctrl+C or SIGTERM received; the daemon should exit cleanly.
    Shutdown,
}

/// How the monitor process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExitReport {
    pub code: Option<i32>,
    /// Terminating signal, unix only.
    pub signal: Option<i32>,
}

impl From<std::process::ExitStatus> for ExitReport {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ExitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "{code}"),
            (None, Some(signal)) => write!(f, "killed by signal {signal}"),
            (None, None) => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Attach,
    Detach,
}

impl EventKind {
    /// Config key holding this kind's actions; also prefixes the per-action log line.
    pub fn hook_name(self) -> &'static str {
        match self {
            EventKind::Attach => ON_ATTACH_KEY,
            EventKind::Detach => ON_DETACH_KEY,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            EventKind::Attach => "Monitor attached",
            EventKind::Detach => "Monitor unplugged",
        }
    }

    pub fn actions(self, config: &Config) -> &ActionMap {
        match self {
            EventKind::Attach => &config.on_attach,
            EventKind::Detach => &config.on_detach,
        }
    }
}

/// Result of matching one output line against both markers.
///
/// The two checks are independent plain substring searches: a line can be an
/// attach and a detach at once, and "unattached" counts as attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub attached: bool,
    pub unplugged: bool,
}

impl Classification {
    /// Neither marker matched.
    pub fn is_other(self) -> bool {
        !self.attached && !self.unplugged
    }

    /// Matched kinds, attach first.
    pub fn kinds(self) -> impl Iterator<Item = EventKind> {
        [
            self.attached.then_some(EventKind::Attach),
            self.unplugged.then_some(EventKind::Detach),
        ]
        .into_iter()
        .flatten()
    }
}

pub fn classify(line: &str) -> Classification {
    Classification {
        attached: line.contains(ATTACHED_MARKER),
        unplugged: line.contains(UNPLUGGED_MARKER),
    }
}
