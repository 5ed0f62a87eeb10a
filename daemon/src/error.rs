//! Startup failures.
//!
//! Everything that can stop the daemon before the event loop is running ends
//! up here. Once the loop is up, failures are reported as a
//! [`LoopOutcome`](crate::event_loop::LoopOutcome) instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StartupError {
    /// The config path does not name an existing regular file.
    #[error("Config JSON file not found: '{}'", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Failed to read config file '{}': {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The monitor command could not be started at all.
    #[error("Failed to start monitor '{command}': {source}")]
    MonitorSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}
