mod action;
mod cli;
mod config;
mod error;
mod event;
mod event_loop;
mod paths;
mod process_monitor;

use clap::Parser;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::action::ShellRunner;
use crate::event::DaemonEvent;
use crate::event_loop::{EventLoop, LoopOutcome};
use crate::process_monitor::Monitor;

const EVENT_CHANNEL_CAPACITY: usize = 32;

fn setup_logs(verbose: bool) {
    use tracing_subscriber::{
        fmt, fmt::time::ChronoLocal, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
    };

    let level = if verbose { "debug" } else { "info" };
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,{}={level}", env!("CARGO_CRATE_NAME")))
    });
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_timer(ChronoLocal::new("[%X]".to_string()));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = cli::Args::parse();
    setup_logs(args.verbose);

    run(args).await.exit_code()
}

/// Loads the config, starts the monitor and runs the event loop until it
/// ends. Startup failures come back as a fatal outcome before the monitor is
/// spawned.
async fn run(args: cli::Args) -> LoopOutcome {
    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::resolve_config_path(&args.config_file);
    let config = match config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return LoopOutcome::fatal(e.to_string());
        }
    };
    if config.is_empty() {
        warn!("No actions configured; events will only be logged");
    }

    // ── Monitor subprocess ────────────────────────────────────────────────────
    let monitor = match Monitor::spawn(&args.shell, &args.monitor_command) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("{e}");
            return LoopOutcome::fatal(e.to_string());
        }
    };

    let (event_tx, event_rx) = mpsc::channel::<DaemonEvent>(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(monitor.run(event_tx.clone()));

    // Clean exit on Ctrl+C / SIGTERM.
    tokio::spawn(async move {
        if shutdown_signal().await {
            let _ = event_tx.send(DaemonEvent::Shutdown).await;
        }
    });

    info!("Monitor '{}' running, waiting for new events", args.monitor_command);

    // ── Event loop ────────────────────────────────────────────────────────────
    EventLoop::new(&config, ShellRunner::new(args.shell))
        .run(event_rx)
        .await
}

/// Resolves once a shutdown signal arrives. Returns `false` if no signal
/// handler could be installed, in which case it never resolves with `true`.
async fn shutdown_signal() -> bool {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                return tokio::select! {
                    res = tokio::signal::ctrl_c() => res.is_ok(),
                    _ = terminate.recv() => true,
                };
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {e}"),
        }
    }

    tokio::signal::ctrl_c().await.is_ok()
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::path::Path;

    fn args(config: &Path, monitor_command: &str) -> cli::Args {
        cli::Args::try_parse_from([
            "tvhook",
            "--config-file",
            config.to_str().unwrap(),
            "--monitor-command",
            monitor_command,
        ])
        .unwrap()
    }

    fn write_config(dir: &Path, json: &str) -> std::path::PathBuf {
        let path = dir.join("config.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[tokio::test]
    async fn attach_line_runs_attach_command_once() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let config = write_config(
            dir.path(),
            &format!(
                r#"{{"onattach": {{"a": "echo hi >> '{0}'"}},
                    "ondetach": {{"d": "echo bye >> '{0}'"}}}}"#,
                out.display()
            ),
        );

        let outcome = run(args(&config, "echo '[I] HDMI is attached'")).await;

        assert!(matches!(outcome, LoopOutcome::FatalExit { code: 255, .. }));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hi\n");
    }

    #[tokio::test]
    async fn empty_config_runs_nothing_and_keeps_reading() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), "{}");

        let outcome = run(args(
            &config,
            "echo 'HDMI cable is unplugged. Display 2'; echo 'HDMI is attached'; exit 1",
        ))
        .await;

        match outcome {
            LoopOutcome::FatalExit { reason, .. } => assert!(reason.contains("status 1"), "{reason}"),
            other => panic!("expected FatalExit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn monitor_exit_status_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), r#"{"onattach": {"a": "true"}}"#);

        let outcome = run(args(&config, "exit 1")).await;

        assert_eq!(outcome, LoopOutcome::fatal("monitor exited with status 1"));
    }

    #[tokio::test]
    async fn missing_config_does_not_start_the_monitor() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("monitor-started");
        let missing = dir.path().join("missing.json");

        let outcome = run(args(&missing, &format!("touch '{}'", marker.display()))).await;

        assert!(matches!(outcome, LoopOutcome::FatalExit { code: 255, .. }));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn malformed_config_does_not_start_the_monitor() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("monitor-started");
        let config = write_config(dir.path(), "{\"onattach\": ");

        let outcome = run(args(&config, &format!("touch '{}'", marker.display()))).await;

        assert!(matches!(outcome, LoopOutcome::FatalExit { .. }));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn actions_finish_before_the_next_event() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let config = write_config(
            dir.path(),
            &format!(
                r#"{{"onattach": {{"slow": "sleep 0.2; echo attach >> '{0}'"}},
                    "ondetach": {{"fast": "echo detach >> '{0}'"}}}}"#,
                out.display()
            ),
        );

        run(args(&config, "echo 'HDMI is attached'; echo 'HDMI cable is unplugged'")).await;

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "attach\ndetach\n");
    }
}
