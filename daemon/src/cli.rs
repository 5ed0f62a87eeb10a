use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_MONITOR_COMMAND: &str = "tvservice -M";
pub const DEFAULT_SHELL: &str = "/bin/sh";

#[derive(Parser, Debug)]
#[command(name = "tvhook", version)]
#[command(about = "Run shell commands when a display is attached or unplugged")]
pub struct Args {
    /// Path and filename of the JSON configuration file
    #[arg(short = 'c', long = "config-file", alias = "config_file")]
    pub config_file: PathBuf,

    /// Command that prints display hotplug events, one per line
    #[arg(short, long, default_value = DEFAULT_MONITOR_COMMAND)]
    pub monitor_command: String,

    /// Shell used to run the monitor command and every action
    #[arg(long, default_value = DEFAULT_SHELL)]
    pub shell: PathBuf,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}
