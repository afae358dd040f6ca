use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "vr-battery-monitor",
    version,
    about = "Polls VR device batteries and writes them to InfluxDB"
)]
pub struct Cli {
    /// Config file; defaults to the executable path with a .conf extension.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Append-only event log; defaults to the executable path with a .log extension.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    /// Run a single poll cycle and exit.
    #[arg(long, default_value_t = false)]
    pub once: bool,
}
