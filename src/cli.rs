//! Command line arguments

use std::path::PathBuf;

use clap::Parser;

use crate::config::{OutputFormat, Overrides, SinkKind};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "record the current ISS position at a fixed interval")]
pub struct Args {
    /// Database hostname
    #[arg(long)]
    pub host: Option<String>,

    /// Database port
    #[arg(long)]
    pub port: Option<u16>,

    /// Configuration file, replaces config/default.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Record a single position and exit
    #[arg(long)]
    pub once: bool,

    /// Seconds to sleep between polls
    #[arg(short, long)]
    pub interval: Option<u64>,

    #[arg(long, value_enum)]
    pub sink: Option<SinkKind>,

    /// Console output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Print all stored positions and exit
    #[arg(long, conflicts_with = "once")]
    pub list: bool,
}

impl Args {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            once: self.once,
            interval: self.interval,
            sink: self.sink,
            format: self.format,
        }
    }
}
