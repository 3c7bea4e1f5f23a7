// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `flowgate`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "flowgate",
    version,
    about = "Compile approval-flow diagrams into process definitions and deploy them.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `Flowgate.toml` is used when present, built-in defaults
    /// otherwise.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Diagram JSON to compile.
    #[arg(long, value_name = "PATH")]
    pub diagram: PathBuf,

    /// Process name. Defaults to the diagram file stem.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FLOWGATE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Compile and print the definition JSON instead of deploying it.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    pub fn process_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.diagram
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "process".to_string())
        })
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
