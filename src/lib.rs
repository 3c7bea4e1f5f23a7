// src/lib.rs

pub mod cli;
pub mod compiler;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod events;
pub mod flow;
pub mod logging;
pub mod progress;
pub mod proxy;
pub mod reconcile;
pub mod topology;
pub mod types;

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::compiler::ProcessCompiler;
use crate::config::load_or_default;
use crate::engine::MemoryEngine;

/// High-level entry point used by `main.rs`: load config, read the
/// diagram, then either print the compiled definition (`--dry-run`) or
/// deploy it to an in-process engine and print the process id.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref())?;
    debug!(?cfg, "configuration loaded");

    let diagram_json = fs::read_to_string(&args.diagram)
        .with_context(|| format!("reading diagram {}", args.diagram.display()))?;
    let name = args.process_name();

    let engine = Arc::new(MemoryEngine::new());
    let compiler = ProcessCompiler::new(engine, cfg.compiler);

    if args.dry_run {
        let diagram = compiler.decode(&diagram_json)?;
        let definition = compiler.compile(&name, &diagram)?;
        println!("{}", serde_json::to_string_pretty(&definition)?);
        return Ok(());
    }

    let process_id = compiler.deploy(&name, &diagram_json).await?;
    info!(process = %name, process_id = %process_id, "deploy finished");
    println!("{process_id}");
    Ok(())
}
