#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use flowgate::compiler::ProcessCompiler;
use flowgate::config::{AutoPassOptions, CompilerOptions};
use flowgate::engine::MemoryEngine;
use flowgate_test_utils::builders::DiagramBuilder;

/// Deploy `diagram` to `engine` and start one instance of it.
pub async fn deploy_and_start(engine: &Arc<MemoryEngine>, diagram: &DiagramBuilder) -> String {
    let compiler = ProcessCompiler::new(Arc::clone(engine), CompilerOptions::default());
    let process_id = compiler
        .deploy("test-process", &diagram.to_json())
        .await
        .expect("deploy failed");
    engine
        .start_instance(&process_id)
        .await
        .expect("instance start failed")
}

/// Auto-pass settings short enough for tests.
pub fn fast_autopass() -> AutoPassOptions {
    AutoPassOptions {
        timeout: Duration::from_millis(500),
        poll_interval: Duration::from_millis(10),
        comment: "auto".to_string(),
    }
}

/// S -> C1 -> P1 -> {U1, U2} -> I1 -> E
pub fn condition_parallel_inclusion() -> DiagramBuilder {
    DiagramBuilder::new()
        .node("S", "start")
        .node("C1", "condition")
        .node("P1", "parallel")
        .user("U1", &["alice"])
        .user("U2", &["bob"])
        .node("I1", "inclusion")
        .node("E", "end")
        .path(&["S", "C1", "P1", "U1", "I1", "E"])
        .path(&["P1", "U2", "I1"])
}
