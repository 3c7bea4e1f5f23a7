mod common;

use std::sync::Arc;

use flowgate::compiler::{CompiledNodeType, GatewayCondition, JoinPolicy, ProcessCompiler};
use flowgate::config::CompilerOptions;
use flowgate::engine::MemoryEngine;
use flowgate::errors::FlowgateError;
use flowgate::types::UnknownNodePolicy;
use flowgate_test_utils::builders::DiagramBuilder;
use flowgate_test_utils::init_tracing;

fn compiler(engine: &Arc<MemoryEngine>) -> ProcessCompiler<MemoryEngine> {
    ProcessCompiler::new(Arc::clone(engine), CompilerOptions::default())
}

#[test]
fn condition_into_parallel_gets_one_proxy() {
    init_tracing();

    let engine = Arc::new(MemoryEngine::new());
    let diagram = common::condition_parallel_inclusion().build();
    let def = compiler(&engine).compile("scenario", &diagram).unwrap();

    let ids: Vec<&str> = def.nodes.iter().map(|n| n.node_id.as_str()).collect();
    assert_eq!(ids, vec!["S", "C1", "proxy_C1_P1", "P1", "U1", "U2", "I1", "E"]);

    let proxy = def.node("proxy_C1_P1").unwrap();
    assert_eq!(proxy.node_type, CompiledNodeType::Approval);
    assert_eq!(proxy.approver_ids, vec!["sys_auto"]);
    assert_eq!(proxy.predecessor_ids, vec!["C1"]);
    assert_eq!(proxy.task_finish_events, vec!["EventTaskParallelNodePass"]);

    let c1 = def.node("C1").unwrap();
    let gw = c1.gateway_config.as_ref().unwrap();
    assert_eq!(gw.join_policy, JoinPolicy::ChainedCondition);
    assert_eq!(
        gw.conditions,
        vec![GatewayCondition {
            expression: "1 == 1".to_string(),
            target_node_id: "proxy_C1_P1".to_string(),
        }]
    );

    let p1 = def.node("P1").unwrap();
    assert_eq!(p1.predecessor_ids, vec!["proxy_C1_P1"]);
    assert_eq!(p1.join_policy(), Some(JoinPolicy::WaitAll));
    assert_eq!(
        p1.gateway_config.as_ref().unwrap().mandatory_successors,
        vec!["U1", "U2"]
    );

    let u1 = def.node("U1").unwrap();
    assert_eq!(
        u1.task_finish_events,
        vec!["EventTaskInclusionNodePass", "EventConcurrentRejectCleanup"]
    );

    let i1 = def.node("I1").unwrap();
    assert_eq!(i1.predecessor_ids, vec!["U1", "U2"]);
    assert_eq!(i1.join_policy(), Some(JoinPolicy::None));
    assert!(def.node("proxy_P1_I1").is_none());

    let end = def.node("E").unwrap();
    assert_eq!(end.node_start_events, vec!["EventProcessEnd"]);
}

#[test]
fn compiled_definition_serialises_engine_codes() {
    let engine = Arc::new(MemoryEngine::new());
    let diagram = common::condition_parallel_inclusion().build();
    let def = compiler(&engine).compile("scenario", &diagram).unwrap();

    let value = serde_json::to_value(&def).unwrap();
    let p1 = value["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["nodeId"] == "P1")
        .unwrap();
    assert_eq!(p1["nodeType"], "gateway");
    assert_eq!(p1["gatewayConfig"]["joinPolicy"], 1);
}

#[tokio::test]
async fn malformed_json_submits_nothing() {
    let engine = Arc::new(MemoryEngine::new());
    let err = compiler(&engine)
        .deploy("broken", "{\"nodes\": [")
        .await
        .unwrap_err();

    assert!(matches!(err, FlowgateError::DiagramDecode(_)), "got {err:?}");
    assert!(engine.definition("proc-1").await.is_none());
}

#[tokio::test]
async fn wrongly_typed_property_submits_nothing() {
    let engine = Arc::new(MemoryEngine::new());
    let json = DiagramBuilder::new()
        .node("S", "start")
        .node_with("U1", "user", serde_json::json!({"approvedUserIds": "alice"}))
        .edge("S", "U1")
        .to_json();

    let err = compiler(&engine).deploy("bad-props", &json).await.unwrap_err();
    assert!(
        matches!(&err, FlowgateError::PropertyDecode { node_id, .. } if node_id == "U1"),
        "got {err:?}"
    );
    assert!(engine.definition("proc-1").await.is_none());
}

#[tokio::test]
async fn submission_error_is_returned_verbatim() {
    let engine = Arc::new(MemoryEngine::new());
    engine.fail_submissions_with("quota exceeded").await;

    let json = common::condition_parallel_inclusion().to_json();
    let err = compiler(&engine).deploy("scenario", &json).await.unwrap_err();
    assert!(matches!(err, FlowgateError::Engine(msg) if msg == "quota exceeded"));
}

#[tokio::test]
async fn deploy_stores_definition() {
    let engine = Arc::new(MemoryEngine::new());
    let json = common::condition_parallel_inclusion().to_json();
    let pid = compiler(&engine).deploy("scenario", &json).await.unwrap();

    let stored = engine.definition(&pid).await.unwrap();
    assert_eq!(stored.name, "scenario");
    assert_eq!(stored.nodes.len(), 8);
}

#[tokio::test]
async fn unknown_node_type_policy() {
    let json = DiagramBuilder::new()
        .node("S", "start")
        .node("T1", "timer")
        .node("E", "end")
        .path(&["S", "T1", "E"])
        .edge("S", "E")
        .to_json();

    let engine = Arc::new(MemoryEngine::new());
    let pid = compiler(&engine).deploy("lenient", &json).await.unwrap();
    let def = engine.definition(&pid).await.unwrap();
    assert!(def.node("T1").is_none());
    assert_eq!(def.node("E").unwrap().predecessor_ids, vec!["S"]);

    let strict = ProcessCompiler::new(
        Arc::clone(&engine),
        CompilerOptions {
            unknown_node_types: UnknownNodePolicy::Reject,
            ..CompilerOptions::default()
        },
    );
    let err = strict.deploy("strict", &json).await.unwrap_err();
    assert!(
        matches!(&err, FlowgateError::UnknownNodeType { node_id, type_name } if node_id == "T1" && type_name == "timer"),
        "got {err:?}"
    );
}
