mod common;

use std::sync::Arc;

use flowgate::config::{AutoPassOptions, DispatchOptions};
use flowgate::dispatch::{event_channel, Dispatcher, EngineEvent};
use flowgate::engine::{BranchOutcome, ClosedBranch, MemoryEngine, ProcessEngine, TaskStatus};
use flowgate::events::EngineEventName;
use flowgate::progress::ProgressView;
use flowgate::proxy::AutoPassStatus;
use flowgate_test_utils::builders::DiagramBuilder;
use flowgate_test_utils::recording_hooks::RecordingHooks;
use flowgate_test_utils::{init_tracing, with_timeout};
use tokio::sync::mpsc;

fn dispatcher(engine: &Arc<MemoryEngine>, hooks: &RecordingHooks) -> Dispatcher<MemoryEngine, RecordingHooks> {
    Dispatcher::new(
        Arc::clone(engine),
        hooks.clone(),
        common::fast_autopass(),
        DispatchOptions::default(),
    )
}

/// S -> I0 -> {N1, N2} -> I1 -> E
fn inclusion_pair() -> DiagramBuilder {
    DiagramBuilder::new()
        .node("S", "start")
        .node("I0", "inclusion")
        .user("N1", &["alice"])
        .user("N2", &["bob", "carol"])
        .node("I1", "inclusion")
        .node("E", "end")
        .path(&["S", "I0", "N1", "I1", "E"])
        .path(&["I0", "N2", "I1"])
}

/// S -> C1 -> P1 -> {U1, U2} -> P2 -> E, with U1 cosigned.
fn condition_parallel_pair() -> DiagramBuilder {
    DiagramBuilder::new()
        .node("S", "start")
        .node("C1", "condition")
        .node("P1", "parallel")
        .cosigned_user("U1", &["alice", "bob"])
        .user("U2", &["carol", "dave"])
        .node("P2", "parallel")
        .node("E", "end")
        .path(&["S", "C1", "P1", "U1", "P2", "E"])
        .path(&["P1", "U2", "P2"])
}

#[tokio::test]
async fn inclusion_reject_closes_branch_as_system_rejected() {
    init_tracing();

    let engine = Arc::new(MemoryEngine::new());
    let hooks = RecordingHooks::new();
    let inst = common::deploy_and_start(&engine, &inclusion_pair()).await;

    let rejected = engine.create_task(&inst, "N2", "b1", "bob", false).await;
    let pending = engine.create_task(&inst, "N2", "b1", "carol", false).await;
    let rejected = engine
        .complete_task(&rejected.task_id, TaskStatus::Rejected, "no budget")
        .await
        .unwrap();

    let report = dispatcher(&engine, &hooks)
        .handle(EngineEvent::TaskFinished {
            event: EngineEventName::TaskInclusionNodePass,
            task: rejected,
        })
        .await
        .unwrap();
    assert_eq!(report.commands.len(), 2);

    let reject_comment = DispatchOptions::default().system_reject_comment;
    assert_eq!(
        engine.closed_branches().await,
        vec![ClosedBranch {
            proc_inst_id: inst.clone(),
            gateway_id: "I1".to_string(),
            predecessor_id: "N2".to_string(),
            outcome: BranchOutcome::SystemRejected,
            comment: reject_comment,
        }]
    );
    let sibling = engine.task(&pending.task_id).await.unwrap();
    assert_eq!(sibling.status, TaskStatus::SystemRejected);
    assert!(sibling.is_finished);
}

#[tokio::test]
async fn inclusion_pass_closes_branch_and_finishes_siblings() {
    let engine = Arc::new(MemoryEngine::new());
    let hooks = RecordingHooks::new();
    let inst = common::deploy_and_start(&engine, &inclusion_pair()).await;

    let first = engine.create_task(&inst, "N2", "b1", "bob", false).await;
    let second = engine.create_task(&inst, "N2", "b1", "carol", false).await;
    let first = engine
        .complete_task(&first.task_id, TaskStatus::Passed, "fine")
        .await
        .unwrap();

    dispatcher(&engine, &hooks)
        .handle(EngineEvent::TaskFinished {
            event: EngineEventName::TaskInclusionNodePass,
            task: first,
        })
        .await
        .unwrap();

    let closed = engine.closed_branches().await;
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].outcome, BranchOutcome::SystemPassed);
    assert_eq!(
        engine.task(&second.task_id).await.unwrap().status,
        TaskStatus::SystemPassed
    );
}

#[tokio::test]
async fn inclusion_pass_in_old_batch_is_ignored_after_loop_back() {
    let engine = Arc::new(MemoryEngine::new());
    let hooks = RecordingHooks::new();
    let inst = common::deploy_and_start(&engine, &inclusion_pair()).await;

    let old = engine.create_task(&inst, "N2", "b1", "bob", false).await;
    let old_sibling = engine.create_task(&inst, "N2", "b1", "carol", false).await;
    let live = engine.create_task(&inst, "N2", "b2", "bob", false).await;
    let old = engine
        .complete_task(&old.task_id, TaskStatus::Passed, "late")
        .await
        .unwrap();

    let report = dispatcher(&engine, &hooks)
        .handle(EngineEvent::TaskFinished {
            event: EngineEventName::TaskInclusionNodePass,
            task: old,
        })
        .await
        .unwrap();

    assert!(report.commands.is_empty());
    assert!(engine.closed_branches().await.is_empty());
    assert_eq!(
        engine.task(&old_sibling.task_id).await.unwrap().status,
        TaskStatus::Pending
    );
    assert_eq!(engine.task(&live.task_id).await.unwrap().status, TaskStatus::Pending);
}

#[tokio::test]
async fn cosigned_parallel_branch_closes_after_last_approval() {
    let engine = Arc::new(MemoryEngine::new());
    let hooks = RecordingHooks::new();
    let inst = common::deploy_and_start(&engine, &condition_parallel_pair()).await;
    let dispatcher = dispatcher(&engine, &hooks);

    let a = engine.create_task(&inst, "U1", "b1", "alice", true).await;
    let b = engine.create_task(&inst, "U1", "b1", "bob", true).await;

    let a = engine.complete_task(&a.task_id, TaskStatus::Passed, "").await.unwrap();
    dispatcher
        .handle(EngineEvent::TaskFinished {
            event: EngineEventName::TaskParallelNodePass,
            task: a,
        })
        .await
        .unwrap();
    assert!(engine.closed_branches().await.is_empty());

    let b = engine.complete_task(&b.task_id, TaskStatus::Passed, "").await.unwrap();
    dispatcher
        .handle(EngineEvent::TaskFinished {
            event: EngineEventName::TaskParallelNodePass,
            task: b,
        })
        .await
        .unwrap();

    let closed = engine.closed_branches().await;
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].gateway_id, "P2");
    assert_eq!(closed[0].predecessor_id, "U1");
    assert_eq!(closed[0].outcome, BranchOutcome::SystemPassed);

    let tasks = engine.list_tasks(&inst).await.unwrap();
    let def = engine.definition_for_instance(&inst).await.unwrap();
    let view = ProgressView::build(&def.nodes, &tasks);
    assert!(view.completed.contains("U1"));
}

#[tokio::test]
async fn reject_behind_condition_and_parallel_cleans_up_sibling() {
    let engine = Arc::new(MemoryEngine::new());
    let hooks = RecordingHooks::new();
    let inst = common::deploy_and_start(&engine, &condition_parallel_pair()).await;

    let u1 = engine.create_task(&inst, "U1", "b1", "alice", true).await;
    let u2 = engine.create_task(&inst, "U2", "b2", "carol", false).await;
    let u1 = engine
        .complete_task(&u1.task_id, TaskStatus::Rejected, "wrong vendor")
        .await
        .unwrap();

    dispatcher(&engine, &hooks)
        .handle(EngineEvent::TaskFinished {
            event: EngineEventName::ConcurrentRejectCleanup,
            task: u1,
        })
        .await
        .unwrap();

    assert_eq!(
        engine.task(&u2.task_id).await.unwrap().status,
        TaskStatus::SystemRejected
    );
    let closed = engine.closed_branches().await;
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].gateway_id, "P2");
    assert_eq!(closed[0].predecessor_id, "U2");
    assert_eq!(closed[0].outcome, BranchOutcome::SystemRejected);
}

#[tokio::test]
async fn proxy_start_spawns_autopass_and_forwards_hook() {
    let engine = Arc::new(MemoryEngine::new());
    let hooks = RecordingHooks::new();
    let inst = common::deploy_and_start(&engine, &condition_parallel_pair()).await;

    let mut report = dispatcher(&engine, &hooks)
        .handle(EngineEvent::NodeStarted {
            proc_inst_id: inst.clone(),
            node_id: "proxy_C1_P1".to_string(),
            event: EngineEventName::TaskNodeStart,
        })
        .await
        .unwrap();

    assert_eq!(
        hooks.names(),
        vec![(EngineEventName::TaskNodeStart, "proxy_C1_P1".to_string())]
    );
    assert_eq!(report.autopass.len(), 1);

    let task = engine
        .create_task(&inst, "proxy_C1_P1", "b1", "sys_auto", false)
        .await;
    let handle = report.autopass.remove(0);
    let status = with_timeout(handle.wait()).await;
    assert_eq!(status, AutoPassStatus::Completed { task_id: task.task_id.clone() });
    assert_eq!(
        engine.task(&task.task_id).await.unwrap().status,
        TaskStatus::Passed
    );
}

#[tokio::test]
async fn user_node_start_only_forwards() {
    let engine = Arc::new(MemoryEngine::new());
    let hooks = RecordingHooks::new();
    let inst = common::deploy_and_start(&engine, &condition_parallel_pair()).await;

    let report = dispatcher(&engine, &hooks)
        .handle(EngineEvent::NodeStarted {
            proc_inst_id: inst,
            node_id: "U2".to_string(),
            event: EngineEventName::TaskNodeStart,
        })
        .await
        .unwrap();
    assert!(report.autopass.is_empty());
    assert_eq!(hooks.events().len(), 1);
}

#[tokio::test]
async fn run_loop_processes_events_in_order() {
    let engine = Arc::new(MemoryEngine::new());
    let hooks = RecordingHooks::new();
    let inst = common::deploy_and_start(&engine, &condition_parallel_pair()).await;

    let options = DispatchOptions::default();
    let dispatcher = Dispatcher::new(
        Arc::clone(&engine),
        hooks.clone(),
        AutoPassOptions::default(),
        options.clone(),
    );
    let (tx, rx) = event_channel(&options);
    let (err_tx, mut err_rx) = mpsc::channel(4);
    let loop_task = tokio::spawn(dispatcher.run(rx, err_tx));

    for (node, event) in [
        ("U2", EngineEventName::TaskNodeStart),
        ("E", EngineEventName::ProcessEnd),
    ] {
        tx.send(EngineEvent::NodeStarted {
            proc_inst_id: inst.clone(),
            node_id: node.to_string(),
            event,
        })
        .await
        .unwrap();
    }
    tx.send(EngineEvent::NodeEnded {
        proc_inst_id: inst.clone(),
        node_id: "U2".to_string(),
        event: EngineEventName::TaskNodeEnd,
    })
    .await
    .unwrap();
    drop(tx);

    with_timeout(loop_task).await.unwrap();
    assert!(err_rx.recv().await.is_none());
    assert_eq!(
        hooks.names(),
        vec![
            (EngineEventName::TaskNodeStart, "U2".to_string()),
            (EngineEventName::ProcessEnd, "E".to_string()),
            (EngineEventName::TaskNodeEnd, "U2".to_string()),
        ]
    );
}
