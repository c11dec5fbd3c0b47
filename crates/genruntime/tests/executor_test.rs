use gencore::{
    ErrorPolicy, ExecutionEvent, ExecutionStatus, Node, NodeError, NodeInputs, NodeResult,
    Workflow, WorkflowError, WORKFLOW_ERROR_KEY,
};
use genruntime::{ExecutionCallbacks, GenRuntime, HandlerFn, HandlerRegistry, RuntimeConfig, WorkflowExecutor};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Every handler invocation: node id and the inputs it received
type CallLog = Arc<Mutex<Vec<(String, NodeInputs)>>>;

// Registers "image" and "text" handlers that log their calls and fail for
// the node ids listed in `failing`.
fn recording_registry(log: CallLog, failing: &[&str]) -> Arc<HandlerRegistry> {
    let failing: Arc<HashSet<String>> = Arc::new(failing.iter().map(|s| s.to_string()).collect());
    let mut registry = HandlerRegistry::new();

    for tag in ["image", "text"] {
        let log = log.clone();
        let failing = failing.clone();
        registry.register(Arc::new(HandlerFn::new(tag, move |ctx| {
            let log = log.clone();
            let failing = failing.clone();
            async move {
                log.lock().unwrap().push((ctx.node.id.clone(), ctx.inputs.clone()));
                if failing.contains(&ctx.node.id) {
                    return Err(NodeError::ExecutionFailed(format!("{} exploded", ctx.node.id)));
                }
                Ok(NodeResult::new(ctx.node.node_type.clone()).with("producedBy", ctx.node.id.clone()))
            }
        })));
    }

    Arc::new(registry)
}

fn workflow(nodes: &[&str], edges: &[(&str, &str)]) -> Workflow {
    let mut workflow = Workflow::new("test");
    for id in nodes {
        workflow.add_node(Node::new(*id, "text"));
    }
    for (source, target) in edges {
        workflow.connect(*source, *target);
    }
    workflow
}

fn called(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
}

#[tokio::test]
async fn test_linear_chain_runs_in_order_without_overlap() {
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut registry = HandlerRegistry::new();
    {
        let (active, max_active, order) = (active.clone(), max_active.clone(), order.clone());
        registry.register(Arc::new(HandlerFn::new("text", move |ctx| {
            let (active, max_active, order) = (active.clone(), max_active.clone(), order.clone());
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                order.lock().unwrap().push(ctx.node.id.clone());
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(NodeResult::new("text"))
            }
        })));
    }

    let executor = WorkflowExecutor::new(workflow(&["a", "b", "c"], &[("a", "b"), ("b", "c")]), Arc::new(registry));
    let record = executor.execute().await.unwrap();

    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(record.current_step, 3);
    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_inputs_contain_only_direct_predecessors() {
    let log = CallLog::default();
    let executor = WorkflowExecutor::new(
        workflow(&["a", "b", "c"], &[("a", "b"), ("b", "c")]),
        recording_registry(log.clone(), &[]),
    );

    let record = executor.execute().await.unwrap();
    let calls = log.lock().unwrap();

    assert!(calls[0].1.is_empty());

    let b_inputs = &calls[1].1;
    assert_eq!(b_inputs.len(), 1);
    assert_eq!(b_inputs.get("a"), record.results.get("a"));

    let c_inputs = &calls[2].1;
    assert_eq!(c_inputs.len(), 1);
    assert_eq!(c_inputs.get("b"), record.results.get("b"));
}

#[tokio::test]
async fn test_diamond_join_receives_both_branches() {
    let log = CallLog::default();
    let executor = WorkflowExecutor::new(
        workflow(&["a", "b", "c", "d"], &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]),
        recording_registry(log.clone(), &[]),
    );

    let record = executor.execute().await.unwrap();
    let ids = called(&log);

    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(ids.len(), 4);
    assert_eq!(ids[3], "d");

    let calls = log.lock().unwrap();
    let mut d_sources: Vec<&String> = calls[3].1.keys().collect();
    d_sources.sort();
    assert_eq!(d_sources, vec!["b", "c"]);
}

#[tokio::test]
async fn test_stop_on_error_never_invokes_downstream() {
    let log = CallLog::default();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(AtomicUsize::new(0));

    let callbacks = {
        let (errors, completed) = (errors.clone(), completed.clone());
        ExecutionCallbacks::new()
            .on_error(move |message, node_id| {
                errors.lock().unwrap().push((message.to_string(), node_id.to_string()));
            })
            .on_complete(move |_| {
                completed.fetch_add(1, Ordering::SeqCst);
            })
    };

    let executor = WorkflowExecutor::new(
        workflow(&["a", "b", "c"], &[("a", "b"), ("b", "c")]),
        recording_registry(log.clone(), &["b"]),
    )
    .with_callbacks(callbacks);

    let record = executor.execute().await.unwrap();

    assert_eq!(record.status, ExecutionStatus::Failed);
    assert_eq!(called(&log), vec!["a", "b"]);
    assert_eq!(record.results.keys().collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(record.errors.len(), 1);
    assert_eq!(record.errors["b"], "Execution failed: b exploded");
    assert!(!record.results.contains_key("c") && !record.errors.contains_key("c"));
    assert_eq!(record.current_step, 2);

    assert_eq!(
        *errors.lock().unwrap(),
        vec![("Execution failed: b exploded".to_string(), "b".to_string())]
    );
    assert_eq!(completed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stop_on_error_skips_independent_branches_too() {
    let log = CallLog::default();
    let executor = WorkflowExecutor::new(
        workflow(&["a", "b"], &[]),
        recording_registry(log.clone(), &["a"]),
    );

    let record = executor.execute().await.unwrap();

    assert_eq!(record.status, ExecutionStatus::Failed);
    assert_eq!(called(&log), vec!["a"]);
    assert!(record.results.is_empty());
}

#[tokio::test]
async fn test_cycle_fails_before_any_handler() {
    let log = CallLog::default();
    let executor = WorkflowExecutor::new(
        workflow(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "b")]),
        recording_registry(log.clone(), &[]),
    );

    let rejected = executor.execute().await.unwrap_err();
    assert!(matches!(rejected.error, WorkflowError::CyclicDependency { .. }));

    let record = *rejected.record;
    assert_eq!(record.status, ExecutionStatus::Failed);
    assert!(record.results.is_empty());
    assert!(record.errors.is_empty());
    assert_eq!(record.current_step, 0);
    assert_eq!(record, executor.get_status());
    assert!(called(&log).is_empty());
}

#[tokio::test]
async fn test_dangling_edge_fails_before_any_handler() {
    let log = CallLog::default();
    let executor = WorkflowExecutor::new(
        workflow(&["a"], &[("a", "missing")]),
        recording_registry(log.clone(), &[]),
    );

    let rejected = executor.execute().await.unwrap_err();
    assert!(matches!(rejected.error, WorkflowError::NodeNotFound { .. }));
    assert_eq!(rejected.record.status, ExecutionStatus::Failed);
    assert!(called(&log).is_empty());
}

#[tokio::test]
async fn test_reserved_node_id_is_rejected_before_any_handler() {
    let log = CallLog::default();
    let executor = WorkflowExecutor::new(
        workflow(&["a", WORKFLOW_ERROR_KEY], &[("a", WORKFLOW_ERROR_KEY)]),
        recording_registry(log.clone(), &[WORKFLOW_ERROR_KEY]),
    );

    let rejected = executor.execute().await.unwrap_err();
    assert!(matches!(rejected.error, WorkflowError::Invalid(_)));
    assert_eq!(rejected.record.status, ExecutionStatus::Failed);
    assert!(rejected.record.results.is_empty());
    assert!(rejected.record.errors.is_empty());
    assert!(!rejected.record.is_cancelled());
    assert!(called(&log).is_empty());
}

#[tokio::test]
async fn test_node_failure_is_not_reported_as_cancellation() {
    let log = CallLog::default();
    let executor = WorkflowExecutor::new(
        workflow(&["a", "b"], &[("a", "b")]),
        recording_registry(log.clone(), &["a"]),
    );

    let record = executor.execute().await.unwrap();

    assert_eq!(record.status, ExecutionStatus::Failed);
    assert!(!record.is_cancelled());
    assert!(!record.errors.contains_key(WORKFLOW_ERROR_KEY));
    assert_eq!(called(&log), vec!["a"]);
}

#[tokio::test]
async fn test_isolated_node_runs_with_empty_inputs() {
    let log = CallLog::default();
    let progress = Arc::new(Mutex::new(Vec::new()));
    let callbacks = {
        let progress = progress.clone();
        ExecutionCallbacks::new().on_progress(move |step, total, node_id| {
            progress.lock().unwrap().push((step, total, node_id.to_string()));
        })
    };

    let executor = WorkflowExecutor::new(workflow(&["solo"], &[]), recording_registry(log.clone(), &[]))
        .with_callbacks(callbacks);
    let record = executor.execute().await.unwrap();

    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(called(&log), vec!["solo"]);
    assert!(log.lock().unwrap()[0].1.is_empty());
    assert_eq!(*progress.lock().unwrap(), vec![(1, 1, "solo".to_string())]);
}

#[tokio::test]
async fn test_unknown_node_type_is_a_node_error() {
    let log = CallLog::default();
    let mut workflow = workflow(&["a"], &[]);
    workflow.add_node(Node::new("holo", "hologram"));
    workflow.connect("a", "holo");

    let executor = WorkflowExecutor::new(workflow, recording_registry(log.clone(), &[]));
    let record = executor.execute().await.unwrap();

    assert_eq!(record.status, ExecutionStatus::Failed);
    assert_eq!(record.errors["holo"], "Unknown node type: hologram");
    assert!(record.results.contains_key("a"));
}

#[tokio::test]
async fn test_progress_and_completion_callbacks() {
    let log = CallLog::default();
    let progress = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(Mutex::new(Vec::new()));

    let callbacks = {
        let (progress, completed) = (progress.clone(), completed.clone());
        ExecutionCallbacks::new()
            .on_progress(move |step, total, node_id| {
                progress.lock().unwrap().push((step, total, node_id.to_string()));
            })
            .on_complete(move |results| {
                let mut ids: Vec<String> = results.keys().cloned().collect();
                ids.sort();
                completed.lock().unwrap().push(ids);
            })
    };

    let executor = WorkflowExecutor::new(
        workflow(&["a", "b"], &[("a", "b")]),
        recording_registry(log, &[]),
    )
    .with_callbacks(callbacks);
    executor.execute().await.unwrap();

    assert_eq!(
        *progress.lock().unwrap(),
        vec![(1, 2, "a".to_string()), (2, 2, "b".to_string())]
    );
    assert_eq!(*completed.lock().unwrap(), vec![vec!["a".to_string(), "b".to_string()]]);
}

#[tokio::test]
async fn test_status_snapshot_is_isolated() {
    let executor = WorkflowExecutor::new(
        workflow(&["a"], &[]),
        recording_registry(CallLog::default(), &[]),
    );
    executor.execute().await.unwrap();

    let mut snapshot = executor.get_status();
    snapshot.status = ExecutionStatus::Pending;
    snapshot.results.clear();
    snapshot.errors.insert("a".to_string(), "tampered".to_string());

    let fresh = executor.get_status();
    assert_eq!(fresh.status, ExecutionStatus::Completed);
    assert!(fresh.results.contains_key("a"));
    assert!(fresh.errors.is_empty());
}

#[tokio::test]
async fn test_continue_policy_runs_independent_branches() {
    let log = CallLog::default();
    let completed = Arc::new(AtomicUsize::new(0));
    let callbacks = {
        let completed = completed.clone();
        ExecutionCallbacks::new().on_complete(move |_| {
            completed.fetch_add(1, Ordering::SeqCst);
        })
    };

    // a -> b -> c -> e, a -> d
    let workflow = workflow(
        &["a", "b", "c", "d", "e"],
        &[("a", "b"), ("b", "c"), ("a", "d"), ("c", "e")],
    )
    .with_error_policy(ErrorPolicy::ContinueIndependentBranches);

    let executor = WorkflowExecutor::new(workflow, recording_registry(log.clone(), &["b"]))
        .with_callbacks(callbacks);
    let record = executor.execute().await.unwrap();

    assert_eq!(record.status, ExecutionStatus::Completed);
    let mut results: Vec<&String> = record.results.keys().collect();
    results.sort();
    assert_eq!(results, vec!["a", "d"]);
    assert_eq!(record.errors.keys().collect::<Vec<_>>(), vec!["b"]);
    assert_eq!(record.skipped, vec!["c", "e"]);
    assert_eq!(record.current_step, 5);

    let invoked = called(&log);
    assert!(!invoked.contains(&"c".to_string()));
    assert!(!invoked.contains(&"e".to_string()));
    assert_eq!(completed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_during_inflight_handler_stops_before_next_node() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let invoked = Arc::new(Mutex::new(Vec::new()));

    let mut registry = HandlerRegistry::new();
    {
        let (started, release, invoked) = (started.clone(), release.clone(), invoked.clone());
        registry.register(Arc::new(HandlerFn::new("text", move |ctx| {
            let (started, release, invoked) = (started.clone(), release.clone(), invoked.clone());
            async move {
                invoked.lock().unwrap().push(ctx.node.id.clone());
                if ctx.node.id == "slow" {
                    started.notify_one();
                    release.notified().await;
                }
                Ok(NodeResult::new("text"))
            }
        })));
    }

    let executor = Arc::new(WorkflowExecutor::new(
        workflow(&["slow", "next"], &[("slow", "next")]),
        Arc::new(registry),
    ));

    let handle = {
        let executor = executor.clone();
        tokio::spawn(async move { executor.execute().await })
    };

    started.notified().await;
    executor.cancel();

    let during = executor.get_status();
    assert_eq!(during.status, ExecutionStatus::Failed);
    assert_eq!(during.errors[WORKFLOW_ERROR_KEY], "Workflow cancelled");

    release.notify_one();
    let record = handle.await.unwrap().unwrap();

    assert_eq!(record.status, ExecutionStatus::Failed);
    assert!(record.is_cancelled());
    assert!(record.results.keys().all(|id| !record.errors.contains_key(id)));
    assert_eq!(*invoked.lock().unwrap(), vec!["slow"]);
    assert!(!record.results.contains_key("next"));
}

#[tokio::test]
async fn test_cancelled_executor_does_not_run_again() {
    let log = CallLog::default();
    let executor = WorkflowExecutor::new(workflow(&["a"], &[]), recording_registry(log.clone(), &[]));

    executor.cancel();
    let record = executor.execute().await.unwrap();

    assert_eq!(record.status, ExecutionStatus::Failed);
    assert!(record.is_cancelled());
    assert!(called(&log).is_empty());
}

#[tokio::test]
async fn test_watch_receiver_observes_final_record() {
    let executor = WorkflowExecutor::new(
        workflow(&["a", "b"], &[("a", "b")]),
        recording_registry(CallLog::default(), &[]),
    );
    let mut rx = executor.subscribe();

    executor.execute().await.unwrap();

    assert!(rx.has_changed().unwrap());
    let record = rx.borrow_and_update().clone();
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(record.results.len(), 2);
}

#[tokio::test]
async fn test_runtime_emits_events_and_applies_policy_override() {
    let log = CallLog::default();
    let config = RuntimeConfig {
        error_policy: Some(ErrorPolicy::ContinueIndependentBranches),
        ..RuntimeConfig::default()
    };
    let runtime = GenRuntime::with_registry(recording_registry(log.clone(), &["a"]), config);
    let mut events = runtime.subscribe_events();

    let id = runtime
        .register_workflow(workflow(&["a", "b", "solo"], &[("a", "b")]))
        .await;
    let record = runtime
        .execute_workflow(id, ExecutionCallbacks::default())
        .await
        .unwrap();

    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(record.skipped, vec!["b"]);
    assert!(record.results.contains_key("solo"));

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(match event {
            ExecutionEvent::WorkflowStarted { .. } => "started".to_string(),
            ExecutionEvent::NodeStarted { node_id, .. } => format!("node_started:{}", node_id),
            ExecutionEvent::NodeCompleted { node_id, .. } => format!("node_completed:{}", node_id),
            ExecutionEvent::NodeFailed { node_id, .. } => format!("node_failed:{}", node_id),
            ExecutionEvent::NodeSkipped { node_id, .. } => format!("node_skipped:{}", node_id),
            ExecutionEvent::WorkflowFinished { status, .. } => format!("finished:{:?}", status),
            other => format!("{:?}", other),
        });
    }

    assert_eq!(
        kinds,
        vec![
            "started",
            "node_started:a",
            "node_failed:a",
            "node_started:solo",
            "node_completed:solo",
            "node_skipped:b",
            "finished:Completed",
        ]
    );
}

#[tokio::test]
async fn test_runtime_rejects_unknown_workflow_id() {
    let runtime = GenRuntime::new();
    let err = runtime
        .execute_workflow(Workflow::new("unregistered").id, ExecutionCallbacks::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Workflow not found"));
}
