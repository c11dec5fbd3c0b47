use crate::callbacks::ExecutionCallbacks;
use crate::registry::HandlerRegistry;
use crate::schedule;
use chrono::Utc;
use gencore::{
    ErrorPolicy, EventBus, ExecutionEvent, ExecutionId, ExecutionRecord, ExecutionRejected,
    ExecutionStatus, Node, NodeContext, NodeError, NodeInputs, NodeResult, Workflow,
    WORKFLOW_ERROR_KEY,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

const CANCELLED_MESSAGE: &str = "Workflow cancelled";

/// Runs one workflow sequentially in topological order.
///
/// The execution record is owned by the executor and published through a
/// `watch` channel; every state transition is applied in a single
/// `send_modify`, and readers only ever see clones.
pub struct WorkflowExecutor {
    workflow: Workflow,
    registry: Arc<HandlerRegistry>,
    event_bus: Arc<EventBus>,
    callbacks: ExecutionCallbacks,
    policy: ErrorPolicy,
    state: watch::Sender<ExecutionRecord>,
    cancellation: CancellationToken,
}

impl WorkflowExecutor {
    pub fn new(workflow: Workflow, registry: Arc<HandlerRegistry>) -> Self {
        let (state, _) = watch::channel(ExecutionRecord::new(&workflow));
        let policy = workflow.settings.on_error;
        Self {
            workflow,
            registry,
            event_bus: Arc::new(EventBus::default()),
            callbacks: ExecutionCallbacks::default(),
            policy,
            state,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_callbacks(mut self, callbacks: ExecutionCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Override the workflow's own error policy
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Snapshot of the current execution record
    pub fn get_status(&self) -> ExecutionRecord {
        self.state.borrow().clone()
    }

    /// Watch the execution record instead of polling `get_status`
    pub fn subscribe(&self) -> watch::Receiver<ExecutionRecord> {
        self.state.subscribe()
    }

    /// Mark the run failed and ask it to stop.
    ///
    /// An in-flight handler is not interrupted (it may observe its
    /// cancellation token); the executor stops before the next node.
    /// Cancellation is permanent for this executor.
    pub fn cancel(&self) {
        self.cancellation.cancel();
        self.state.send_modify(|record| {
            record.status = ExecutionStatus::Failed;
            record.cancelled = true;
            record
                .errors
                .insert(WORKFLOW_ERROR_KEY.to_string(), CANCELLED_MESSAGE.to_string());
        });

        let execution_id = self.state.borrow().id;
        tracing::warn!(%execution_id, "Workflow {} cancelled", self.workflow.id);
        self.event_bus.emit(ExecutionEvent::WorkflowCancelled {
            execution_id,
            timestamp: Utc::now(),
        });
    }

    /// Execute the workflow and return the final record.
    ///
    /// Node failures are reported through the record, never as `Err`.
    /// `Err` is only returned for structural problems (cycles, dangling
    /// edges, duplicate or reserved ids), in which case no handler has been
    /// invoked and the carried record is `failed` with no results or errors.
    pub async fn execute(&self) -> Result<ExecutionRecord, ExecutionRejected> {
        let record = ExecutionRecord::new(&self.workflow);
        let execution_id = record.id;
        let start_time = Instant::now();
        self.state.send_replace(record);

        self.event_bus.emit(ExecutionEvent::WorkflowStarted {
            execution_id,
            workflow_id: self.workflow.id,
            total_nodes: self.workflow.nodes.len(),
            timestamp: Utc::now(),
        });

        let order = match schedule::execution_order(&self.workflow.nodes, &self.workflow.edges) {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(%execution_id, "Workflow {} rejected: {}", self.workflow.id, e);
                self.transition(ExecutionStatus::Failed);
                let record = self.finish(execution_id, start_time);
                return Err(ExecutionRejected {
                    error: e,
                    record: Box::new(record),
                });
            }
        };

        let total = order.len();
        // every scheduled id comes from `self.workflow.nodes`
        let nodes: HashMap<&str, &Node> = self
            .workflow
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n))
            .collect();

        self.transition(ExecutionStatus::Running);
        tracing::info!(
            %execution_id,
            total,
            policy = ?self.policy,
            "Starting workflow execution: {}",
            self.workflow.id
        );

        // Failed or skipped nodes whose dependents must not run
        let mut blocked: HashSet<&str> = HashSet::new();

        for (index, node_id) in order.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                return Ok(self.stop_cancelled(execution_id, start_time));
            }

            let step = index + 1;
            let node = nodes[node_id.as_str()];
            self.state.send_modify(|record| record.current_step = step);

            if self.policy == ErrorPolicy::ContinueIndependentBranches
                && self
                    .workflow
                    .incoming_edges(node_id)
                    .any(|e| blocked.contains(e.source.as_str()))
            {
                tracing::warn!(%execution_id, "Skipping node {}: upstream failure", node_id);
                blocked.insert(node_id.as_str());
                self.state.send_modify(|record| record.skipped.push(node_id.clone()));
                self.event_bus.emit(ExecutionEvent::NodeSkipped {
                    execution_id,
                    node_id: node_id.clone(),
                    timestamp: Utc::now(),
                });
                continue;
            }

            self.callbacks.progress(step, total, node_id);
            self.event_bus.emit(ExecutionEvent::NodeStarted {
                execution_id,
                node_id: node_id.clone(),
                node_type: node.node_type.clone(),
                step,
                total,
                timestamp: Utc::now(),
            });
            tracing::debug!(%execution_id, step, total, "Executing node {} ({})", node_id, node.node_type);

            let inputs = self.collect_inputs(node_id);
            let started = Instant::now();
            let outcome = self.run_node(node, inputs, execution_id).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(result) => {
                    tracing::info!("Node {} completed in {}ms", node_id, duration_ms);
                    self.state.send_modify(|record| {
                        record.results.insert(node_id.clone(), result);
                    });
                    self.event_bus.emit(ExecutionEvent::NodeCompleted {
                        execution_id,
                        node_id: node_id.clone(),
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::error!("Node {} failed: {}", node_id, message);
                    self.state.send_modify(|record| {
                        record.errors.insert(node_id.clone(), message.clone());
                    });
                    self.callbacks.error(&message, node_id);
                    self.event_bus.emit(ExecutionEvent::NodeFailed {
                        execution_id,
                        node_id: node_id.clone(),
                        error: message,
                        timestamp: Utc::now(),
                    });

                    match self.policy {
                        ErrorPolicy::StopAll => {
                            self.transition(ExecutionStatus::Failed);
                            return Ok(self.finish(execution_id, start_time));
                        }
                        ErrorPolicy::ContinueIndependentBranches => {
                            blocked.insert(node_id.as_str());
                        }
                    }
                }
            }
        }

        if self.cancellation.is_cancelled() {
            return Ok(self.stop_cancelled(execution_id, start_time));
        }

        if self.transition(ExecutionStatus::Completed) {
            let results = self.state.borrow().results.clone();
            self.callbacks.complete(&results);
        }

        Ok(self.finish(execution_id, start_time))
    }

    /// Results of `node_id`'s predecessors that produced one
    fn collect_inputs(&self, node_id: &str) -> NodeInputs {
        let record = self.state.borrow();
        self.workflow
            .incoming_edges(node_id)
            .filter_map(|edge| {
                record
                    .results
                    .get(&edge.source)
                    .map(|result| (edge.source.clone(), result.clone()))
            })
            .collect()
    }

    async fn run_node(
        &self,
        node: &Node,
        inputs: NodeInputs,
        execution_id: ExecutionId,
    ) -> Result<NodeResult, NodeError> {
        let handler = self.registry.resolve(&node.node_type)?;

        let ctx = NodeContext {
            node: node.clone(),
            inputs,
            events: self.event_bus.create_emitter(execution_id, node.id.clone()),
            cancellation: self.cancellation.child_token(),
        };

        handler.execute(ctx).await
    }

    /// Move to `status` unless the run already ended. Returns whether it changed.
    fn transition(&self, status: ExecutionStatus) -> bool {
        self.state.send_if_modified(|record| {
            if record.status.is_terminal() || record.status == status {
                return false;
            }
            record.status = status;
            true
        })
    }

    fn stop_cancelled(&self, execution_id: ExecutionId, start_time: Instant) -> ExecutionRecord {
        self.state.send_modify(|record| {
            record.status = ExecutionStatus::Failed;
            record.cancelled = true;
            record
                .errors
                .entry(WORKFLOW_ERROR_KEY.to_string())
                .or_insert_with(|| CANCELLED_MESSAGE.to_string());
        });
        self.finish(execution_id, start_time)
    }

    fn finish(&self, execution_id: ExecutionId, start_time: Instant) -> ExecutionRecord {
        let snapshot = self.get_status();
        let duration_ms = start_time.elapsed().as_millis() as u64;

        tracing::info!(
            %execution_id,
            status = ?snapshot.status,
            completed = snapshot.results.len(),
            failed = snapshot.errors.len(),
            "Workflow execution finished in {}ms",
            duration_ms
        );

        self.event_bus.emit(ExecutionEvent::WorkflowFinished {
            execution_id,
            status: snapshot.status,
            duration_ms,
            timestamp: Utc::now(),
        });

        snapshot
    }
}
