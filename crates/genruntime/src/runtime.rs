use crate::{ExecutionCallbacks, HandlerRegistry, WorkflowExecutor};
use gencore::{
    ErrorPolicy, EventBus, ExecutionEvent, ExecutionRecord, FlowError, Workflow, WorkflowError,
    WorkflowId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Main runtime: a handler registry, an event bus and a workflow store
pub struct GenRuntime {
    registry: Arc<HandlerRegistry>,
    event_bus: Arc<EventBus>,
    workflows: Arc<RwLock<HashMap<WorkflowId, Workflow>>>,
    config: RuntimeConfig,
}

impl GenRuntime {
    /// Create a runtime with an empty registry and default settings
    pub fn new() -> Self {
        Self::with_registry(Arc::new(HandlerRegistry::new()), RuntimeConfig::default())
    }

    /// Create a runtime with a pre-populated registry
    pub fn with_registry(registry: Arc<HandlerRegistry>, config: RuntimeConfig) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        Self {
            registry,
            event_bus,
            workflows: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Store a workflow for later execution by id
    pub async fn register_workflow(&self, workflow: Workflow) -> WorkflowId {
        let id = workflow.id;
        let mut workflows = self.workflows.write().await;
        workflows.insert(id, workflow);
        id
    }

    /// Build an executor wired to this runtime's registry, event bus and policy.
    ///
    /// Keep the executor (e.g. behind an `Arc`) to poll or cancel the run.
    pub fn executor(&self, workflow: Workflow, callbacks: ExecutionCallbacks) -> WorkflowExecutor {
        let mut executor = WorkflowExecutor::new(workflow, self.registry.clone())
            .with_event_bus(self.event_bus.clone())
            .with_callbacks(callbacks);

        if let Some(policy) = self.config.error_policy {
            executor = executor.with_error_policy(policy);
        }

        executor
    }

    /// Execute a workflow directly (without registration)
    pub async fn execute(&self, workflow: &Workflow) -> Result<ExecutionRecord, FlowError> {
        let executor = self.executor(workflow.clone(), ExecutionCallbacks::default());
        Ok(executor.execute().await?)
    }

    /// Execute a registered workflow by id
    pub async fn execute_workflow(
        &self,
        workflow_id: WorkflowId,
        callbacks: ExecutionCallbacks,
    ) -> Result<ExecutionRecord, FlowError> {
        let workflow = {
            let workflows = self.workflows.read().await;
            workflows
                .get(&workflow_id)
                .cloned()
                .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?
        };

        let executor = self.executor(workflow, callbacks);
        Ok(executor.execute().await?)
    }

    /// Subscribe to execution events of every run started by this runtime
    pub fn subscribe_events(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

impl Default for GenRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    /// When set, overrides each workflow's `settings.on_error`
    pub error_policy: Option<ErrorPolicy>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            error_policy: None,
        }
    }
}
