use gencore::{NodeId, NodeResult};
use std::collections::HashMap;
use std::sync::Arc;

type ProgressFn = dyn Fn(usize, usize, &str) + Send + Sync;
type CompleteFn = dyn Fn(&HashMap<NodeId, NodeResult>) + Send + Sync;
type ErrorFn = dyn Fn(&str, &str) + Send + Sync;

/// Optional observers invoked synchronously by the executor
#[derive(Clone, Default)]
pub struct ExecutionCallbacks {
    on_progress: Option<Arc<ProgressFn>>,
    on_complete: Option<Arc<CompleteFn>>,
    on_error: Option<Arc<ErrorFn>>,
}

impl ExecutionCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called before each node with `(step, total, node_id)`, `step` starting at 1
    pub fn on_progress(mut self, f: impl Fn(usize, usize, &str) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    /// Called once with all results when a run completes
    pub fn on_complete(
        mut self,
        f: impl Fn(&HashMap<NodeId, NodeResult>) + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }

    /// Called with `(message, node_id)` for every failed node
    pub fn on_error(mut self, f: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub(crate) fn progress(&self, step: usize, total: usize, node_id: &str) {
        if let Some(f) = &self.on_progress {
            f(step, total, node_id);
        }
    }

    pub(crate) fn complete(&self, results: &HashMap<NodeId, NodeResult>) {
        if let Some(f) = &self.on_complete {
            f(results);
        }
    }

    pub(crate) fn error(&self, message: &str, node_id: &str) {
        if let Some(f) = &self.on_error {
            f(message, node_id);
        }
    }
}
