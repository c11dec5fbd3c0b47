use crate::{Edge, Node, NodeId, NodeResult, Workflow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Key under which run-level (not node-level) errors are recorded.
/// Reserved: no node may use it as its id.
pub const WORKFLOW_ERROR_KEY: &str = "workflow";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

/// State of one run. A node id appears in at most one of `results`,
/// `errors` and `skipped`, and only after the executor reached it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub status: ExecutionStatus,
    pub current_step: usize,
    pub results: HashMap<NodeId, NodeResult>,
    pub errors: HashMap<String, String>,
    #[serde(default)]
    pub skipped: Vec<NodeId>,
    #[serde(default)]
    pub cancelled: bool,
}

impl ExecutionRecord {
    pub fn new(workflow: &Workflow) -> Self {
        Self {
            id: Uuid::new_v4(),
            nodes: workflow.nodes.clone(),
            edges: workflow.edges.clone(),
            status: ExecutionStatus::Pending,
            current_step: 0,
            results: HashMap::new(),
            errors: HashMap::new(),
            skipped: Vec::new(),
            cancelled: false,
        }
    }

    pub fn total_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}
