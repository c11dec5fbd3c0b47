use crate::{ExecutionRecord, NodeId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Execution rejected: {0}")]
    Rejected(#[from] ExecutionRejected),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of a single node. Recorded in the execution record, never
/// returned from `execute()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input '{field}': expected {expected}, got {actual}")]
    InvalidInput {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Structural problems with a workflow graph. Raised before any node runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Invalid workflow: {0}")]
    Invalid(String),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("Edge '{edge}' references unknown node: {node}")]
    NodeNotFound { edge: String, node: NodeId },

    #[error("Cyclic or unschedulable graph: {} node(s) could not be ordered ({})", .unscheduled.len(), .unscheduled.join(", "))]
    CyclicDependency { unscheduled: Vec<NodeId> },
}

/// A run refused before any node executed. Carries the failed record.
#[derive(Error, Debug, Clone)]
#[error("{error}")]
pub struct ExecutionRejected {
    #[source]
    pub error: WorkflowError,
    pub record: Box<ExecutionRecord>,
}
