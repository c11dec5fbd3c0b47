//! Core abstractions for the generation workflow engine
//!
//! This crate provides the graph model, the handler contract, the
//! execution record and the event types. It does not schedule or run
//! anything itself.

mod error;
pub mod events;
mod node;
mod record;
mod workflow;

pub use error::{ExecutionRejected, FlowError, NodeError, WorkflowError};
pub use events::*;
pub use node::{HandlerMetadata, NodeContext, NodeHandler, NodeInputs, NodeKind, NodeResult};
pub use record::{ExecutionId, ExecutionRecord, ExecutionStatus, WORKFLOW_ERROR_KEY};
pub use workflow::{Edge, ErrorPolicy, Node, NodeId, Position, Workflow, WorkflowId, WorkflowSettings};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
