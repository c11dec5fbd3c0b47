//! Workflow execution runtime
//!
//! This crate provides the scheduler that orders a workflow graph, the
//! handler registry, and the executor that runs nodes one at a time.

mod callbacks;
mod executor;
pub mod loader;
mod registry;
mod runtime;
pub mod schedule;

pub use callbacks::ExecutionCallbacks;
pub use executor::WorkflowExecutor;
pub use registry::{HandlerFn, HandlerRegistry};
pub use runtime::{GenRuntime, RuntimeConfig};
pub use schedule::execution_order;
