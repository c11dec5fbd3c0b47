//! Topological ordering of workflow graphs (Kahn's algorithm)

use gencore::{Edge, Node, NodeId, WorkflowError, WORKFLOW_ERROR_KEY};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};

/// Build a dependency graph (`source -> target`) from a workflow's nodes and edges.
///
/// Duplicate node ids, the reserved id [`WORKFLOW_ERROR_KEY`] and edges
/// with a missing endpoint are rejected.
pub fn build_graph<'a>(
    nodes: &'a [Node],
    edges: &'a [Edge],
) -> Result<DiGraph<&'a str, ()>, WorkflowError> {
    let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
    let mut node_to_index: HashMap<&str, NodeIndex> = HashMap::with_capacity(nodes.len());

    for node in nodes {
        if node.id == WORKFLOW_ERROR_KEY {
            return Err(WorkflowError::Invalid(format!(
                "node id '{}' is reserved for run-level errors",
                WORKFLOW_ERROR_KEY
            )));
        }
        let idx = graph.add_node(node.id.as_str());
        if node_to_index.insert(node.id.as_str(), idx).is_some() {
            return Err(WorkflowError::DuplicateNode(node.id.clone()));
        }
    }

    for edge in edges {
        let lookup = |id: &NodeId| {
            node_to_index
                .get(id.as_str())
                .copied()
                .ok_or_else(|| WorkflowError::NodeNotFound {
                    edge: edge.id.clone(),
                    node: id.clone(),
                })
        };
        let from_idx = lookup(&edge.source)?;
        let to_idx = lookup(&edge.target)?;
        graph.add_edge(from_idx, to_idx, ());
    }

    Ok(graph)
}

/// Compute an order in which every node comes after all of its sources.
///
/// Nodes that become ready at the same time keep their declaration order.
/// Fails with `CyclicDependency` when some nodes can never become ready;
/// nothing is executed in that case.
pub fn execution_order(nodes: &[Node], edges: &[Edge]) -> Result<Vec<NodeId>, WorkflowError> {
    let graph = build_graph(nodes, edges)?;

    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|idx| graph.edges_directed(idx, Direction::Incoming).count())
        .collect();

    let mut queue: VecDeque<NodeIndex> = graph
        .node_indices()
        .filter(|idx| in_degree[idx.index()] == 0)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());

    while let Some(idx) = queue.pop_front() {
        order.push(graph[idx].to_string());

        // petgraph yields neighbours newest-edge first
        let mut targets: Vec<NodeIndex> = graph.neighbors_directed(idx, Direction::Outgoing).collect();
        targets.reverse();

        for target in targets {
            let degree = &mut in_degree[target.index()];
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(target);
            }
        }
    }

    if order.len() < graph.node_count() {
        let unscheduled: Vec<NodeId> = graph
            .node_indices()
            .filter(|idx| in_degree[idx.index()] > 0)
            .map(|idx| graph[idx].to_string())
            .collect();
        tracing::warn!(
            scheduled = order.len(),
            total = graph.node_count(),
            "workflow graph cannot be ordered"
        );
        return Err(WorkflowError::CyclicDependency { unscheduled });
    }

    Ok(order)
}
