use crate::{events::EventEmitter, Node, NodeError, NodeId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

/// Results of a node's predecessors, keyed by predecessor id
pub type NodeInputs = HashMap<NodeId, NodeResult>;

/// Core trait implemented by every generation backend
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// Type tag this handler serves (e.g. "image", "video")
    fn node_type(&self) -> &str;

    /// Execute one node with the results of its predecessors
    async fn execute(&self, ctx: NodeContext) -> Result<NodeResult, NodeError>;

    /// Optional: human-readable description for listings
    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata::default()
    }
}

/// Everything a handler gets for one invocation
#[derive(Clone)]
pub struct NodeContext {
    /// The node being executed
    pub node: Node,

    /// Recorded results of predecessor nodes. A predecessor without a
    /// result is absent rather than defaulted.
    pub inputs: NodeInputs,

    /// Event emitter scoped to this node
    pub events: EventEmitter,

    /// Fires when the run is cancelled
    pub cancellation: CancellationToken,
}

impl NodeContext {
    pub fn new(node: Node, inputs: NodeInputs, events: EventEmitter) -> Self {
        Self {
            node,
            inputs,
            events,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node.id
    }

    /// Result of a specific predecessor or `MissingInput`
    pub fn require_input(&self, source: &str) -> Result<&NodeResult, NodeError> {
        self.inputs
            .get(source)
            .ok_or_else(|| NodeError::MissingInput(source.to_string()))
    }

    /// Predecessor results of a given type, ordered by source id
    pub fn inputs_of_type(&self, kind: NodeKind) -> Vec<&NodeResult> {
        let mut matching: Vec<(&NodeId, &NodeResult)> = self
            .inputs
            .iter()
            .filter(|(_, r)| r.result_type == kind.as_str())
            .collect();
        matching.sort_by(|a, b| a.0.cmp(b.0));
        matching.into_iter().map(|(_, r)| r).collect()
    }
}

/// Tagged output of a handler: `{ "type": <tag>, ...payload }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    #[serde(rename = "type")]
    pub result_type: String,

    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl NodeResult {
    pub fn new(result_type: impl Into<String>) -> Self {
        Self {
            result_type: result_type.into(),
            payload: serde_json::Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }
}

/// Listing information about a handler
#[derive(Debug, Clone)]
pub struct HandlerMetadata {
    pub description: String,
    pub category: String,
}

impl Default for HandlerMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
        }
    }
}

/// The built-in generation modalities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Image,
    Video,
    Audio,
    Code,
    Model,
    Text,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Image,
        NodeKind::Video,
        NodeKind::Audio,
        NodeKind::Code,
        NodeKind::Model,
        NodeKind::Text,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Image => "image",
            NodeKind::Video => "video",
            NodeKind::Audio => "audio",
            NodeKind::Code => "code",
            NodeKind::Model => "model",
            NodeKind::Text => "text",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| NodeError::UnknownNodeType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_serializes_flat_with_type_tag() {
        let result = NodeResult::new("image").with("url", "mock://image/a.png");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "type": "image", "url": "mock://image/a.png" })
        );
    }

    #[test]
    fn node_kind_parses_known_tags_only() {
        assert_eq!("model".parse::<NodeKind>().unwrap(), NodeKind::Model);
        assert_eq!(
            "hologram".parse::<NodeKind>(),
            Err(NodeError::UnknownNodeType("hologram".to_string()))
        );
    }
}
