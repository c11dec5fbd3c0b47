use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use gencore::{HandlerMetadata, NodeContext, NodeError, NodeHandler, NodeResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Registry mapping node type tags to the handlers that execute them
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn NodeHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under its own type tag, replacing any previous one
    pub fn register(&mut self, handler: Arc<dyn NodeHandler>) {
        let node_type = handler.node_type().to_string();
        tracing::info!("Registering handler for node type: {}", node_type);
        if self.handlers.insert(node_type.clone(), handler).is_some() {
            tracing::warn!("Replaced existing handler for node type: {}", node_type);
        }
    }

    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.get(node_type).cloned()
    }

    /// Look up the handler for a type tag
    pub fn resolve(&self, node_type: &str) -> Result<Arc<dyn NodeHandler>, NodeError> {
        self.get(node_type)
            .ok_or_else(|| NodeError::UnknownNodeType(node_type.to_string()))
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.handlers.contains_key(node_type)
    }

    /// All registered type tags, sorted
    pub fn list_node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn get_metadata(&self, node_type: &str) -> Option<HandlerMetadata> {
        self.handlers.get(node_type).map(|h| h.metadata())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

type HandlerFuture = BoxFuture<'static, Result<NodeResult, NodeError>>;

/// Adapts an async closure into a [`NodeHandler`]
pub struct HandlerFn {
    node_type: String,
    metadata: HandlerMetadata,
    func: Box<dyn Fn(NodeContext) -> HandlerFuture + Send + Sync>,
}

impl HandlerFn {
    pub fn new<F, Fut>(node_type: impl Into<String>, func: F) -> Self
    where
        F: Fn(NodeContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NodeResult, NodeError>> + Send + 'static,
    {
        Self {
            node_type: node_type.into(),
            metadata: HandlerMetadata::default(),
            func: Box::new(move |ctx| func(ctx).boxed()),
        }
    }

    pub fn with_metadata(mut self, metadata: HandlerMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[async_trait]
impl NodeHandler for HandlerFn {
    fn node_type(&self) -> &str {
        &self.node_type
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeResult, NodeError> {
        (self.func)(ctx).await
    }

    fn metadata(&self) -> HandlerMetadata {
        self.metadata.clone()
    }
}
