use crate::common::{mock_url, parse_config, resolve_prompt, simulate_latency};
use async_trait::async_trait;
use gencore::{HandlerMetadata, NodeContext, NodeError, NodeHandler, NodeKind, NodeResult};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ModelConfig {
    prompt: Option<String>,
    latency_ms: Option<u64>,
}

/// Mock 3-D model generation (GLB output)
pub struct ModelHandler;

#[async_trait]
impl NodeHandler for ModelHandler {
    fn node_type(&self) -> &str {
        NodeKind::Model.as_str()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeResult, NodeError> {
        let config: ModelConfig = parse_config(&ctx)?;
        let prompt = resolve_prompt(config.prompt.as_deref(), &ctx).unwrap_or_default();

        simulate_latency(&ctx, config.latency_ms).await?;

        Ok(NodeResult::new(NodeKind::Model.as_str())
            .with("url", mock_url(NodeKind::Model, ctx.node_id(), "glb"))
            .with("format", "glb")
            .with("prompt", prompt))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Generate a 3-D model".to_string(),
            category: "3d".to_string(),
        }
    }
}
