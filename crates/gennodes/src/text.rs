use crate::common::{parse_config, resolve_prompt, simulate_latency};
use async_trait::async_trait;
use gencore::{HandlerMetadata, NodeContext, NodeError, NodeHandler, NodeKind, NodeResult};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TextConfig {
    prompt: Option<String>,
    latency_ms: Option<u64>,
}

/// Mock text generation. Needs a prompt, either its own or from upstream text.
pub struct TextHandler;

#[async_trait]
impl NodeHandler for TextHandler {
    fn node_type(&self) -> &str {
        NodeKind::Text.as_str()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeResult, NodeError> {
        let config: TextConfig = parse_config(&ctx)?;
        let prompt = resolve_prompt(config.prompt.as_deref(), &ctx)
            .ok_or_else(|| NodeError::MissingInput("prompt".to_string()))?;

        simulate_latency(&ctx, config.latency_ms).await?;
        tracing::debug!("Text node {} generated from {} chars of prompt", ctx.node_id(), prompt.len());

        Ok(NodeResult::new(NodeKind::Text.as_str()).with("content", format!("Generated text for: {}", prompt)))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Generate text from a prompt".to_string(),
            category: "text".to_string(),
        }
    }
}
