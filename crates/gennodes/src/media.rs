use crate::common::{mock_url, parse_config, resolve_prompt, simulate_latency};
use async_trait::async_trait;
use gencore::{HandlerMetadata, NodeContext, NodeError, NodeHandler, NodeKind, NodeResult};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ImageConfig {
    prompt: Option<String>,
    width: u32,
    height: u32,
    latency_ms: Option<u64>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            prompt: None,
            width: 1024,
            height: 1024,
            latency_ms: None,
        }
    }
}

/// Mock image generation
pub struct ImageHandler;

#[async_trait]
impl NodeHandler for ImageHandler {
    fn node_type(&self) -> &str {
        NodeKind::Image.as_str()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeResult, NodeError> {
        let config: ImageConfig = parse_config(&ctx)?;
        let prompt = resolve_prompt(config.prompt.as_deref(), &ctx).unwrap_or_default();

        simulate_latency(&ctx, config.latency_ms).await?;
        ctx.events.progress(100.0, Some(format!("{}x{} image ready", config.width, config.height)));

        Ok(NodeResult::new(NodeKind::Image.as_str())
            .with("url", mock_url(NodeKind::Image, ctx.node_id(), "png"))
            .with("prompt", prompt)
            .with("width", config.width)
            .with("height", config.height))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Generate an image from a prompt".to_string(),
            category: "media".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VideoConfig {
    prompt: Option<String>,
    duration_secs: f64,
    latency_ms: Option<u64>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            prompt: None,
            duration_secs: 5.0,
            latency_ms: None,
        }
    }
}

/// Mock video generation; animates an upstream image when there is one
pub struct VideoHandler;

#[async_trait]
impl NodeHandler for VideoHandler {
    fn node_type(&self) -> &str {
        NodeKind::Video.as_str()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeResult, NodeError> {
        let config: VideoConfig = parse_config(&ctx)?;
        if config.duration_secs <= 0.0 {
            return Err(NodeError::Configuration(format!(
                "durationSecs must be positive, got {}",
                config.duration_secs
            )));
        }

        let prompt = resolve_prompt(config.prompt.as_deref(), &ctx).unwrap_or_default();
        let source_image = ctx
            .inputs_of_type(NodeKind::Image)
            .first()
            .and_then(|r| r.get_str("url"))
            .map(str::to_string);

        simulate_latency(&ctx, config.latency_ms).await?;

        Ok(NodeResult::new(NodeKind::Video.as_str())
            .with("url", mock_url(NodeKind::Video, ctx.node_id(), "mp4"))
            .with("prompt", prompt)
            .with("durationSecs", config.duration_secs)
            .with("sourceImage", source_image))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Generate a video clip, optionally from an image".to_string(),
            category: "media".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AudioConfig {
    prompt: Option<String>,
    duration_secs: f64,
    voice: String,
    latency_ms: Option<u64>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            prompt: None,
            duration_secs: 10.0,
            voice: "narrator".to_string(),
            latency_ms: None,
        }
    }
}

/// Mock speech / music generation
pub struct AudioHandler;

#[async_trait]
impl NodeHandler for AudioHandler {
    fn node_type(&self) -> &str {
        NodeKind::Audio.as_str()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeResult, NodeError> {
        let config: AudioConfig = parse_config(&ctx)?;
        let prompt = resolve_prompt(config.prompt.as_deref(), &ctx).unwrap_or_default();

        simulate_latency(&ctx, config.latency_ms).await?;

        Ok(NodeResult::new(NodeKind::Audio.as_str())
            .with("url", mock_url(NodeKind::Audio, ctx.node_id(), "mp3"))
            .with("prompt", prompt)
            .with("durationSecs", config.duration_secs)
            .with("voice", config.voice))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Generate narration or music".to_string(),
            category: "media".to_string(),
        }
    }
}
