use crate::common::{parse_config, resolve_prompt, simulate_latency};
use async_trait::async_trait;
use gencore::{HandlerMetadata, NodeContext, NodeError, NodeHandler, NodeKind, NodeResult};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CodeConfig {
    prompt: Option<String>,
    language: String,
    latency_ms: Option<u64>,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            prompt: None,
            language: "typescript".to_string(),
            latency_ms: None,
        }
    }
}

/// Mock code generation
pub struct CodeHandler;

#[async_trait]
impl NodeHandler for CodeHandler {
    fn node_type(&self) -> &str {
        NodeKind::Code.as_str()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeResult, NodeError> {
        let config: CodeConfig = parse_config(&ctx)?;
        let prompt = resolve_prompt(config.prompt.as_deref(), &ctx).unwrap_or_default();
        let code = scaffold(&config.language, &prompt)?;

        simulate_latency(&ctx, config.latency_ms).await?;

        Ok(NodeResult::new(NodeKind::Code.as_str())
            .with("language", config.language)
            .with("code", code)
            .with("prompt", prompt))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Generate a code snippet".to_string(),
            category: "code".to_string(),
        }
    }
}

fn scaffold(language: &str, prompt: &str) -> Result<String, NodeError> {
    let snippet = match language {
        "typescript" | "javascript" => format!(
            "// {}\nexport function main() {{\n  console.log(\"generated\");\n}}\n",
            prompt
        ),
        "python" => format!("# {}\ndef main():\n    print(\"generated\")\n", prompt),
        "rust" => format!("// {}\nfn main() {{\n    println!(\"generated\");\n}}\n", prompt),
        other => {
            return Err(NodeError::InvalidInput {
                field: "language".to_string(),
                expected: "typescript, javascript, python or rust".to_string(),
                actual: other.to_string(),
            })
        }
    };
    Ok(snippet)
}
