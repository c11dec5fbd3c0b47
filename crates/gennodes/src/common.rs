use gencore::{NodeContext, NodeError, NodeKind};
use serde::de::DeserializeOwned;
use tokio::time::{sleep, Duration};

/// Deserialize a node's `data` into a handler config; `null` yields the default
pub(crate) fn parse_config<T>(ctx: &NodeContext) -> Result<T, NodeError>
where
    T: DeserializeOwned + Default,
{
    if ctx.node.data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(ctx.node.data.clone())
        .map_err(|e| NodeError::Configuration(format!("invalid data for node {}: {}", ctx.node_id(), e)))
}

/// The explicit prompt, or else the joined `content` of upstream text results
pub(crate) fn resolve_prompt(explicit: Option<&str>, ctx: &NodeContext) -> Option<String> {
    if let Some(prompt) = explicit.filter(|p| !p.trim().is_empty()) {
        return Some(prompt.to_string());
    }

    let upstream: Vec<&str> = ctx
        .inputs_of_type(NodeKind::Text)
        .into_iter()
        .filter_map(|r| r.get_str("content"))
        .collect();

    if upstream.is_empty() {
        None
    } else {
        Some(upstream.join("\n"))
    }
}

/// Pretend to wait on a backend, giving up if the run is cancelled
pub(crate) async fn simulate_latency(ctx: &NodeContext, latency_ms: Option<u64>) -> Result<(), NodeError> {
    let Some(delay_ms) = latency_ms.filter(|ms| *ms > 0) else {
        return Ok(());
    };

    ctx.events.info(format!("Waiting {}ms for backend", delay_ms));

    tokio::select! {
        _ = sleep(Duration::from_millis(delay_ms)) => Ok(()),
        _ = ctx.cancellation.cancelled() => Err(NodeError::Cancelled),
    }
}

pub(crate) fn mock_url(kind: NodeKind, node_id: &str, extension: &str) -> String {
    format!("mock://{}/{}.{}", kind, node_id, extension)
}
