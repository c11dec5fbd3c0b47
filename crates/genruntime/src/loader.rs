use gencore::{FlowError, Workflow};
use std::path::Path;

/// Read a workflow definition from a JSON file
pub fn load_workflow(path: impl AsRef<Path>) -> Result<Workflow, FlowError> {
    let path = path.as_ref();
    tracing::debug!("Loading workflow from {}", path.display());
    let json = std::fs::read_to_string(path)?;
    parse_workflow(&json)
}

/// Parse a workflow definition from JSON text
pub fn parse_workflow(json: &str) -> Result<Workflow, FlowError> {
    let workflow: Workflow = serde_json::from_str(json)?;
    Ok(workflow)
}

/// Serialize a workflow as pretty JSON and write it to `path`
pub fn save_workflow(workflow: &Workflow, path: impl AsRef<Path>) -> Result<(), FlowError> {
    let json = serde_json::to_string_pretty(workflow)?;
    std::fs::write(path, json)?;
    Ok(())
}
