// crates/gencli/src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use gencore::{ErrorPolicy, ExecutionEvent, ExecutionRecord, ExecutionStatus, Node, NodeEvent, Workflow};
use genruntime::{ExecutionCallbacks, GenRuntime, HandlerRegistry, RuntimeConfig};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "genflow")]
#[command(about = "Generative media workflow CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Keep running branches that do not depend on a failed node
        #[arg(long)]
        continue_on_error: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn builtin_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    gennodes::register_all(&mut registry);
    registry
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            continue_on_error,
            verbose,
        } => {
            init_logging(verbose);
            let succeeded = run_workflow(file, continue_on_error).await?;
            if !succeeded {
                std::process::exit(1);
            }
        }

        Commands::Validate { file } => {
            validate_workflow(file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_workflow(output)?;
        }
    }

    Ok(())
}

/// A run counts as successful only if it completed with no node errors,
/// including failures tolerated by `--continue-on-error`
fn run_succeeded(record: &ExecutionRecord) -> bool {
    record.status == ExecutionStatus::Completed && record.errors.is_empty()
}

async fn run_workflow(file: PathBuf, continue_on_error: bool) -> Result<bool> {
    println!("🚀 Loading workflow from: {}", file.display());

    let workflow = genruntime::loader::load_workflow(&file)?;

    println!("📋 Workflow: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Edges: {}", workflow.edges.len());
    println!();

    let config = RuntimeConfig {
        error_policy: continue_on_error.then_some(ErrorPolicy::ContinueIndependentBranches),
        ..RuntimeConfig::default()
    };
    tracing::debug!(?config, "runtime configured");
    let runtime = GenRuntime::with_registry(Arc::new(builtin_registry()), config);

    // Subscribe to events for real-time output
    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::NodeCompleted { node_id, duration_ms, .. } => {
                    println!("  ✅ Node {} completed in {}ms", node_id, duration_ms);
                }
                ExecutionEvent::NodeFailed { node_id, error, .. } => {
                    println!("  ❌ Node {} failed: {}", node_id, error);
                }
                ExecutionEvent::NodeSkipped { node_id, .. } => {
                    println!("  ⏭️  Node {} skipped (upstream failure)", node_id);
                }
                ExecutionEvent::NodeEvent { node_id, event, .. } => match event {
                    NodeEvent::Info { message } => println!("     ℹ️  [{}] {}", node_id, message),
                    NodeEvent::Warning { message } => println!("     ⚠️  [{}] {}", node_id, message),
                    NodeEvent::Progress { percent, message } => match message {
                        Some(msg) => println!("     📊 [{}] {}% - {}", node_id, percent, msg),
                        None => println!("     📊 [{}] {}%", node_id, percent),
                    },
                },
                ExecutionEvent::WorkflowFinished { status, duration_ms, .. } => {
                    println!("🏁 Workflow {:?} after {}ms", status, duration_ms);
                    break;
                }
                _ => {}
            }
        }
    });

    let callbacks = ExecutionCallbacks::new().on_progress(|step, total, node_id| {
        println!("  ⚡ [{}/{}] Starting node: {}", step, total, node_id);
    });

    let executor = runtime.executor(workflow, callbacks);
    let result = executor.execute().await;

    // Let the listener drain what was already published
    let _ = tokio::time::timeout(std::time::Duration::from_millis(100), event_task).await;

    let record = match result {
        Ok(record) => record,
        Err(e) => {
            println!("💥 Workflow rejected: {}", e);
            return Ok(false);
        }
    };

    println!();
    println!("📊 Execution Summary:");
    println!("   Execution ID: {}", record.id);
    println!("   Status: {:?}", record.status);
    println!("   Steps: {}/{}", record.current_step, record.total_nodes());

    if !record.results.is_empty() {
        println!();
        println!("📤 Results:");
        let mut ids: Vec<_> = record.results.keys().collect();
        ids.sort();
        for id in ids {
            println!("   {}: {}", id, serde_json::to_string(&record.results[id])?);
        }
    }

    if !record.errors.is_empty() {
        println!();
        println!("🧯 Errors:");
        for (id, message) in &record.errors {
            println!("   {}: {}", id, message);
        }
    }

    if !record.skipped.is_empty() {
        println!();
        println!("⏭️  Skipped: {}", record.skipped.join(", "));
    }

    Ok(run_succeeded(&record))
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow = genruntime::loader::load_workflow(&file)?;
    let order = genruntime::execution_order(&workflow.nodes, &workflow.edges)?;

    println!("✅ Workflow is valid:");
    println!("   Name: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Edges: {}", workflow.edges.len());
    println!("   Order: {}", order.join(" → "));

    let registry = builtin_registry();
    let unknown: Vec<&Node> = workflow
        .nodes
        .iter()
        .filter(|n| !registry.contains(&n.node_type))
        .collect();

    for node in &unknown {
        println!("⚠️  Node {} has unknown type '{}'", node.id, node.node_type);
    }
    if !unknown.is_empty() {
        anyhow::bail!("{} node(s) have no registered handler", unknown.len());
    }

    Ok(())
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let registry = builtin_registry();
    for node_type in registry.list_node_types() {
        if let Some(metadata) = registry.get_metadata(&node_type) {
            println!("  • {} ({})", node_type, metadata.category);
            println!("    {}", metadata.description);
        } else {
            println!("  • {}", node_type);
        }
    }
}

/// Image -> video -> audio chain: render a still, animate it, narrate the clip
fn example_workflow() -> Workflow {
    let mut workflow = Workflow::new("Example Teaser Workflow");
    workflow.description = Some("Renders a still, animates it, and narrates the clip".to_string());

    let still = workflow.add_node(
        Node::new("still", "image")
            .with_data(json!({ "prompt": "a lighthouse at dusk", "width": 1280, "height": 720 }))
            .with_position(100.0, 100.0),
    );
    let clip = workflow.add_node(
        Node::new("clip", "video")
            .with_data(json!({ "durationSecs": 4 }))
            .with_position(300.0, 100.0),
    );
    let voice = workflow.add_node(
        Node::new("voiceover", "audio")
            .with_data(json!({ "prompt": "calm waves and a distant horn" }))
            .with_position(500.0, 100.0),
    );

    workflow.connect(still, clip.clone());
    workflow.connect(clip, voice);
    workflow
}

fn create_example_workflow(output: PathBuf) -> Result<()> {
    let workflow = example_workflow();
    genruntime::loader::save_workflow(&workflow, &output)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  genflow run --file {}", output.display());

    Ok(())
}
