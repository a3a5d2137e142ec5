//! Command-line host for the workflow engine
//!
//! Loads the stored workflow from a data directory (seeding a small demo
//! graph if there is none), runs it once through the simulator, saves the
//! resulting node statuses and prints the run report as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use workflow_engine::{
    validate_node_config, ChannelProgressSink, EngineConfig, FileWorkflowStore, GraphManager,
    NodeConfig, NodeDataPatch, NodeType, Position, SimulationConfig, UuidGenerator,
    WorkflowSimulator, WorkflowStore,
};

#[derive(Parser, Debug)]
#[command(name = "workflow-runner")]
#[command(about = "Run the stored workflow through the simulated executor", long_about = None)]
struct Args {
    /// Data directory holding config.json and the workflow file
    #[arg(default_value = "data")]
    data_dir: PathBuf,

    /// Forget the stored workflow and start from the demo graph
    #[arg(long)]
    reset: bool,

    /// Write the loaded configuration back to config.json
    #[arg(long)]
    write_config: bool,

    /// Skip the simulated latency
    #[arg(long)]
    instant: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    log::info!("Workflow runner starting (data directory {:?})", args.data_dir);

    let mut config = EngineConfig::load(&args.data_dir).await?;
    if args.write_config {
        config.save(&args.data_dir).await?;
    }
    if args.instant {
        config.simulation = SimulationConfig::instant();
    }

    let store = Arc::new(FileWorkflowStore::with_file_name(
        &args.data_dir,
        &config.storage.file_name,
    ));
    if args.reset {
        store.clear()?;
    }

    let mut manager = GraphManager::load(store, Arc::new(UuidGenerator), &config.history);
    if manager.graph().nodes.is_empty() {
        log::info!("No stored workflow, seeding the demo graph");
        seed_demo(&mut manager)?;
    }

    for node in &manager.graph().nodes {
        if let Err(errors) = validate_node_config(node.node_type, &node.data.config) {
            for error in errors {
                log::warn!("Node {} ({}) config: {}", node.id, node.data.label, error);
            }
        }
    }

    let simulator = WorkflowSimulator::new(config.simulation.clone());
    let (sink, mut events) = ChannelProgressSink::new();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log::info!("{} -> {}", event.node_id, event.status);
        }
    });

    manager.reset_statuses();
    let report = simulator.run(manager.graph(), &sink).await;
    drop(sink);
    printer.await?;

    for warning in &report.warnings {
        log::warn!("{}", warning);
    }

    manager.apply_report(&report);
    if let Err(e) = manager.save() {
        log::warn!("Could not save run statuses: {}", e);
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Trigger -> condition -> one e-mail per branch
fn seed_demo(manager: &mut GraphManager) -> workflow_engine::Result<()> {
    let trigger = manager.add_node(NodeType::TriggerManual, Position::new(0.0, 0.0))?;
    let condition = manager.add_node(NodeType::LogicCondition, Position::new(250.0, 0.0))?;
    let approved = manager.add_node(NodeType::ActionEmail, Position::new(500.0, -100.0))?;
    let rejected = manager.add_node(NodeType::ActionEmail, Position::new(500.0, 100.0))?;

    manager.update_node_data(
        &condition,
        NodeDataPatch::default().label("Large order?").config(config([
            ("field", "amount"),
            ("operator", "greater_than"),
            ("value", "100"),
        ])),
    )?;
    manager.update_node_data(
        &approved,
        NodeDataPatch::default().label("Notify sales").config(config([
            ("to", "sales@example.com"),
            ("subject", "Large order"),
            ("body", "A large order just came in."),
        ])),
    )?;
    manager.update_node_data(
        &rejected,
        NodeDataPatch::default().label("Notify ops").config(config([
            ("to", "ops@example.com"),
            ("subject", "Order received"),
            ("body", "A regular order just came in."),
        ])),
    )?;

    manager.connect(&trigger, &condition, None)?;
    manager.connect(&condition, &approved, Some("true"))?;
    manager.connect(&condition, &rejected, Some("false"))?;
    Ok(())
}

fn config<const N: usize>(fields: [(&str, &str); N]) -> NodeConfig {
    fields
        .into_iter()
        .map(|(key, value)| (key.to_string(), Value::from(value)))
        .collect()
}
