mod runtime;
mod simulate;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use flowdesk_core::config::AppConfig;
use flowdesk_engine::{FlowDraft, FlowGraph, NodeKind};

#[derive(Parser)]
#[command(name = "flowdesk", version, about = "Flow-driven chat desk with operator hand-off")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "flowdesk.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a flow draft and report structural errors
    Validate {
        /// Flow draft (JSON)
        file: PathBuf,
    },
    /// Chat with a flow from the terminal
    Simulate {
        /// Flow draft (JSON); defaults to `data.flow` from the config
        #[arg(long)]
        flow: Option<PathBuf>,
        /// Customer reference for the simulated session
        #[arg(long, default_value = "simulator")]
        customer: String,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("flowdesk=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => validate(&file),
        Commands::Config => {
            let config = load_config(&cli.config)?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Simulate { flow, customer } => {
            let config = load_config(&cli.config)?;
            let flow = flow
                .or_else(|| config.data.flow.clone())
                .context("no flow given: pass --flow or set data.flow in the config")?;
            let runtime = runtime::build(config, &flow)?;
            simulate::run(runtime, &customer).await
        }
    }
}

/// A missing config file means defaults.
fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if path.exists() {
        info!(path = %path.display(), "Loading config");
        Ok(AppConfig::load(path)?)
    } else {
        info!(path = %path.display(), "No config file, using defaults");
        Ok(AppConfig::default())
    }
}

fn validate(file: &Path) -> anyhow::Result<()> {
    let draft = FlowDraft::load(file)?;
    let graph = FlowGraph::publish(draft)
        .with_context(|| format!("{} is not a valid flow", file.display()))?;

    println!("Flow: {} ({})", graph.name(), graph.id());
    println!("  start: {}", graph.start_id());
    println!("  nodes: {}", graph.nodes().len());
    println!("  edges: {}", graph.edges().len());

    let jumps: Vec<&str> = graph
        .nodes()
        .iter()
        .filter_map(|node| match &node.kind {
            NodeKind::Goto { target } => Some(target.as_str()),
            _ => None,
        })
        .collect();

    let unreachable: Vec<&str> = graph
        .nodes()
        .iter()
        .filter(|node| !matches!(node.kind, NodeKind::Start { .. }))
        .filter(|node| !graph.edges().iter().any(|edge| edge.target == node.id))
        .filter(|node| !jumps.contains(&node.id.as_str()))
        .map(|node| node.id.as_str())
        .collect();
    if !unreachable.is_empty() {
        println!("  warning: no incoming edges: {}", unreachable.join(", "));
    }

    for target in jumps.iter().filter(|t| graph.node(t).is_none()) {
        println!("  warning: goto target {} does not exist", target);
    }
    Ok(())
}
