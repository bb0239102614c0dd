use std::path::Path;
use std::sync::Arc;

use tracing::info;

use flowdesk_core::config::AppConfig;
use flowdesk_core::event::EventBus;
use flowdesk_core::traits::{Clock, QueueDirectory};

use flowdesk_effects::{
    MemoryCatalogue, OperatorDirectory, Presence, ReqwestFetch, SandboxScript, SystemClock,
};
use flowdesk_engine::{Desk, Effects, FlowDraft, FlowExecutor, FlowGraph};
use flowdesk_store::MemoryStore;

/// A desk wired to the concrete adapters, plus the handles the CLI needs.
pub struct Runtime {
    pub desk: Desk,
    pub directory: Arc<dyn QueueDirectory>,
}

/// Publish the draft at `flow` and wire a desk around it using the data
/// files named in `config`.
pub fn build(config: AppConfig, flow: &Path) -> anyhow::Result<Runtime> {
    let graph = FlowGraph::publish(FlowDraft::load(flow)?)?;
    info!(flow = %graph.id(), nodes = graph.nodes().len(), "Flow published");

    let events = Arc::new(EventBus::default());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(MemoryStore::new(clock.clone()).with_events(events.clone()));

    let mut catalogue = MemoryCatalogue::new();
    if let Some(path) = &config.data.schedules {
        catalogue.load_schedules(path)?;
    }
    if let Some(path) = &config.data.templates {
        catalogue.load_templates(path)?;
    }
    let catalogue = Arc::new(catalogue);

    let presence = Presence::from_config(&config.presence);
    let directory: Arc<dyn QueueDirectory> = match &config.data.operators {
        Some(path) => Arc::new(OperatorDirectory::load(path, presence, &config.directory)?),
        None => Arc::new(OperatorDirectory::new(Vec::new(), presence, &config.directory)),
    };

    let effects = Effects {
        sink: store.clone(),
        variables: store.clone(),
        http: Arc::new(ReqwestFetch::new(&config.http)?),
        script: Arc::new(SandboxScript::new(config.script.clone())),
        queues: directory.clone(),
        sessions: store,
        schedules: catalogue.clone(),
        templates: catalogue,
        clock,
    };

    let executor = Arc::new(FlowExecutor::new(
        effects,
        config.engine.clone(),
        config.messages.clone(),
    ));
    let desk = Desk::new(graph, executor, events, Arc::new(config));

    Ok(Runtime { desk, directory })
}
