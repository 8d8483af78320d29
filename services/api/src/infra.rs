use metrics_exporter_prometheus::PrometheusHandle;
use policy_engine::catalog::{CatalogLoadError, InMemoryExecutionLog};
use policy_engine::config::EngineConfig;
use policy_engine::error::AppError;
use policy_engine::{InMemoryDefinitionStore, PolicyEngine};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

/// Catalog bundled with the binary, used when no catalog path is configured.
pub(crate) const DEMO_CATALOG: &str = include_str!("../catalog/loan_demo.json");

pub(crate) type Engine = PolicyEngine<InMemoryDefinitionStore, InMemoryExecutionLog>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn load_store(path: Option<&Path>) -> Result<InMemoryDefinitionStore, CatalogLoadError> {
    let store = match path {
        Some(path) => InMemoryDefinitionStore::from_path(path)?,
        None => InMemoryDefinitionStore::from_json_str(DEMO_CATALOG)?,
    };
    info!(
        source = path.map_or_else(|| "bundled demo".to_string(), |path| path.display().to_string()),
        policies = store.policy_ids().len(),
        policy_sets = store.policy_set_ids().len(),
        "catalog loaded"
    );
    Ok(store)
}

pub(crate) fn build_engine(
    catalog: Option<&Path>,
    config: EngineConfig,
    log_capacity: usize,
) -> Result<(Engine, Arc<InMemoryExecutionLog>), AppError> {
    let store = load_store(catalog)?;
    let log = Arc::new(InMemoryExecutionLog::with_capacity(log_capacity));
    Ok((PolicyEngine::new(Arc::new(store), log.clone(), config), log))
}

/// Read an input document from a file, or from stdin when the path is `-`.
pub(crate) fn read_input(path: &Path) -> Result<Value, AppError> {
    let raw = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&raw)?)
}
