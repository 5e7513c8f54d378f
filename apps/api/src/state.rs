use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::evaluation::service::Evaluator;
use crate::matching::concepts::ConceptRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Active concept registry, also served to clients for "missing concept" hints.
    pub registry: Arc<ConceptRegistry>,
    pub evaluator: Arc<Evaluator>,
}

/// Loads the concept registry and wires the evaluator. Any failure here aborts startup.
pub fn build_state(config: &Config) -> Result<AppState> {
    let registry = match &config.concepts_path {
        Some(path) => {
            let registry = ConceptRegistry::from_path(path)
                .with_context(|| format!("Failed to load concept registry from {}", path.display()))?;
            info!("Concept registry loaded from {} ({} concepts)", path.display(), registry.len());
            registry
        }
        None => {
            let registry = ConceptRegistry::builtin();
            info!("Using built-in concept registry ({} concepts)", registry.len());
            registry
        }
    };
    if registry.is_empty() {
        warn!("Concept registry is empty; every evaluation will score 0");
    }
    let registry = Arc::new(registry);

    let evaluator = Arc::new(Evaluator::new(&config.engine, registry.clone()));
    info!(
        "Evaluator ready (embedding model: {}, cache: {} entries / {}s)",
        config.engine.embedding_model,
        config.engine.cache_capacity,
        config.engine.cache_ttl.as_secs()
    );

    Ok(AppState {
        registry,
        evaluator,
    })
}
