use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use cbir::CbirConfig;
use index::DocumentStore;
use matcher::Matcher;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Pipeline configuration the store and matcher were built from
    pub pipeline: Arc<CbirConfig>,

    /// Document store (shared across requests)
    pub store: Arc<dyn DocumentStore>,

    /// Matcher over `store` (shared across requests)
    pub matcher: Arc<Matcher>,
}

impl ServerState {
    /// Create new server state, loading the pipeline config named by
    /// `config.pipeline_config` and building its store.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let pipeline = match &config.pipeline_config {
            Some(path) => CbirConfig::from_file(path)
                .map_err(|e| ServerError::Config(format!("{path}: {e}")))?,
            None => CbirConfig::default(),
        };
        let store = pipeline.store.build()?;
        Self::with_store(config, pipeline, store)
    }

    /// Create server state over an existing store.
    pub fn with_store(
        config: ServerConfig,
        pipeline: CbirConfig,
        store: Arc<dyn DocumentStore>,
    ) -> ServerResult<Self> {
        let matcher = Matcher::new(
            store.clone(),
            pipeline.descriptor.clone(),
            pipeline.search.clone(),
        )?;

        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            store,
            matcher: Arc::new(matcher),
        })
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
    pub store: &'static str,
}
