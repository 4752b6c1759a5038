use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::elastic::{ElasticConfig, ElasticStore};
use crate::embedded::EmbeddedStore;
use crate::store::DocumentStore;
use crate::{CompressionConfig, InMemoryBackend, IndexError};

/// Store selection, tagged by `backend`.
///
/// ```yaml
/// store:
///   backend: elastic
///   url: http://localhost:9200
///   index: images
///   username: elastic
///   password: changeme
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Ephemeral embedded store; contents are lost on exit.
    InMemory {
        #[serde(default)]
        compression: CompressionConfig,
    },
    /// Embedded store persisted to a redb file.
    Redb {
        path: String,
        #[serde(default)]
        compression: CompressionConfig,
    },
    /// Remote Elasticsearch index with script push-down.
    Elastic(ElasticConfig),
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::InMemory {
            compression: CompressionConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        StoreConfig::Redb {
            path: path.into(),
            compression: CompressionConfig::default(),
        }
    }

    pub fn elastic(cfg: ElasticConfig) -> Self {
        StoreConfig::Elastic(cfg)
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        match self {
            StoreConfig::InMemory { compression } => compression.validate(),
            StoreConfig::Redb { path, compression } => {
                if path.trim().is_empty() {
                    return Err(IndexError::InvalidConfig("redb path is empty".into()));
                }
                compression.validate()
            }
            StoreConfig::Elastic(cfg) => cfg.validate(),
        }
    }

    /// Build the configured store.
    pub fn build(&self) -> Result<Arc<dyn DocumentStore>, IndexError> {
        self.validate()?;
        let store: Arc<dyn DocumentStore> = match self {
            StoreConfig::InMemory { compression } => Arc::new(EmbeddedStore::new(
                Arc::new(InMemoryBackend::new()),
                compression.clone(),
            )),
            StoreConfig::Redb { path, compression } => {
                #[cfg(feature = "backend-redb")]
                {
                    Arc::new(EmbeddedStore::new(
                        Arc::new(crate::RedbBackend::open(path)?),
                        compression.clone(),
                    ))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = (path, compression);
                    return Err(IndexError::backend("redb backend disabled at compile time"));
                }
            }
            StoreConfig::Elastic(cfg) => Arc::new(ElasticStore::new(cfg.clone())?),
        };
        info!(store = store.name(), "document_store_ready");
        Ok(store)
    }
}
