use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use descriptor::Document;
use fusion::{score, QueryBundle};
use tracing::{debug, info};

use crate::store::{rank_hits, DocumentStore, ScoredHit};
use crate::{CompressionConfig, IndexBackend, IndexError, InMemoryBackend, StoredDocument};

/// Store that keeps encoded documents in an [`IndexBackend`] and scores them
/// locally with [`fusion::score`].
#[derive(Clone)]
pub struct EmbeddedStore {
    backend: Arc<dyn IndexBackend>,
    compression: CompressionConfig,
}

impl EmbeddedStore {
    pub fn new(backend: Arc<dyn IndexBackend>, compression: CompressionConfig) -> Self {
        Self {
            backend,
            compression,
        }
    }

    /// Ephemeral store with default compression.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()), CompressionConfig::default())
    }

    pub fn get(&self, id: &str) -> Result<Option<Document>, IndexError> {
        match self.backend.get(id)? {
            Some(bytes) => Ok(Some(self.compression.decode(&bytes)?.document)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, id: &str) -> Result<(), IndexError> {
        self.backend.delete(id)
    }

    /// Encode and write many documents in one backend batch.
    pub fn put_batch(&self, docs: &[Document]) -> Result<(), IndexError> {
        let entries = docs
            .iter()
            .map(|doc| {
                let bytes = self.compression.encode(&StoredDocument::new(doc.clone()))?;
                Ok((doc.id.clone(), bytes))
            })
            .collect::<Result<Vec<_>, IndexError>>()?;
        self.backend.batch_put(entries)
    }

    fn score_blocking(&self, query: &QueryBundle, top_n: usize) -> Result<Vec<ScoredHit>, IndexError> {
        let start = Instant::now();
        let mut hits = Vec::new();
        self.backend.scan(&mut |bytes| {
            let record = self.compression.decode(bytes)?;
            hits.push(ScoredHit {
                score: score(query, &record.document),
                id: record.document.id,
            });
            Ok(())
        })?;
        let scanned = hits.len();
        rank_hits(&mut hits, top_n);
        info!(
            scanned,
            returned = hits.len(),
            elapsed_micros = start.elapsed().as_micros() as u64,
            "embedded_score_all"
        );
        Ok(hits)
    }
}

#[async_trait]
impl DocumentStore for EmbeddedStore {
    fn name(&self) -> &'static str {
        "embedded"
    }

    async fn put(&self, doc: &Document) -> Result<(), IndexError> {
        let bytes = self.compression.encode(&StoredDocument::new(doc.clone()))?;
        self.backend.put(&doc.id, &bytes)?;
        debug!(doc_id = %doc.id, bytes = bytes.len(), "embedded_put");
        Ok(())
    }

    async fn multi_get(&self, ids: &[String]) -> Result<Vec<Option<Document>>, IndexError> {
        ids.iter().map(|id| self.get(id)).collect()
    }

    async fn score_all(
        &self,
        query: &QueryBundle,
        top_n: usize,
    ) -> Result<Vec<ScoredHit>, IndexError> {
        if top_n == 0 {
            return Ok(Vec::new());
        }
        // The scan is CPU-bound; keep it off the async workers.
        let store = self.clone();
        let query = query.clone();
        tokio::task::spawn_blocking(move || store.score_blocking(&query, top_n))
            .await
            .map_err(IndexError::backend)?
    }

    fn returns_sorted(&self) -> bool {
        true
    }

    async fn count(&self) -> Result<usize, IndexError> {
        self.backend.len()
    }
}
