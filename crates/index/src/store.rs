use async_trait::async_trait;
use descriptor::{DescriptorConfig, Document};
use fusion::QueryBundle;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::IndexError;

/// One ranked document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHit {
    pub id: String,
    pub score: f64,
}

/// Persistent document storage with whole-collection scoring.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Prepare the store for documents shaped by `cfg` (e.g. create an
    /// index mapping). Idempotent.
    async fn prepare(&self, _cfg: &DescriptorConfig) -> Result<(), IndexError> {
        Ok(())
    }

    /// Insert or overwrite a document by id.
    async fn put(&self, doc: &Document) -> Result<(), IndexError>;

    /// Fetch documents by id; the result has one slot per input id, in order.
    async fn multi_get(&self, ids: &[String]) -> Result<Vec<Option<Document>>, IndexError>;

    /// Score every stored document against `query` and return the best
    /// `top_n`.
    async fn score_all(
        &self,
        query: &QueryBundle,
        top_n: usize,
    ) -> Result<Vec<ScoredHit>, IndexError>;

    /// Whether `score_all` already returns hits sorted and truncated.
    fn returns_sorted(&self) -> bool {
        false
    }

    /// Number of stored documents.
    async fn count(&self) -> Result<usize, IndexError>;
}

/// Sort descending by score, ties by ascending id, then keep `top_n`.
pub fn rank_hits(hits: &mut Vec<ScoredHit>, top_n: usize) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(top_n);
}
