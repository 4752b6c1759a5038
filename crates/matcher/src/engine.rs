use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use descriptor::{decode_and_preprocess, DescriptorConfig, DocumentBuilder, FamilySet};
use fusion::{average_documents, QueryBundle};
use index::{rank_hits, DocumentStore, IndexError, ScoredHit};
use tracing::{debug, info};

use crate::metrics::metrics_recorder;
use crate::types::{
    ExemplarQuery, MatchConfig, MatchError, MatchRequest, QuerySource, RankedHit,
};

#[cfg(test)]
mod tests;

/// Run a store call under `deadline`.
async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, MatchError>
where
    F: Future<Output = Result<T, IndexError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(MatchError::DeadlineExceeded {
            deadline_ms: deadline.as_millis() as u64,
        }),
    }
}

/// Builds query bundles, either from an image or from stored exemplars.
#[derive(Clone)]
pub struct FeatureFusionScorer {
    store: Arc<dyn DocumentStore>,
    builder: DocumentBuilder,
    deadline: Duration,
}

impl FeatureFusionScorer {
    pub fn new(store: Arc<dyn DocumentStore>, cfg: DescriptorConfig) -> Self {
        Self {
            store,
            builder: DocumentBuilder::new(cfg),
            deadline: Duration::from_millis(MatchConfig::default_deadline_ms()),
        }
    }

    /// Deadline applied to the exemplar fetch.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn config(&self) -> &DescriptorConfig {
        self.builder.config()
    }

    /// Decode, canonicalize and extract the requested families of an image.
    ///
    /// CPU-bound; async callers should run it on a blocking thread.
    pub fn build_from_image(
        &self,
        bytes: &[u8],
        families: &FamilySet,
    ) -> Result<QueryBundle, MatchError> {
        if families.is_empty() {
            return Err(MatchError::InvalidRequest(
                "no descriptor families requested".into(),
            ));
        }
        let img = decode_and_preprocess(bytes, self.builder.config())?;
        let fields = self.builder.extract(&img, families)?;
        Ok(QueryBundle::from_fields(fields))
    }

    /// Average the requested families over the stored documents named by
    /// `ids`.
    ///
    /// Duplicate ids count once and ids missing from the store are skipped.
    pub async fn build_from_exemplars(
        &self,
        ids: &[String],
        families: &FamilySet,
    ) -> Result<ExemplarQuery, MatchError> {
        if families.is_empty() {
            return Err(MatchError::InvalidRequest(
                "no descriptor families requested".into(),
            ));
        }
        let mut seen = HashSet::new();
        let unique: Vec<String> = ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        if unique.is_empty() {
            return Ok(ExemplarQuery::NoValidExemplars);
        }

        let fetched = with_deadline(self.deadline, self.store.multi_get(&unique)).await?;
        let found: Vec<_> = fetched.into_iter().flatten().collect();
        debug!(
            requested = unique.len(),
            found = found.len(),
            "exemplars_fetched"
        );
        if found.is_empty() {
            return Ok(ExemplarQuery::NoValidExemplars);
        }
        Ok(ExemplarQuery::Bundle(average_documents(
            &found,
            families,
            self.builder.config(),
        )))
    }
}

/// Ranks the store against a query bundle under a deadline.
#[derive(Clone)]
pub struct SearchGateway {
    store: Arc<dyn DocumentStore>,
    deadline: Duration,
}

impl SearchGateway {
    pub fn new(store: Arc<dyn DocumentStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Best `top_n` stored documents for `query`, highest score first.
    pub async fn rank(
        &self,
        query: &QueryBundle,
        top_n: usize,
    ) -> Result<Vec<RankedHit>, MatchError> {
        if top_n == 0 {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let mut hits: Vec<ScoredHit> =
            with_deadline(self.deadline, self.store.score_all(query, top_n)).await?;
        if !self.store.returns_sorted() {
            rank_hits(&mut hits, top_n);
        }
        info!(
            store = self.store.name(),
            top_n,
            returned = hits.len(),
            elapsed_micros = start.elapsed().as_micros() as u64,
            "gateway_rank"
        );
        Ok(hits
            .into_iter()
            .map(|hit| RankedHit {
                id: hit.id,
                score: hit.score,
            })
            .collect())
    }
}

/// Request-level entry point wiring a [`FeatureFusionScorer`] to a
/// [`SearchGateway`] over one shared store.
#[derive(Clone)]
pub struct Matcher {
    scorer: FeatureFusionScorer,
    gateway: SearchGateway,
    cfg: MatchConfig,
}

impl Matcher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        descriptor_cfg: DescriptorConfig,
        cfg: MatchConfig,
    ) -> Result<Self, MatchError> {
        cfg.validate()?;
        descriptor_cfg.validate()?;
        let deadline = Duration::from_millis(cfg.deadline_ms);
        Ok(Self {
            scorer: FeatureFusionScorer::new(store.clone(), descriptor_cfg).with_deadline(deadline),
            gateway: SearchGateway::new(store, deadline),
            cfg,
        })
    }

    pub fn scorer(&self) -> &FeatureFusionScorer {
        &self.scorer
    }

    pub fn gateway(&self) -> &SearchGateway {
        &self.gateway
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Build the query for `req` and rank the store against it.
    ///
    /// An exemplar request whose ids are all unknown yields an empty result.
    pub async fn match_request(&self, req: &MatchRequest) -> Result<Vec<RankedHit>, MatchError> {
        let families = req.families()?;
        let top_n = self.cfg.resolve_top_n(req.top_n);
        let mode = req.source.mode();
        let start = Instant::now();

        let query = match &req.source {
            QuerySource::Image(bytes) => {
                let scorer = self.scorer.clone();
                let bytes = bytes.clone();
                tokio::task::spawn_blocking(move || scorer.build_from_image(&bytes, &families))
                    .await
                    .map_err(|e| MatchError::Internal(e.to_string()))??
            }
            QuerySource::Exemplars(ids) => {
                match self.scorer.build_from_exemplars(ids, &families).await? {
                    ExemplarQuery::Bundle(bundle) => bundle,
                    ExemplarQuery::NoValidExemplars => {
                        debug!(requested = ids.len(), "no_valid_exemplars");
                        return Ok(Vec::new());
                    }
                }
            }
        };

        let hits = self.gateway.rank(&query, top_n).await?;
        let latency = start.elapsed();

        if let Some(recorder) = metrics_recorder() {
            recorder.record_match(&mode, latency, hits.len());
        }

        Ok(hits)
    }
}
