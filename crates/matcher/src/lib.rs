//! # CBIR Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` is the query side of the engine. It turns a request into a
//! [`fusion::QueryBundle`] and ranks a [`index::DocumentStore`] against it.
//!
//! Two query modes are supported:
//! - **Image**: an uploaded image is decoded, canonicalized and run through
//!   the requested descriptor extractors, exactly as at ingestion time.
//! - **Exemplar**: previously retrieved ("liked") documents are fetched by id
//!   and averaged field by field into a synthetic profile.
//!
//! ## Core Types
//!
//! - [`FeatureFusionScorer`]: builds query bundles (`build_from_image`,
//!   `build_from_exemplars`).
//! - [`SearchGateway`]: `rank(bundle, top_n)` under a per-call deadline.
//! - [`Matcher`]: request-level entry point combining both.
//! - [`MatchConfig`]: default and maximum `top_n`, store deadline.
//! - [`MatchRequest`] / [`QuerySource`]: one query, its family selector and
//!   result count.
//! - [`RankedHit`]: document id and fused score.
//! - [`MatchMetrics`]: optional global observer, see [`set_match_metrics`].
//!
//! ## Contract
//!
//! - Exemplar ids are deduplicated and unknown ids skipped; when none
//!   resolve the result is empty, not an error.
//! - Results are sorted by descending score, ties by ascending id.
//! - A store call slower than `deadline_ms` fails with
//!   [`MatchError::DeadlineExceeded`].
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use descriptor::DescriptorConfig;
//! use index::{DocumentStore, EmbeddedStore};
//! use matcher::{MatchConfig, MatchRequest, Matcher};
//!
//! # async fn run(image: Vec<u8>) -> Result<(), matcher::MatchError> {
//! let store: Arc<dyn DocumentStore> = Arc::new(EmbeddedStore::in_memory());
//! let matcher = Matcher::new(store, DescriptorConfig::default(), MatchConfig::default())?;
//!
//! let req = MatchRequest::image(image).with_feature_keys(["mean", "hist"]).with_top_n(5);
//! for hit in matcher.match_request(&req).await? {
//!     println!("{} score={:.4}", hit.id, hit.score);
//! }
//! # Ok(())
//! # }
//! ```

mod engine;
mod metrics;
mod types;

pub use engine::{FeatureFusionScorer, Matcher, SearchGateway};
pub use metrics::{set_match_metrics, MatchMetrics};
pub use types::{
    ExemplarQuery, MatchConfig, MatchError, MatchRequest, QueryMode, QuerySource, RankedHit,
};
