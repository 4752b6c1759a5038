//! # CBIR Fusion Scoring
//!
//! Multi-descriptor similarity between a [`QueryBundle`] and a stored
//! [`descriptor::Document`].
//!
//! Every family present on both sides contributes one unit: a cosine
//! similarity, or for the histogram and texture families the mean of the
//! per-channel cosines. The fused score is the plain mean over included
//! units and `0.0` when nothing is comparable. Length mismatches exclude the
//! family; nothing is truncated or padded.
//!
//! The same rules are available as an Elasticsearch push-down script via
//! [`painless`], rendered from the shared family table.
//!
//! ```
//! use descriptor::{Document, FamilySet, FieldValue};
//! use fusion::{score, QueryBundle};
//!
//! let doc = Document::new("a.png").with_field("wavelet", FieldValue::Vector(vec![1.0, 2.0]));
//! let query = QueryBundle::from_document(&doc, &FamilySet::all());
//! assert!((score(&query, &doc) - 1.0).abs() < 1e-12);
//! ```
mod average;
pub mod painless;
mod query;
mod score;

pub use crate::average::average_documents;
pub use crate::query::QueryBundle;
pub use crate::score::{cosine, family_score, score, score_breakdown, Cosine, ScoreBreakdown};
