//! Workspace umbrella crate for the CBIR engine.
//!
//! Re-exports the descriptor, fusion, store and query crates so callers can
//! depend on one crate, and carries the pieces that span all of them: the
//! YAML pipeline configuration ([`CbirConfig`]) and the batch ingestion
//! driver ([`ingest_directory`]) behind the `cbir-ingest` binary.
//!
//! ```no_run
//! use std::path::Path;
//! use cbir::{ingest_directory, CbirConfig, DocumentBuilder, IngestOptions};
//!
//! # async fn run() -> Result<(), cbir::CbirError> {
//! let cfg = CbirConfig::from_file("cbir.yaml")?;
//! let store = cfg.store.build()?;
//! store.prepare(&cfg.descriptor).await?;
//!
//! let builder = DocumentBuilder::new(cfg.descriptor.clone());
//! let report = ingest_directory(Path::new("images"), &builder, store.as_ref(), &IngestOptions::default()).await?;
//! println!("indexed {} of {}", report.indexed, report.considered);
//! # Ok(())
//! # }
//! ```

pub mod config;

pub use config::{CbirConfig, ConfigLoadError, IngestYamlConfig};
pub use descriptor::{
    decode_and_preprocess, CanonicalImage, DescriptorConfig, DescriptorError, DescriptorFields,
    Document, DocumentBuilder, Family, FamilySet, FieldValue, Fields, DESCRIPTOR_VERSION,
};
pub use fusion::{average_documents, score, score_breakdown, QueryBundle, ScoreBreakdown};
pub use index::{
    DocumentStore, ElasticConfig, ElasticStore, EmbeddedStore, IndexError, ScoredHit, StoreConfig,
};
pub use matcher::{
    ExemplarQuery, FeatureFusionScorer, MatchConfig, MatchError, MatchRequest, Matcher,
    QuerySource, RankedHit, SearchGateway,
};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

/// File extensions (lowercase) picked up by [`ingest_directory`].
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Errors surfaced by the umbrella crate.
#[derive(Debug, Error)]
pub enum CbirError {
    #[error("config error: {0}")]
    Config(#[from] ConfigLoadError),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
}

/// Ingestion driver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    /// Eligible files (in filename order) skipped before indexing starts.
    pub start_offset: usize,
    /// Families extracted for every document.
    pub families: FamilySet,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            start_offset: 0,
            families: FamilySet::all(),
        }
    }
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Eligible files after the start offset.
    pub considered: usize,
    /// Documents written to the store.
    pub indexed: usize,
    /// Files that could not be read, decoded or described.
    pub skipped: usize,
}

/// Eligible image files of `dir`, sorted by filename.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, CbirError> {
    let io_err = |source| CbirError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && has_image_extension(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Describe every eligible image of `dir` and write it to `store`, keyed by
/// filename.
///
/// Files are processed sequentially in filename order after skipping
/// `opts.start_offset` of them. A file that cannot be read, decoded or
/// described is logged and skipped; a store failure aborts the run.
pub async fn ingest_directory(
    dir: &Path,
    builder: &DocumentBuilder,
    store: &dyn DocumentStore,
    opts: &IngestOptions,
) -> Result<IngestReport, CbirError> {
    let start = Instant::now();
    let files = list_images(dir)?;
    let total = files.len();
    let mut report = IngestReport::default();

    for path in files.into_iter().skip(opts.start_offset) {
        report.considered += 1;
        let Some(id) = path.file_name().and_then(|name| name.to_str()) else {
            warn!(path = %path.display(), "skipping file with non UTF-8 name");
            report.skipped += 1;
            continue;
        };
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(file = id, error = %err, "skipping unreadable file");
                report.skipped += 1;
                continue;
            }
        };
        let doc = match builder.build_from_bytes(id, &bytes, &opts.families) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(file = id, error = %err, "skipping file");
                report.skipped += 1;
                continue;
            }
        };
        store.put(&doc).await?;
        report.indexed += 1;
        debug!(file = id, fields = doc.fields.len(), "indexed");
    }

    info!(
        dir = %dir.display(),
        eligible = total,
        start_offset = opts.start_offset,
        considered = report.considered,
        indexed = report.indexed,
        skipped = report.skipped,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "ingest_directory"
    );
    Ok(report)
}
