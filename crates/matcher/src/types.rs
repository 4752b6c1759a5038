use descriptor::{DescriptorError, FamilySet};
use fusion::QueryBundle;
use index::IndexError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the query bundle was produced. Used for logs and metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Descriptors extracted from a freshly uploaded image.
    Image,
    /// Averaged profile of previously retrieved documents.
    Exemplar,
}

/// Query-time configuration shared by every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchConfig {
    /// Configuration schema version for this match config.
    #[serde(default = "MatchConfig::default_version")]
    pub version: String,
    /// Number of results returned when a request does not name one.
    #[serde(default = "MatchConfig::default_top_n")]
    pub default_top_n: usize,
    /// Upper bound on any requested `top_n`.
    #[serde(default = "MatchConfig::default_max_top_n")]
    pub max_top_n: usize,
    /// Deadline applied to each store call, in milliseconds.
    #[serde(default = "MatchConfig::default_deadline_ms")]
    pub deadline_ms: u64,
}

impl MatchConfig {
    pub(crate) fn default_version() -> String {
        "v1".to_string()
    }

    pub(crate) fn default_top_n() -> usize {
        10
    }

    pub(crate) fn default_max_top_n() -> usize {
        1000
    }

    pub(crate) fn default_deadline_ms() -> u64 {
        30_000
    }

    pub fn with_default_top_n(mut self, top_n: usize) -> Self {
        self.default_top_n = top_n;
        self
    }

    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = deadline_ms;
        self
    }

    /// Resolve a caller's `top_n`, applying the default and the cap.
    pub fn resolve_top_n(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_top_n)
            .min(self.max_top_n)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.version.trim().is_empty() {
            return Err(MatchError::InvalidConfig(
                "config.version must not be empty".into(),
            ));
        }
        if self.max_top_n == 0 {
            return Err(MatchError::InvalidConfig(
                "max_top_n must be greater than zero".into(),
            ));
        }
        if self.default_top_n > self.max_top_n {
            return Err(MatchError::InvalidConfig(
                "default_top_n must not exceed max_top_n".into(),
            ));
        }
        if self.deadline_ms == 0 {
            return Err(MatchError::InvalidConfig(
                "deadline_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            version: Self::default_version(),
            default_top_n: Self::default_top_n(),
            max_top_n: Self::default_max_top_n(),
            deadline_ms: Self::default_deadline_ms(),
        }
    }
}

/// Where a request's query bundle comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySource {
    /// Encoded image bytes (png, jpeg or bmp).
    Image(Vec<u8>),
    /// Ids of previously retrieved documents to average.
    Exemplars(Vec<String>),
}

impl QuerySource {
    pub fn mode(&self) -> QueryMode {
        match self {
            QuerySource::Image(_) => QueryMode::Image,
            QuerySource::Exemplars(_) => QueryMode::Exemplar,
        }
    }
}

/// A single ranking request.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRequest {
    pub source: QuerySource,
    /// Family selector keys (`mean`, `hist`, `glcm`, ...). Empty selects all.
    pub feature_keys: Vec<String>,
    /// Number of results; `None` uses [`MatchConfig::default_top_n`].
    pub top_n: Option<usize>,
}

impl MatchRequest {
    pub fn image(bytes: Vec<u8>) -> Self {
        Self {
            source: QuerySource::Image(bytes),
            feature_keys: Vec::new(),
            top_n: None,
        }
    }

    pub fn exemplars<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: QuerySource::Exemplars(ids.into_iter().map(Into::into).collect()),
            feature_keys: Vec::new(),
            top_n: None,
        }
    }

    pub fn with_feature_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }

    /// Parse `feature_keys`; an empty selector means every family.
    pub fn families(&self) -> Result<FamilySet, MatchError> {
        if self.feature_keys.is_empty() {
            return Ok(FamilySet::all());
        }
        Ok(FamilySet::from_keys(&self.feature_keys)?)
    }
}

/// One ranked stored document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedHit {
    pub id: String,
    pub score: f64,
}

/// Outcome of exemplar query building.
#[derive(Debug, Clone, PartialEq)]
pub enum ExemplarQuery {
    Bundle(QueryBundle),
    /// None of the requested ids exist in the store.
    NoValidExemplars,
}

/// Errors produced by the query layer.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error("index error: {0}")]
    Index(#[from] IndexError),
    #[error("store call exceeded the {deadline_ms} ms deadline")]
    DeadlineExceeded { deadline_ms: u64 },
    /// A blocking worker panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}
