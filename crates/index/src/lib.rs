//! # CBIR Index
//!
//! Document stores for the image retrieval engine. Every store implements
//! the async [`DocumentStore`] trait: `put`, order-preserving `multi_get`,
//! and `score_all`, which ranks every stored document against a
//! [`fusion::QueryBundle`].
//!
//! ## Stores
//!
//! - [`EmbeddedStore`] keeps documents in an [`IndexBackend`] (an in-memory
//!   map or a redb file behind the `backend-redb` feature) and evaluates
//!   [`fusion::score`] locally over a full scan. Records are bincode-encoded
//!   [`StoredDocument`]s, zstd-compressed by default.
//! - [`ElasticStore`] talks to Elasticsearch over HTTP and pushes the same
//!   scoring rules down as a generated Painless `script_score`.
//!
//! Both are built from a [`StoreConfig`], which is what the pipeline YAML and
//! the server configuration deserialize into.
//!
//! ## Example Usage
//!
//! ```
//! use descriptor::{Document, FamilySet, FieldValue};
//! use fusion::QueryBundle;
//! use index::{DocumentStore, StoreConfig};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = StoreConfig::default().build().unwrap();
//! let doc = Document::new("a.png").with_field("wavelet", FieldValue::Vector(vec![1.0, 2.0]));
//! store.put(&doc).await.unwrap();
//!
//! let query = QueryBundle::from_document(&doc, &FamilySet::all());
//! let hits = store.score_all(&query, 10).await.unwrap();
//! assert_eq!(hits[0].id, "a.png");
//! # });
//! ```

mod backend;
mod config;
mod elastic;
mod embedded;
mod store;

pub use backend::{InMemoryBackend, IndexBackend};
#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use config::StoreConfig;
pub use elastic::{
    docs_from_mget, document_from_source, document_to_source, hits_from_search, ElasticConfig,
    ElasticStore, MgetResponse, SearchResponse,
};
pub use embedded::EmbeddedStore;
pub use store::{rank_hits, DocumentStore, ScoredHit};

use bincode::config::standard;
use bincode::error::{DecodeError, EncodeError};
use bincode::serde::{decode_from_slice, encode_to_vec};
use descriptor::Document;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zstd::{decode_all, encode_all};

/// Bump whenever the encoded [`StoredDocument`] layout changes.
pub const INDEX_SCHEMA_VERSION: u16 = 1;

/// On-disk record for one document.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub document: Document,
}

const fn default_schema_version() -> u16 {
    INDEX_SCHEMA_VERSION
}

impl StoredDocument {
    pub fn new(document: Document) -> Self {
        Self {
            schema_version: INDEX_SCHEMA_VERSION,
            document,
        }
    }
}

/// Compression codec for stored records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    None,
    #[default]
    Zstd,
}

/// Compression behavior for the embedded store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Zstd level (1-22).
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn none() -> Self {
        Self::new(CompressionCodec::None, 0)
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.codec == CompressionCodec::Zstd && !(1..=22).contains(&self.level) {
            return Err(IndexError::InvalidConfig(format!(
                "zstd level must be in 1..=22 (got {})",
                self.level
            )));
        }
        Ok(())
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(decode_all(data)?),
        }
    }

    /// Encode and compress a record.
    pub fn encode(&self, record: &StoredDocument) -> Result<Vec<u8>, IndexError> {
        let encoded = encode_to_vec(record, standard())?;
        self.compress(&encoded)
    }

    /// Decompress and decode a record, rejecting newer schema versions.
    pub fn decode(&self, data: &[u8]) -> Result<StoredDocument, IndexError> {
        let decompressed = self.decompress(data)?;
        let (record, _): (StoredDocument, usize) = decode_from_slice(&decompressed, standard())?;
        if record.schema_version > INDEX_SCHEMA_VERSION {
            return Err(IndexError::Decode(format!(
                "record schema version {} is newer than supported {}",
                record.schema_version, INDEX_SCHEMA_VERSION
            )));
        }
        Ok(record)
    }
}

/// Errors raised by stores and backends.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("serialization encode error: {0}")]
    Encode(String),
    #[error("serialization decode error: {0}")]
    Decode(String),
    #[error("compression error: {0}")]
    Compression(String),
    #[error("invalid store config: {0}")]
    InvalidConfig(String),
}

impl From<EncodeError> for IndexError {
    fn from(e: EncodeError) -> Self {
        IndexError::Encode(e.to_string())
    }
}

impl From<DecodeError> for IndexError {
    fn from(e: DecodeError) -> Self {
        IndexError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Compression(e.to_string())
    }
}

impl From<reqwest::Error> for IndexError {
    fn from(e: reqwest::Error) -> Self {
        IndexError::Backend(e.to_string())
    }
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use descriptor::FieldValue;

    fn sample() -> StoredDocument {
        StoredDocument::new(
            Document::new("cat.png")
                .with_field("r_mean", FieldValue::Scalar(12.5))
                .with_field("hog", FieldValue::Vector(vec![0.25; 64])),
        )
    }

    #[test]
    fn zstd_record_roundtrip() {
        let cfg = CompressionConfig::default();
        let bytes = cfg.encode(&sample()).unwrap();
        assert_eq!(cfg.decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn uncompressed_record_roundtrip() {
        let cfg = CompressionConfig::none();
        let bytes = cfg.encode(&sample()).unwrap();
        assert_eq!(cfg.decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn newer_schema_is_rejected() {
        let cfg = CompressionConfig::none();
        let mut record = sample();
        record.schema_version = INDEX_SCHEMA_VERSION + 1;
        let bytes = cfg.encode(&record).unwrap();
        assert!(matches!(cfg.decode(&bytes), Err(IndexError::Decode(_))));
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        let cfg = CompressionConfig::default();
        assert!(cfg.decode(b"garbage").is_err());
    }

    #[test]
    fn invalid_zstd_level_is_rejected() {
        assert!(CompressionConfig::default().with_level(40).validate().is_err());
        assert!(CompressionConfig::none().validate().is_ok());
    }
}
