//! Assembly of extractor outputs into a [`Document`].

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::config::{DescriptorConfig, DescriptorError};
use crate::document::{Document, Family, FamilySet, FieldValue, Fields};
use crate::extract::{extract_family, FamilyFields};
use crate::preprocess::{decode_and_preprocess, CanonicalImage};

/// Runs the requested extractors and checks their output against the
/// configured family shapes.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    cfg: DescriptorConfig,
}

impl DocumentBuilder {
    pub fn new(cfg: DescriptorConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &DescriptorConfig {
        &self.cfg
    }

    /// Build a document from an already canonical image.
    pub fn build(
        &self,
        id: &str,
        img: &CanonicalImage,
        families: &FamilySet,
    ) -> Result<Document, DescriptorError> {
        if id.trim().is_empty() {
            return Err(DescriptorError::InvalidRequest("document id is empty".into()));
        }
        let fields = self.extract(img, families)?;
        Ok(Document {
            id: id.to_string(),
            fields,
        })
    }

    /// Decode, canonicalize and build in one step.
    pub fn build_from_bytes(
        &self,
        id: &str,
        bytes: &[u8],
        families: &FamilySet,
    ) -> Result<Document, DescriptorError> {
        let img = decode_and_preprocess(bytes, &self.cfg)?;
        self.build(id, &img, families)
    }

    /// Extract and shape-check the requested families into one field map.
    pub fn extract(
        &self,
        img: &CanonicalImage,
        families: &FamilySet,
    ) -> Result<Fields, DescriptorError> {
        if families.is_empty() {
            return Err(DescriptorError::InvalidRequest(
                "no descriptor families requested".into(),
            ));
        }
        let start = Instant::now();
        let requested: Vec<Family> = families.iter().collect();
        let run = |family: &Family| -> Result<FamilyFields, DescriptorError> {
            let out = extract_family(*family, img, &self.cfg)?;
            self.check_shape(*family, &out)?;
            Ok(out)
        };
        let outputs: Vec<FamilyFields> = if self.cfg.use_parallel {
            requested.par_iter().map(run).collect::<Result<_, _>>()?
        } else {
            requested.iter().map(run).collect::<Result<_, _>>()?
        };

        let mut fields = Fields::new();
        for (name, value) in outputs.into_iter().flatten() {
            fields.insert(name.to_string(), value);
        }
        debug!(
            families = requested.len(),
            fields = fields.len(),
            parallel = self.cfg.use_parallel,
            elapsed_micros = start.elapsed().as_micros() as u64,
            "descriptor_extracted"
        );
        Ok(fields)
    }

    fn check_shape(&self, family: Family, out: &FamilyFields) -> Result<(), DescriptorError> {
        let shape = self.cfg.shape_of(family);
        for (name, value) in out {
            let expected = shape.length_of(name).flatten();
            match (value, expected) {
                (FieldValue::Scalar(_), None) => {}
                (FieldValue::Vector(v), Some(len)) if v.len() == len => {}
                (value, expected) => {
                    return Err(DescriptorError::ShapeMismatch {
                        field: (*name).to_string(),
                        expected: expected.unwrap_or(0),
                        actual: value.vector_len().unwrap_or(0),
                    });
                }
            }
        }
        Ok(())
    }
}
