//! # CBIR Descriptor Extraction
//!
//! This crate turns images into fixed-shape numeric descriptor bundles for
//! the content-based image retrieval engine.
//!
//! ## Contract
//!
//! - Every image, whether it is being ingested or used as a query, goes
//!   through the same [`preprocess`] path before any extractor sees it.
//! - Extractors are pure functions of `(canonical_image, config)`: no I/O,
//!   no clocks, no shared state. They never read one another's output.
//! - Field lengths are configuration ([`DescriptorConfig::shape_of`]), never
//!   inferred per call. The [`DocumentBuilder`] rejects any output that does
//!   not match.
//!
//! ## Families
//!
//! | key | fields | default length |
//! |---|---|---|
//! | `mean` | `r_mean`, `g_mean`, `b_mean`, `i_mean` | scalar |
//! | `hist` | `r_hist`, `g_hist`, `b_hist`, `i_hist` | 16 |
//! | `glcm` | `energy`, `contrast`, `entropy`, `dissimilarity`, `homogeneity`, `correlation` | 4 |
//! | `hog` | `hog` | 1176 |
//! | `gist` | `gist` | 1024 |
//! | `dct` | `dct` | 1280 |
//! | `wavelet` | `wavelet` | 12 |
//! | `corners` | `corners` | 1024 |
//!
//! ## Example Usage
//!
//! ```
//! use descriptor::{CanonicalImage, DescriptorConfig, DocumentBuilder, FamilySet};
//! use image::{Rgb, RgbImage};
//!
//! let builder = DocumentBuilder::new(DescriptorConfig::default());
//! let img = CanonicalImage::from_rgb(RgbImage::from_pixel(128, 128, Rgb([200, 10, 10])));
//! let families = FamilySet::from_keys(["mean", "hist"]).unwrap();
//!
//! let doc = builder.build("red.png", &img, &families).unwrap();
//! assert_eq!(doc.fields.len(), 8);
//! ```
pub mod builder;
pub mod config;
pub mod document;
pub mod extract;
pub mod imaging;
pub mod preprocess;

pub use crate::builder::DocumentBuilder;
pub use crate::config::{DescriptorConfig, DescriptorError, FamilyShape};
pub use crate::document::{
    DescriptorFields, Document, Family, FamilySet, FieldValue, Fields,
};
pub use crate::extract::{extract_family, FamilyFields};
pub use crate::preprocess::{decode, decode_and_preprocess, preprocess, CanonicalImage};

/// Current descriptor algorithm version for this crate.
pub const DESCRIPTOR_VERSION: u16 = 1;
