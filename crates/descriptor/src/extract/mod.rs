//! The eight descriptor extractors.
//!
//! Each extractor is a pure function of the canonical image and the config
//! and never reads another extractor's output. [`extract_family`] is the
//! single dispatch point used by the document builder.

pub mod color;
pub mod corners;
pub mod frequency;
pub mod gist;
pub mod hog;
pub mod texture;
pub mod wavelet;

use crate::config::{DescriptorConfig, DescriptorError};
use crate::document::{Family, FieldValue};
use crate::preprocess::CanonicalImage;

/// Named fields produced by one extractor, in the family's field order.
pub type FamilyFields = Vec<(&'static str, FieldValue)>;

/// Run the extractor for `family`.
pub fn extract_family(
    family: Family,
    img: &CanonicalImage,
    cfg: &DescriptorConfig,
) -> Result<FamilyFields, DescriptorError> {
    let names = family.fields();
    let fields = match family {
        Family::Mean => {
            let means = color::channel_means(img);
            names
                .iter()
                .zip(means)
                .map(|(name, v)| (*name, FieldValue::Scalar(v)))
                .collect()
        }
        Family::Histogram => {
            let hists = color::channel_histograms(img, cfg.bin_count);
            names
                .iter()
                .zip(hists)
                .map(|(name, v)| (*name, FieldValue::Vector(v)))
                .collect()
        }
        Family::Texture => {
            let stats = texture::glcm_stats(img)?;
            // Same order as the family field table.
            let values = [
                stats.energy,
                stats.contrast,
                stats.entropy,
                stats.dissimilarity,
                stats.homogeneity,
                stats.correlation,
            ];
            names
                .iter()
                .zip(values)
                .map(|(name, v)| (*name, FieldValue::Vector(v)))
                .collect()
        }
        Family::Hog => vec![(names[0], FieldValue::Vector(hog::hog_features(img, cfg)?))],
        Family::Gist => vec![(names[0], FieldValue::Vector(gist::edge_map(img, cfg)))],
        Family::Dct => vec![(names[0], FieldValue::Vector(frequency::block_dct(img, cfg)))],
        Family::Wavelet => vec![(names[0], FieldValue::Vector(wavelet::subband_stats(img)))],
        Family::Corners => vec![(names[0], FieldValue::Vector(corners::corner_map(img, cfg)))],
    };
    Ok(fields)
}
