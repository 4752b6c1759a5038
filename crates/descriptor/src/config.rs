//! Configuration and error types for CBIR descriptor extraction.
//!
//! This module defines the public configuration surface for the descriptor
//! layer. It is free of any I/O or environment-dependent behavior so that
//! extraction is a pure function of `(canonical_image, config)`. The
//! per-family vector lengths are derived here once and treated as
//! deployment configuration by every downstream crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::Family;

/// Configuration for preprocessing and all eight descriptor families.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DescriptorConfig {
    /// Configuration schema version.
    ///
    /// Any change that can alter a stored descriptor must bump this version,
    /// since documents extracted under different versions are not comparable.
    pub version: u32,
    /// Canonical image width in pixels.
    pub image_width: u32,
    /// Canonical image height in pixels.
    pub image_height: u32,
    /// Gaussian sigma used to denoise the canonical image. `0.0` disables it.
    pub denoise_sigma: f32,
    /// Number of histogram bins per channel across `[0, 256)`.
    pub bin_count: usize,
    /// HOG cell side length in pixels.
    pub hog_pixels_per_cell: usize,
    /// HOG block side length in cells.
    pub hog_cells_per_block: usize,
    /// Number of unsigned orientation bins for HOG.
    pub hog_orientations: usize,
    /// Decimal places HOG values are rounded to before storage.
    pub hog_decimals: u32,
    /// Downsample divisor for the scene edge map (4 = quarter size).
    pub gist_downsample: u32,
    /// DCT block side length in pixels.
    pub dct_block_size: usize,
    /// Number of leading coefficients kept per DCT block.
    pub dct_coefficients: usize,
    /// Side length of the square image the corner map is computed on.
    pub corner_resolution: u32,
    /// Fraction of the maximum Harris response a pixel must exceed.
    pub corner_threshold: f64,
    /// Harris detector free parameter.
    pub harris_k: f64,
    /// Run the requested extractors on the rayon pool.
    pub use_parallel: bool,
}

/// Expected layout of one family: each field name with its vector length,
/// or `None` for scalar fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyShape {
    pub family: Family,
    pub fields: Vec<(&'static str, Option<usize>)>,
}

impl FamilyShape {
    /// Configured length of `field`, `Some(None)` for scalars, `None` if the
    /// field does not belong to this family.
    pub fn length_of(&self, field: &str) -> Option<Option<usize>> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, len)| *len)
    }
}

impl DescriptorConfig {
    /// Create a new configuration with the deployment defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the canonical image size.
    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self
    }

    /// Set the denoise strength. `0.0` skips denoising entirely.
    pub fn with_denoise_sigma(mut self, sigma: f32) -> Self {
        self.denoise_sigma = sigma;
        self
    }

    /// Set the histogram bin count.
    pub fn with_bin_count(mut self, bins: usize) -> Self {
        self.bin_count = bins;
        self
    }

    /// Enable or disable parallel extraction of families.
    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.version < 1 {
            return Err(DescriptorError::InvalidConfig(format!(
                "version must be >= 1 (got {})",
                self.version
            )));
        }
        if self.image_width < 2 || self.image_height < 2 {
            return Err(DescriptorError::InvalidConfig(format!(
                "image size must be at least 2x2 (got {}x{})",
                self.image_width, self.image_height
            )));
        }
        if !(self.denoise_sigma >= 0.0) {
            return Err(DescriptorError::InvalidConfig(
                "denoise_sigma must be >= 0".into(),
            ));
        }
        if self.bin_count == 0 || self.bin_count > 256 {
            return Err(DescriptorError::InvalidConfig(format!(
                "bin_count must be in 1..=256 (got {})",
                self.bin_count
            )));
        }
        if self.hog_pixels_per_cell == 0 || self.hog_cells_per_block == 0 {
            return Err(DescriptorError::InvalidConfig(
                "hog cell and block sizes must be >= 1".into(),
            ));
        }
        if self.hog_orientations == 0 {
            return Err(DescriptorError::InvalidConfig(
                "hog_orientations must be >= 1".into(),
            ));
        }
        let (cells_x, cells_y) = self.hog_cells();
        if cells_x < self.hog_cells_per_block || cells_y < self.hog_cells_per_block {
            return Err(DescriptorError::InvalidConfig(format!(
                "image holds {cells_x}x{cells_y} hog cells, fewer than one {0}x{0} block",
                self.hog_cells_per_block
            )));
        }
        let (gist_w, gist_h) = self.gist_size();
        if self.gist_downsample == 0 || gist_w == 0 || gist_h == 0 {
            return Err(DescriptorError::InvalidConfig(
                "gist_downsample leaves an empty edge map".into(),
            ));
        }
        if self.dct_block_size == 0 {
            return Err(DescriptorError::InvalidConfig(
                "dct_block_size must be >= 1".into(),
            ));
        }
        if self.dct_coefficients == 0
            || self.dct_coefficients > self.dct_block_size * self.dct_block_size
        {
            return Err(DescriptorError::InvalidConfig(format!(
                "dct_coefficients must be in 1..={} (got {})",
                self.dct_block_size * self.dct_block_size,
                self.dct_coefficients
            )));
        }
        if self.dct_blocks() == 0 {
            return Err(DescriptorError::InvalidConfig(
                "image is smaller than one dct block".into(),
            ));
        }
        if self.corner_resolution < 3 {
            return Err(DescriptorError::InvalidConfig(
                "corner_resolution must be >= 3".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.corner_threshold) {
            return Err(DescriptorError::InvalidConfig(
                "corner_threshold must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }

    /// Number of whole HOG cells along x and y.
    pub fn hog_cells(&self) -> (usize, usize) {
        (
            self.image_width as usize / self.hog_pixels_per_cell.max(1),
            self.image_height as usize / self.hog_pixels_per_cell.max(1),
        )
    }

    /// Size of the downsampled scene edge map.
    pub fn gist_size(&self) -> (u32, u32) {
        let div = self.gist_downsample.max(1);
        (self.image_width / div, self.image_height / div)
    }

    /// Number of whole DCT blocks; partial boundary blocks are not counted.
    pub fn dct_blocks(&self) -> usize {
        let bs = self.dct_block_size.max(1);
        (self.image_width as usize / bs) * (self.image_height as usize / bs)
    }

    fn hog_len(&self) -> usize {
        let (cells_x, cells_y) = self.hog_cells();
        let cpb = self.hog_cells_per_block;
        let blocks_x = (cells_x + 1).saturating_sub(cpb);
        let blocks_y = (cells_y + 1).saturating_sub(cpb);
        blocks_x * blocks_y * cpb * cpb * self.hog_orientations
    }

    /// Field layout of `family` under this configuration.
    pub fn shape_of(&self, family: Family) -> FamilyShape {
        let len = match family {
            Family::Mean => None,
            Family::Histogram => Some(self.bin_count),
            Family::Texture => Some(4),
            Family::Hog => Some(self.hog_len()),
            Family::Gist => {
                let (w, h) = self.gist_size();
                Some(w as usize * h as usize)
            }
            Family::Dct => Some(self.dct_blocks() * self.dct_coefficients),
            Family::Wavelet => Some(12),
            Family::Corners => Some((self.corner_resolution * self.corner_resolution) as usize),
        };
        FamilyShape {
            family,
            fields: family.fields().iter().map(|name| (*name, len)).collect(),
        }
    }
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            version: 1,
            image_width: 128,
            image_height: 128,
            denoise_sigma: 1.0,
            bin_count: 16,
            hog_pixels_per_cell: 16,
            hog_cells_per_block: 2,
            hog_orientations: 6,
            hog_decimals: 6,
            gist_downsample: 4,
            dct_block_size: 16,
            dct_coefficients: 20,
            corner_resolution: 32,
            corner_threshold: 0.1,
            harris_k: 0.04,
            use_parallel: false,
        }
    }
}

/// Errors returned by preprocessing, extraction, and document building.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("image {width}x{height} is too small for this descriptor")]
    ImageTooSmall { width: u32, height: u32 },

    #[error("invalid descriptor config: {0}")]
    InvalidConfig(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("field `{field}` has length {actual}, expected {expected}")]
    ShapeMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DescriptorError {
    fn from(err: std::io::Error) -> Self {
        DescriptorError::Io(err.to_string())
    }
}
