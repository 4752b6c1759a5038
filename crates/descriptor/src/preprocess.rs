//! Canonicalization of raw images before descriptor extraction.
//!
//! Every image, stored or queried, passes through [`preprocess`]: RGB8
//! conversion, an exact resize to the configured canonical size and an
//! optional Gaussian denoise. Extractors only ever see a [`CanonicalImage`].

use image::{imageops, DynamicImage, RgbImage};
use ndarray::Array2;
use tracing::debug;

use crate::config::{DescriptorConfig, DescriptorError};
use crate::imaging::{luma_601, plane_from_rgb, resize_rgb};

/// A denoised RGB8 image at the canonical size.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalImage {
    rgb: RgbImage,
}

impl CanonicalImage {
    /// Wrap an RGB buffer that is already canonical. No resizing happens.
    pub fn from_rgb(rgb: RgbImage) -> Self {
        Self { rgb }
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    /// One color channel (`0` = R, `1` = G, `2` = B) on the 0-255 scale.
    pub fn channel(&self, index: usize) -> Array2<f64> {
        plane_from_rgb(&self.rgb, |px| f64::from(px[index.min(2)]))
    }

    /// BT.601 intensity rounded to u8, as used by histograms and GLCM.
    pub fn intensity_u8(&self) -> Array2<u8> {
        let (w, h) = self.rgb.dimensions();
        Array2::from_shape_fn((h as usize, w as usize), |(r, c)| {
            intensity_byte(self.rgb.get_pixel(c as u32, r as u32).0)
        })
    }

    /// BT.601 intensity scaled to `[0, 1]`.
    pub fn intensity_unit(&self) -> Array2<f64> {
        plane_from_rgb(&self.rgb, |px| luma_601(px) / 255.0)
    }
}

/// Rounded BT.601 intensity of one pixel.
#[inline]
pub(crate) fn intensity_byte(px: [u8; 3]) -> u8 {
    luma_601(px).round().clamp(0.0, 255.0) as u8
}

/// Canonicalize a decoded image.
pub fn preprocess(
    raw: &DynamicImage,
    cfg: &DescriptorConfig,
) -> Result<CanonicalImage, DescriptorError> {
    if raw.width() == 0 || raw.height() == 0 {
        return Err(DescriptorError::ImageTooSmall {
            width: raw.width(),
            height: raw.height(),
        });
    }
    let rgb = raw.to_rgb8();
    let resized = resize_rgb(&rgb, cfg.image_width, cfg.image_height);
    let canonical = if cfg.denoise_sigma > 0.0 {
        imageops::blur(&resized, cfg.denoise_sigma)
    } else {
        resized
    };
    debug!(
        src_width = raw.width(),
        src_height = raw.height(),
        width = canonical.width(),
        height = canonical.height(),
        "preprocess_done"
    );
    Ok(CanonicalImage { rgb: canonical })
}

/// Decode raw bytes (png, jpeg, bmp).
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, DescriptorError> {
    if bytes.is_empty() {
        return Err(DescriptorError::Decode("empty input".into()));
    }
    image::load_from_memory(bytes).map_err(|err| DescriptorError::Decode(err.to_string()))
}

/// Decode and canonicalize in one step.
pub fn decode_and_preprocess(
    bytes: &[u8],
    cfg: &DescriptorConfig,
) -> Result<CanonicalImage, DescriptorError> {
    let raw = decode(bytes)?;
    preprocess(&raw, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_bytes(img: &RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn resizes_to_canonical_size() {
        let cfg = DescriptorConfig::default();
        let raw = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 40, Rgb([10, 20, 30])));
        let img = preprocess(&raw, &cfg).unwrap();
        assert_eq!((img.width(), img.height()), (128, 128));
    }

    #[test]
    fn flat_image_survives_denoise() {
        let cfg = DescriptorConfig::default();
        let raw = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([200, 0, 0])));
        let img = preprocess(&raw, &cfg).unwrap();
        let px = img.rgb().get_pixel(64, 64).0;
        assert!(px[0] >= 198 && px[1] <= 2 && px[2] <= 2, "{px:?}");
    }

    #[test]
    fn decode_rejects_garbage() {
        let cfg = DescriptorConfig::default();
        let err = decode_and_preprocess(b"definitely not an image", &cfg).unwrap_err();
        assert!(matches!(err, DescriptorError::Decode(_)));
        assert!(matches!(decode(&[]), Err(DescriptorError::Decode(_))));
    }

    #[test]
    fn decode_roundtrips_png() {
        let cfg = DescriptorConfig::default().with_denoise_sigma(0.0);
        let bytes = png_bytes(&RgbImage::from_pixel(128, 128, Rgb([1, 2, 3])));
        let img = decode_and_preprocess(&bytes, &cfg).unwrap();
        assert_eq!(img.rgb().get_pixel(5, 5).0, [1, 2, 3]);
    }

    #[test]
    fn intensity_uses_bt601_weights() {
        let img = CanonicalImage::from_rgb(RgbImage::from_pixel(2, 2, Rgb([255, 0, 0])));
        assert_eq!(img.intensity_u8()[[0, 0]], 76);
        assert!((img.intensity_unit()[[1, 1]] - 0.299).abs() < 1e-9);
        assert_eq!(img.channel(0)[[0, 1]], 255.0);
        assert_eq!(img.channel(2)[[0, 1]], 0.0);
    }
}
