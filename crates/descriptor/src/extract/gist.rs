//! Scene edge map: a downsampled Sobel magnitude image.

use crate::config::DescriptorConfig;
use crate::imaging::{luma_709, plane_from_rgb, resize_rgb, sobel_magnitude};
use crate::preprocess::CanonicalImage;

/// Row-major Sobel magnitude of the downsampled grayscale image.
pub fn edge_map(img: &CanonicalImage, cfg: &DescriptorConfig) -> Vec<f64> {
    let (w, h) = cfg.gist_size();
    let small = resize_rgb(img.rgb(), w.max(1), h.max(1));
    let gray = plane_from_rgb(&small, |[r, g, b]| {
        luma_709(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
        )
    });
    sobel_magnitude(gray.view()).iter().copied().collect()
}
