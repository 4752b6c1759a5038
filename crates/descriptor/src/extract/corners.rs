//! Binary Harris corner map.

use crate::config::DescriptorConfig;
use crate::imaging::{harris_response, plane_from_rgb, resize_rgb};
use crate::preprocess::{intensity_byte, CanonicalImage};

/// `1.0` where the Harris response exceeds `corner_threshold · max`, row-major.
pub fn corner_map(img: &CanonicalImage, cfg: &DescriptorConfig) -> Vec<f64> {
    let side = cfg.corner_resolution.max(1);
    let small = resize_rgb(img.rgb(), side, side);
    let gray = plane_from_rgb(&small, |px| f64::from(intensity_byte(px)));
    let response = harris_response(gray.view(), cfg.harris_k);

    let max = response.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !(max > 0.0) {
        return vec![0.0; response.len()];
    }
    let cutoff = cfg.corner_threshold * max;
    response
        .iter()
        .map(|&r| if r > cutoff { 1.0 } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn flat_image_has_no_corners() {
        let cfg = DescriptorConfig::default();
        let img = CanonicalImage::from_rgb(RgbImage::from_pixel(128, 128, Rgb([70, 80, 90])));
        let map = corner_map(&img, &cfg);
        assert_eq!(map.len(), 1024);
        assert!(map.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn square_produces_binary_corners() {
        let cfg = DescriptorConfig::default();
        let rgb = RgbImage::from_fn(128, 128, |x, y| {
            if (32..96).contains(&x) && (32..96).contains(&y) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let map = corner_map(&CanonicalImage::from_rgb(rgb), &cfg);
        assert!(map.iter().all(|v| *v == 0.0 || *v == 1.0));
        let hits = map.iter().filter(|v| **v == 1.0).count();
        assert!(hits > 0 && hits < map.len() / 4, "{hits}");
    }
}
