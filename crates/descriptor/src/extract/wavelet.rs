//! Single-level Haar sub-band statistics.

use crate::imaging::haar2;
use crate::preprocess::CanonicalImage;

/// Energy, population std and mean for the approximation, horizontal,
/// vertical and diagonal sub-bands, sub-band-major.
pub fn subband_stats(img: &CanonicalImage) -> Vec<f64> {
    let gray = img.intensity_unit();
    if gray.is_empty() {
        return vec![0.0; 12];
    }
    let bands = haar2(gray.view());
    let mut out = Vec::with_capacity(12);
    for band in &bands {
        let n = band.len() as f64;
        let energy: f64 = band.iter().map(|v| v * v).sum();
        let mean = band.sum() / n;
        let var = band.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        out.push(energy);
        out.push(var.sqrt());
        out.push(mean);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn flat_image_has_energy_only_in_approximation() {
        let img = CanonicalImage::from_rgb(RgbImage::from_pixel(4, 4, Rgb([255, 255, 255])));
        let stats = subband_stats(&img);
        assert_eq!(stats.len(), 12);
        // 2x2 approximation band of value 2 each
        assert!((stats[0] - 16.0).abs() < 1e-9);
        assert!(stats[1].abs() < 1e-9);
        assert!((stats[2] - 2.0).abs() < 1e-9);
        assert!(stats[3..].iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn horizontal_stripes_land_in_horizontal_band() {
        let rgb = RgbImage::from_fn(8, 8, |_, y| {
            if y % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let stats = subband_stats(&CanonicalImage::from_rgb(rgb));
        assert!(stats[3] > 1.0);
        assert!(stats[6].abs() < 1e-9);
        assert!(stats[9].abs() < 1e-9);
    }
}
