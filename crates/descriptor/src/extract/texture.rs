//! Gray-level co-occurrence texture statistics.

use ndarray::{Array2, ArrayView2};

use crate::config::DescriptorError;
use crate::preprocess::CanonicalImage;

const LEVELS: usize = 256;

/// `(dx, dy)` offsets: right, down, diagonal, anti-diagonal.
pub const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (-1, 1)];

/// Six statistics, each with one value per direction in [`DIRECTIONS`] order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextureStats {
    pub energy: Vec<f64>,
    pub contrast: Vec<f64>,
    pub entropy: Vec<f64>,
    pub dissimilarity: Vec<f64>,
    pub homogeneity: Vec<f64>,
    pub correlation: Vec<f64>,
}

/// Symmetric normalized co-occurrence matrix for one offset.
fn cooccurrence(gray: ArrayView2<'_, u8>, dx: isize, dy: isize) -> Option<Array2<f64>> {
    let (h, w) = gray.dim();
    let mut counts = Array2::<f64>::zeros((LEVELS, LEVELS));
    let mut total = 0.0;
    for r in 0..h {
        let rr = r as isize + dy;
        if rr < 0 || rr >= h as isize {
            continue;
        }
        for c in 0..w {
            let cc = c as isize + dx;
            if cc < 0 || cc >= w as isize {
                continue;
            }
            let i = usize::from(gray[[r, c]]);
            let j = usize::from(gray[[rr as usize, cc as usize]]);
            counts[[i, j]] += 1.0;
            counts[[j, i]] += 1.0;
            total += 2.0;
        }
    }
    if total == 0.0 {
        return None;
    }
    counts.mapv_inplace(|v| v / total);
    Some(counts)
}

/// Compute all six statistics for every direction.
pub fn glcm_stats(img: &CanonicalImage) -> Result<TextureStats, DescriptorError> {
    let gray = img.intensity_u8();
    let (h, w) = gray.dim();
    if h < 2 || w < 2 {
        return Err(DescriptorError::ImageTooSmall {
            width: w as u32,
            height: h as u32,
        });
    }

    let mut stats = TextureStats::default();
    for (dx, dy) in DIRECTIONS {
        let p = cooccurrence(gray.view(), dx, dy).ok_or(DescriptorError::ImageTooSmall {
            width: w as u32,
            height: h as u32,
        })?;

        let (mut asm, mut contrast, mut dissim, mut homog, mut entropy) =
            (0.0, 0.0, 0.0, 0.0, 0.0);
        let (mut mu_i, mut mu_j) = (0.0, 0.0);
        for ((i, j), &v) in p.indexed_iter() {
            if v == 0.0 {
                continue;
            }
            let d = i as f64 - j as f64;
            asm += v * v;
            contrast += v * d * d;
            dissim += v * d.abs();
            homog += v / (1.0 + d * d);
            entropy -= v * v.log2();
            mu_i += v * i as f64;
            mu_j += v * j as f64;
        }

        let (mut var_i, mut var_j, mut cov) = (0.0, 0.0, 0.0);
        for ((i, j), &v) in p.indexed_iter() {
            if v == 0.0 {
                continue;
            }
            let di = i as f64 - mu_i;
            let dj = j as f64 - mu_j;
            var_i += v * di * di;
            var_j += v * dj * dj;
            cov += v * di * dj;
        }
        let (sigma_i, sigma_j) = (var_i.sqrt(), var_j.sqrt());
        let correlation = if sigma_i < 1e-15 || sigma_j < 1e-15 {
            1.0
        } else {
            cov / (sigma_i * sigma_j)
        };

        stats.energy.push(asm.sqrt());
        stats.contrast.push(contrast);
        stats.entropy.push(entropy);
        stats.dissimilarity.push(dissim);
        stats.homogeneity.push(homog);
        stats.correlation.push(correlation);
    }
    Ok(stats)
}
