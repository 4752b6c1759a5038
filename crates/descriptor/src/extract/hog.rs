//! Histogram of oriented gradients over the intensity plane.

use ndarray::{Array2, Array3};

use crate::config::{DescriptorConfig, DescriptorError};
use crate::preprocess::CanonicalImage;

const EPS: f64 = 1e-5;
const HYS_CLIP: f64 = 0.2;

/// HOG feature vector in `(block_row, block_col, cell_row, cell_col, bin)`
/// order, rounded to `cfg.hog_decimals`.
pub fn hog_features(img: &CanonicalImage, cfg: &DescriptorConfig) -> Result<Vec<f64>, DescriptorError> {
    let gray = img.intensity_unit();
    let (h, w) = gray.dim();
    let ppc = cfg.hog_pixels_per_cell.max(1);
    let cpb = cfg.hog_cells_per_block.max(1);
    let bins = cfg.hog_orientations.max(1);
    let (cells_y, cells_x) = (h / ppc, w / ppc);
    if cells_y < cpb || cells_x < cpb {
        return Err(DescriptorError::ImageTooSmall {
            width: w as u32,
            height: h as u32,
        });
    }

    // Central differences; the outermost rows and columns stay zero.
    let mut g_row = Array2::<f64>::zeros((h, w));
    let mut g_col = Array2::<f64>::zeros((h, w));
    for r in 1..h.saturating_sub(1) {
        for c in 0..w {
            g_row[[r, c]] = gray[[r + 1, c]] - gray[[r - 1, c]];
        }
    }
    for r in 0..h {
        for c in 1..w.saturating_sub(1) {
            g_col[[r, c]] = gray[[r, c + 1]] - gray[[r, c - 1]];
        }
    }

    let bin_width = 180.0 / bins as f64;
    let mut cells = Array3::<f64>::zeros((cells_y, cells_x, bins));
    for r in 0..cells_y * ppc {
        for c in 0..cells_x * ppc {
            let gy = g_row[[r, c]];
            let gx = g_col[[r, c]];
            let magnitude = gy.hypot(gx);
            if magnitude == 0.0 {
                continue;
            }
            let angle = gy.atan2(gx).to_degrees().rem_euclid(180.0);
            let bin = ((angle / bin_width) as usize).min(bins - 1);
            cells[[r / ppc, c / ppc, bin]] += magnitude;
        }
    }
    let cell_area = (ppc * ppc) as f64;
    cells.mapv_inplace(|v| v / cell_area);

    let (blocks_y, blocks_x) = (cells_y + 1 - cpb, cells_x + 1 - cpb);
    let scale = 10f64.powi(cfg.hog_decimals as i32);
    let mut out = Vec::with_capacity(blocks_y * blocks_x * cpb * cpb * bins);
    let mut block = Vec::with_capacity(cpb * cpb * bins);
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            block.clear();
            for cy in by..by + cpb {
                for cx in bx..bx + cpb {
                    for b in 0..bins {
                        block.push(cells[[cy, cx, b]]);
                    }
                }
            }
            l2_hys(&mut block);
            out.extend(block.iter().map(|v| (v * scale).round() / scale));
        }
    }
    Ok(out)
}

fn l2_hys(block: &mut [f64]) {
    let norm = (block.iter().map(|v| v * v).sum::<f64>() + EPS * EPS).sqrt();
    for v in block.iter_mut() {
        *v = (*v / norm).min(HYS_CLIP);
    }
    let norm = (block.iter().map(|v| v * v).sum::<f64>() + EPS * EPS).sqrt();
    for v in block.iter_mut() {
        *v /= norm;
    }
}
