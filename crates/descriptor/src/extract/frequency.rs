//! Block DCT coefficients of the intensity plane.

use ndarray::s;

use crate::config::DescriptorConfig;
use crate::imaging::{dct2, dct_basis};
use crate::preprocess::CanonicalImage;

/// Leading coefficients of every whole block, blocks in row-major order.
pub fn block_dct(img: &CanonicalImage, cfg: &DescriptorConfig) -> Vec<f64> {
    let gray = img.intensity_unit();
    let (h, w) = gray.dim();
    let bs = cfg.dct_block_size.max(1);
    let keep = cfg.dct_coefficients.min(bs * bs);
    let basis = dct_basis(bs);

    let mut out = Vec::with_capacity((h / bs) * (w / bs) * keep);
    for by in 0..h / bs {
        for bx in 0..w / bs {
            let block = gray.slice(s![by * bs..(by + 1) * bs, bx * bs..(bx + 1) * bs]);
            let coeffs = dct2(block, &basis);
            out.extend(coeffs.iter().take(keep).copied());
        }
    }
    out
}
