//! Numeric image kernels shared by the extractors.
//!
//! Planes are `Array2<f64>` indexed `[[row, col]]`. Nothing here knows about
//! descriptor families; every function is deterministic and allocation-local.

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{Array2, ArrayView2};

/// BT.601 luma, the weighting used for the canonical intensity channel.
#[inline]
pub fn luma_601(px: [u8; 3]) -> f64 {
    0.299 * f64::from(px[0]) + 0.587 * f64::from(px[1]) + 0.114 * f64::from(px[2])
}

/// BT.709 luma on `[0, 1]` inputs, used by the scene edge map.
#[inline]
pub fn luma_709(r: f64, g: f64, b: f64) -> f64 {
    0.2125 * r + 0.7154 * g + 0.0721 * b
}

/// Map every pixel of `img` through `f` into a plane.
pub fn plane_from_rgb(img: &RgbImage, f: impl Fn([u8; 3]) -> f64) -> Array2<f64> {
    let (w, h) = img.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(r, c)| {
        f(img.get_pixel(c as u32, r as u32).0)
    })
}

/// Bilinear resize to an exact size.
pub fn resize_rgb(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::Triangle)
}

/// Half-sample symmetric index (`d c b a | a b c d`).
#[inline]
fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    let mut i = i;
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - i - 1;
        } else {
            return i as usize;
        }
    }
}

/// Whole-sample symmetric index (`d c b | a b c d`), the OpenCV default border.
#[inline]
fn reflect_101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let mut i = i;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - i - 2;
        } else {
            return i as usize;
        }
    }
}

/// Sobel derivatives `(d/dx, d/dy)` with unit-normalized 3x3 kernels scaled
/// by `scale`, sampling borders through `border`.
fn sobel_pair(
    plane: ArrayView2<'_, f64>,
    scale: f64,
    border: fn(isize, usize) -> usize,
) -> (Array2<f64>, Array2<f64>) {
    let (h, w) = plane.dim();
    let mut gx = Array2::zeros((h, w));
    let mut gy = Array2::zeros((h, w));
    for r in 0..h {
        for c in 0..w {
            let at = |dr: isize, dc: isize| {
                plane[[
                    border(r as isize + dr, h),
                    border(c as isize + dc, w),
                ]]
            };
            let dx = (at(-1, 1) + 2.0 * at(0, 1) + at(1, 1))
                - (at(-1, -1) + 2.0 * at(0, -1) + at(1, -1));
            let dy = (at(1, -1) + 2.0 * at(1, 0) + at(1, 1))
                - (at(-1, -1) + 2.0 * at(-1, 0) + at(-1, 1));
            gx[[r, c]] = dx * scale;
            gy[[r, c]] = dy * scale;
        }
    }
    (gx, gy)
}

/// Sobel gradient magnitude `sqrt((gx² + gy²) / 2)` with kernels divided by
/// four and reflect borders.
pub fn sobel_magnitude(plane: ArrayView2<'_, f64>) -> Array2<f64> {
    let (gx, gy) = sobel_pair(plane, 0.25, reflect);
    let mut out = gx;
    out.zip_mut_with(&gy, |x, &y| *x = ((*x * *x + y * y) / 2.0).sqrt());
    out
}

/// Harris corner response over a 2x2 structure-tensor window.
///
/// The window for pixel `(r, c)` covers rows `r-1..=r` and columns
/// `c-1..=c`; derivatives use reflect-101 borders.
pub fn harris_response(plane: ArrayView2<'_, f64>, k: f64) -> Array2<f64> {
    let (h, w) = plane.dim();
    let (ix, iy) = sobel_pair(plane, 1.0, reflect_101);
    let mut response = Array2::zeros((h, w));
    for r in 0..h {
        for c in 0..w {
            let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
            for dr in -1..=0isize {
                for dc in -1..=0isize {
                    let rr = reflect_101(r as isize + dr, h);
                    let cc = reflect_101(c as isize + dc, w);
                    let gx = ix[[rr, cc]];
                    let gy = iy[[rr, cc]];
                    sxx += gx * gx;
                    sxy += gx * gy;
                    syy += gy * gy;
                }
            }
            let det = sxx * syy - sxy * sxy;
            let trace = sxx + syy;
            response[[r, c]] = det - k * trace * trace;
        }
    }
    response
}

/// Orthonormal DCT-II basis: `table[u][n] = a(u) cos(pi (2n + 1) u / 2N)`.
pub fn dct_basis(n: usize) -> Array2<f64> {
    let nf = n as f64;
    Array2::from_shape_fn((n, n), |(u, x)| {
        let alpha = if u == 0 {
            (1.0 / nf).sqrt()
        } else {
            (2.0 / nf).sqrt()
        };
        alpha * (std::f64::consts::PI * (2.0 * x as f64 + 1.0) * u as f64 / (2.0 * nf)).cos()
    })
}

/// Separable orthonormal 2-D DCT-II of a square block: `B · X · Bᵀ`.
pub fn dct2(block: ArrayView2<'_, f64>, basis: &Array2<f64>) -> Array2<f64> {
    basis.dot(&block).dot(&basis.t())
}

/// Single-level 2-D Haar decomposition into `[approx, horizontal, vertical,
/// diagonal]`. Odd trailing rows or columns are mirrored.
pub fn haar2(plane: ArrayView2<'_, f64>) -> [Array2<f64>; 4] {
    let (h, w) = plane.dim();
    let (oh, ow) = (h.div_ceil(2), w.div_ceil(2));
    let mut bands = [
        Array2::zeros((oh, ow)),
        Array2::zeros((oh, ow)),
        Array2::zeros((oh, ow)),
        Array2::zeros((oh, ow)),
    ];
    let at = |r: usize, c: usize| plane[[r.min(h - 1), c.min(w - 1)]];
    for r in 0..oh {
        for c in 0..ow {
            let a = at(2 * r, 2 * c);
            let b = at(2 * r, 2 * c + 1);
            let d0 = at(2 * r + 1, 2 * c);
            let d1 = at(2 * r + 1, 2 * c + 1);
            bands[0][[r, c]] = (a + b + d0 + d1) / 2.0;
            bands[1][[r, c]] = (a + b - d0 - d1) / 2.0;
            bands[2][[r, c]] = (a - b + d0 - d1) / 2.0;
            bands[3][[r, c]] = (a - b - d0 + d1) / 2.0;
        }
    }
    bands
}
