//! Color statistics: channel means and per-channel histograms.

use crate::preprocess::{intensity_byte, CanonicalImage};

/// Mean of R, G, B and intensity, in that order, on the 0-255 scale.
pub fn channel_means(img: &CanonicalImage) -> [f64; 4] {
    let mut sums = [0u64; 4];
    let mut n = 0u64;
    for px in img.rgb().pixels() {
        let [r, g, b] = px.0;
        sums[0] += u64::from(r);
        sums[1] += u64::from(g);
        sums[2] += u64::from(b);
        sums[3] += u64::from(intensity_byte(px.0));
        n += 1;
    }
    if n == 0 {
        return [0.0; 4];
    }
    sums.map(|s| s as f64 / n as f64)
}

/// L1-normalized histograms of R, G, B and intensity over `[0, 256)`.
///
/// A channel with no samples stays all-zero.
pub fn channel_histograms(img: &CanonicalImage, bins: usize) -> [Vec<f64>; 4] {
    let bins = bins.max(1);
    let mut counts = [
        vec![0u64; bins],
        vec![0u64; bins],
        vec![0u64; bins],
        vec![0u64; bins],
    ];
    let bin_of = |v: u8| usize::from(v) * bins / 256;
    for px in img.rgb().pixels() {
        let [r, g, b] = px.0;
        counts[0][bin_of(r)] += 1;
        counts[1][bin_of(g)] += 1;
        counts[2][bin_of(b)] += 1;
        counts[3][bin_of(intensity_byte(px.0))] += 1;
    }
    counts.map(|channel| {
        let total: u64 = channel.iter().sum();
        if total == 0 {
            return vec![0.0; bins];
        }
        channel
            .into_iter()
            .map(|c| c as f64 / total as f64)
            .collect()
    })
}
