//! Thresholding primitives shared by marker detection and post-processing.

use crate::GrayImageView;

/// 256-bin intensity histogram.
pub fn histogram(img: &GrayImageView<'_>) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in img.data {
        hist[v as usize] += 1;
    }
    hist
}

/// Compute Otsu threshold from a set of sample intensities.
///
/// Values strictly below the returned threshold belong to the dark class.
pub fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 127;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    otsu_threshold_from_histogram(&hist)
}

/// Otsu threshold of a histogram; see [`otsu_threshold_from_samples`].
pub fn otsu_threshold_from_histogram(hist: &[u32; 256]) -> u8 {
    let Some(min_v) = hist.iter().position(|&h| h > 0) else {
        return 127;
    };
    let max_v = hist.iter().rposition(|&h| h > 0).unwrap_or(min_v);
    if min_v == max_v {
        return min_v as u8;
    }

    let nonzero_bins = hist.iter().filter(|&&h| h > 0).count();
    if nonzero_bins <= 2 {
        // Two populated bins: split halfway so that both classes survive
        // the `< threshold` test.
        return ((min_v + max_v + 1) / 2) as u8;
    }

    let total: f64 = hist.iter().map(|&h| h as f64).sum();
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127usize;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        sum_b += (t as f64) * (h as f64);
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t;
        }
    }

    // `best_t` is the last bin of the dark class.
    (best_t + 1).min(255) as u8
}

/// Summed-area table with one row/column of zero padding.
pub struct IntegralImage {
    width: usize,
    height: usize,
    sums: Vec<u64>,
}

impl IntegralImage {
    pub fn new(img: &GrayImageView<'_>) -> Self {
        let w = img.width + 1;
        let mut sums = vec![0u64; w * (img.height + 1)];
        for y in 0..img.height {
            let mut row = 0u64;
            for x in 0..img.width {
                row += img.data[y * img.width + x] as u64;
                sums[(y + 1) * w + x + 1] = sums[y * w + x + 1] + row;
            }
        }
        Self {
            width: img.width,
            height: img.height,
            sums,
        }
    }

    /// Mean over the window of `radius` around `(x, y)`, clipped to the image.
    pub fn window_mean(&self, x: usize, y: usize, radius: usize) -> f32 {
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius + 1).min(self.width);
        let y1 = (y + radius + 1).min(self.height);
        let w = self.width + 1;
        let sum = self.sums[y1 * w + x1] + self.sums[y0 * w + x0]
            - self.sums[y0 * w + x1]
            - self.sums[y1 * w + x0];
        let area = ((x1 - x0) * (y1 - y0)).max(1);
        sum as f32 / area as f32
    }
}

/// Dark-pixel mask: `true` where `v + offset < local mean`.
pub fn adaptive_mean_dark(img: &GrayImageView<'_>, radius: usize, offset: f32) -> Vec<bool> {
    let integral = IntegralImage::new(img);
    let mut out = Vec::with_capacity(img.data.len());
    for y in 0..img.height {
        for x in 0..img.width {
            let v = img.data[y * img.width + x] as f32;
            out.push(v + offset < integral.window_mean(x, y, radius));
        }
    }
    out
}

/// Dark-pixel mask: `true` where `v < threshold`.
pub fn global_dark(img: &GrayImageView<'_>, threshold: u8) -> Vec<bool> {
    img.data.iter().map(|&v| v < threshold).collect()
}
