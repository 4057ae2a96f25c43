//! C2: per-frame pairwise cost over feature vectors.

use ndarray::ArrayView1;

/// Distance metric used by the DTW engine. Modeled as an enum rather than
/// a trait object: there are exactly two supported metrics, and the
/// dispatch is hot-path code inside the DTW inner loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// `sqrt(sum((a_k - b_k)^2))`, the default for MFCC vectors.
    Euclidean,
    /// `1 - cos(a, b)`, clamped to `[0, 2]`, used for embedding vectors.
    Cosine,
}

impl Metric {
    pub fn distance(self, a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
        match self {
            Metric::Euclidean => euclidean(a, b),
            Metric::Cosine => cosine(a, b),
        }
    }
}

fn euclidean(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum::<f32>()
        .sqrt()
}

fn cosine(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 1.0;
    }
    let similarity = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    (1.0 - similarity).clamp(0.0, 2.0)
}
