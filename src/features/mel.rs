use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::error::{AlignError, Result};

/// Triangular mel filterbank (§4.1 step 5), equally spaced on the mel
/// scale between `low_freq_hz` and `high_freq_hz`.
pub(super) struct MelFilterbank {
    /// `[filter_bank_count, n_bins]`, row-major.
    weights: Vec<f32>,
    filter_bank_count: usize,
    n_bins: usize,
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

impl MelFilterbank {
    pub(super) fn new(
        filter_bank_count: usize,
        fft_order: usize,
        sample_rate: f64,
        low_freq_hz: f64,
        high_freq_hz: f64,
    ) -> Result<Self> {
        let nyquist = sample_rate / 2.0;
        if low_freq_hz < 0.0 || high_freq_hz > nyquist + 1e-6 {
            return Err(AlignError::InvalidConfig(format!(
                "mel frequency range [{low_freq_hz}, {high_freq_hz}] must lie within [0, {nyquist}]"
            )));
        }
        let n_bins = fft_order / 2 + 1;
        let mel_low = hz_to_mel(low_freq_hz);
        let mel_high = hz_to_mel(high_freq_hz);

        // filter_bank_count triangular filters need filter_bank_count + 2
        // equally-spaced mel edges.
        let edge_count = filter_bank_count + 2;
        let mel_edges: Vec<f64> = (0..edge_count)
            .map(|i| mel_low + (mel_high - mel_low) * i as f64 / (edge_count - 1) as f64)
            .collect();
        let hz_edges: Vec<f64> = mel_edges.iter().map(|&m| mel_to_hz(m)).collect();
        let bin_edges: Vec<f64> = hz_edges
            .iter()
            .map(|&hz| (hz * fft_order as f64 / sample_rate).floor())
            .collect();

        let mut weights = vec![0.0_f32; filter_bank_count * n_bins];
        for m in 0..filter_bank_count {
            let left = bin_edges[m];
            let center = bin_edges[m + 1];
            let right = bin_edges[m + 2];
            for bin in 0..n_bins {
                let b = bin as f64;
                let w = if b < left || b > right {
                    0.0
                } else if b <= center {
                    if (center - left).abs() < f64::EPSILON {
                        0.0
                    } else {
                        (b - left) / (center - left)
                    }
                } else if (right - center).abs() < f64::EPSILON {
                    0.0
                } else {
                    (right - b) / (right - center)
                };
                weights[m * n_bins + bin] = w.max(0.0) as f32;
            }
        }

        Ok(Self {
            weights,
            filter_bank_count,
            n_bins,
        })
    }

    /// Applies the filterbank to a magnitude spectrum, producing one
    /// weighted-sum energy per filter.
    pub(super) fn apply(&self, magnitudes: &[f32]) -> Vec<f32> {
        debug_assert_eq!(magnitudes.len(), self.n_bins);
        let mut out = vec![0.0_f32; self.filter_bank_count];
        for m in 0..self.filter_bank_count {
            let row = &self.weights[m * self.n_bins..(m + 1) * self.n_bins];
            out[m] = row.iter().zip(magnitudes.iter()).map(|(w, e)| w * e).sum();
        }
        out
    }
}

/// Holds a reusable FFT plan and scratch buffer across frames within one
/// extraction call.
pub(super) struct SpectrumScratch {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    n_bins: usize,
}

impl SpectrumScratch {
    pub(super) fn new(fft_order: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_order);
        Self {
            fft,
            buffer: vec![Complex::new(0.0, 0.0); fft_order],
            n_bins: fft_order / 2 + 1,
        }
    }

    /// Computes the magnitude spectrum (bins `0..=fft_order/2`) of an
    /// already-windowed, zero-padded frame of length `fft_order`.
    pub(super) fn magnitude_spectrum(&mut self, windowed: &[f32]) -> Vec<f32> {
        for (c, &s) in self.buffer.iter_mut().zip(windowed.iter()) {
            *c = Complex::new(s, 0.0);
        }
        self.fft.process(&mut self.buffer);
        self.buffer[..self.n_bins].iter().map(|c| c.norm()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filterbank_shape_matches_requested_band_count() {
        let fb = MelFilterbank::new(40, 512, 16_000.0, 0.0, 8000.0).unwrap();
        assert_eq!(fb.weights.len(), 40 * (512 / 2 + 1));
        let nonzero = fb.weights.iter().filter(|&&w| w > 0.0).count();
        assert!(nonzero > 0);
    }

    #[test]
    fn filterbank_rejects_range_outside_nyquist() {
        let result = MelFilterbank::new(40, 512, 16_000.0, 0.0, 9000.0);
        assert!(result.is_err());
    }

    #[test]
    fn magnitude_spectrum_of_dc_signal_concentrates_energy_in_bin_zero() {
        let mut scratch = SpectrumScratch::new(8);
        let frame = vec![1.0_f32; 8];
        let mags = scratch.magnitude_spectrum(&frame);
        assert_eq!(mags.len(), 5);
        assert!(mags[0] > mags[1]);
    }
}
