//! C1: streaming MFCC feature extraction (framing, windowing, spectrum,
//! mel filterbank, log compression, DCT, liftering).

mod dct;
mod mel;
mod window;

use ndarray::Array2;

use crate::config::MfccConfig;
use crate::error::{AlignError, Result};

const EPSILON: f32 = 1e-10;
const TARGET_SAMPLE_RATE: u32 = 16_000;

/// An ordered sequence of fixed-length MFCC vectors, carrying the hop
/// duration needed to map a frame index back to a centre time.
#[derive(Debug, Clone)]
pub struct MfccFrameSequence {
    /// `[frame_count, cepstral_count]`, row-major frames.
    pub frames: Array2<f32>,
    pub hop_duration: f64,
    pub window_duration: f64,
}

impl MfccFrameSequence {
    pub fn frame_count(&self) -> usize {
        self.frames.nrows()
    }

    pub fn feature_dim(&self) -> usize {
        self.frames.ncols()
    }

    /// Centre time of frame `i`, per §4.1 step 2.
    pub fn frame_time(&self, i: usize) -> f64 {
        i as f64 * self.hop_duration
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }
}

/// Extracts MFCC features from a mono 16 kHz float signal per §4.1.
#[derive(Debug, Default)]
pub struct FeatureExtractor {}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extract(
        &self,
        samples: &[f32],
        sample_rate: u32,
        config: &MfccConfig,
    ) -> Result<MfccFrameSequence> {
        validate_audio(samples, sample_rate)?;
        config.validate(sample_rate)?;

        let pre_emphasized = apply_preemphasis(samples, config.preemphasis);
        let hop_len = (config.hop_duration * sample_rate as f64).round() as usize;
        let window_len = (config.window_duration * sample_rate as f64).round() as usize;
        let frames = window::frame_signal(&pre_emphasized, window_len, hop_len);
        let hann = window::hann_window(window_len);

        let filterbank = mel::MelFilterbank::new(
            config.filter_bank_count,
            config.fft_order,
            sample_rate as f64,
            config.low_freq_hz,
            config.high_freq_hz,
        )?;

        let mut fft_scratch = mel::SpectrumScratch::new(config.fft_order);
        let mut cepstra = Vec::with_capacity(frames.len() * config.cepstral_count);

        for frame in &frames {
            let windowed = window::apply_window(frame, &hann, config.fft_order);
            let magnitudes = fft_scratch.magnitude_spectrum(&windowed);
            let mel_energies = filterbank.apply(&magnitudes);
            let log_energies: Vec<f32> = mel_energies
                .iter()
                .map(|&e| e.max(EPSILON).ln())
                .collect();
            let mut coeffs = dct::dct2(&log_energies, config.cepstral_count);
            dct::lifter(&mut coeffs, config.liftering);
            cepstra.extend(coeffs);
        }

        let frame_count = frames.len();
        let array = Array2::from_shape_vec((frame_count, config.cepstral_count), cepstra)
            .expect("cepstra length matches frame_count * cepstral_count by construction");

        Ok(MfccFrameSequence {
            frames: array,
            hop_duration: config.hop_duration,
            window_duration: config.window_duration,
        })
    }
}

fn apply_preemphasis(samples: &[f32], alpha: f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(samples.len());
    let mut previous = 0.0_f32;
    for &x in samples {
        out.push(x - alpha * previous);
        previous = x;
    }
    out
}

fn validate_audio(samples: &[f32], sample_rate: u32) -> Result<()> {
    if sample_rate != TARGET_SAMPLE_RATE {
        return Err(AlignError::InvalidAudio(format!(
            "expected {TARGET_SAMPLE_RATE} Hz mono audio, got {sample_rate} Hz"
        )));
    }
    if samples.is_empty() {
        return Err(AlignError::InvalidAudio("audio signal is empty".into()));
    }
    if samples.iter().any(|s| !s.is_finite()) {
        return Err(AlignError::InvalidAudio(
            "audio signal contains NaN or infinite samples".into(),
        ));
    }
    Ok(())
}
