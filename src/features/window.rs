use std::f32::consts::PI;

/// Periodic Hann window of length `n`, `w[i] = 0.5 * (1 - cos(2*pi*i/n))`.
pub(super) fn hann_window(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos()))
        .collect()
}

/// Splits `samples` into overlapping frames of `window_len` samples with a
/// `hop_len`-sample stride. The final frame is zero-padded if it runs past
/// the end of `samples`.
pub(super) fn frame_signal(samples: &[f32], window_len: usize, hop_len: usize) -> Vec<Vec<f32>> {
    let hop_len = hop_len.max(1);
    let mut frames = Vec::new();
    let mut start = 0usize;
    loop {
        let mut frame = vec![0.0_f32; window_len];
        let available = samples.len().saturating_sub(start).min(window_len);
        frame[..available].copy_from_slice(&samples[start..start + available]);
        frames.push(frame);
        if start + window_len >= samples.len() {
            break;
        }
        start += hop_len;
    }
    frames
}

/// Multiplies a frame by the Hann window and zero-pads to `fft_order`.
pub(super) fn apply_window(frame: &[f32], hann: &[f32], fft_order: usize) -> Vec<f32> {
    let mut out = vec![0.0_f32; fft_order];
    for (i, (&s, &w)) in frame.iter().zip(hann.iter()).enumerate() {
        out[i] = s * w;
    }
    out
}
