use std::f32::consts::PI;

/// DCT-II over `log_energies`, keeping the first `cepstral_count`
/// coefficients (§4.1 step 7).
pub(super) fn dct2(log_energies: &[f32], cepstral_count: usize) -> Vec<f32> {
    let n = log_energies.len() as f32;
    (0..cepstral_count)
        .map(|k| {
            let sum: f32 = log_energies
                .iter()
                .enumerate()
                .map(|(i, &e)| e * (PI / n * (i as f32 + 0.5) * k as f32).cos())
                .sum();
            sum
        })
        .collect()
}

/// Liftering (§4.1 step 8): `c_k <- c_k * (1 + (L/2) sin(pi*k/L))`.
///
/// `sin(0) == 0`, so `c_0` is left unchanged without a special case.
pub(super) fn lifter(coeffs: &mut [f32], liftering: f64) {
    if liftering <= 0.0 {
        return;
    }
    let l = liftering as f32;
    for (k, c) in coeffs.iter_mut().enumerate() {
        let scale = 1.0 + (l / 2.0) * (PI * k as f32 / l).sin();
        *c *= scale;
    }
}
