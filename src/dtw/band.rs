use crate::error::{AlignError, Result};

use super::path::WarpingPath;

/// A Sakoe-Chiba style band: for each source frame `i`, a closed interval
/// `[lo_i, hi_i]` over reference frame indices (§3 `CostBand`).
#[derive(Debug, Clone)]
pub struct CostBand {
    lo: Vec<usize>,
    hi: Vec<usize>,
}

/// The minimum window width (in frames) for which a uniform band can
/// possibly connect `(0, 0)` to `(n_s - 1, n_r - 1)`: the band must be at
/// least as wide as the gap between the two sequence lengths.
fn minimum_feasible_width(n_s: usize, n_r: usize) -> usize {
    n_s.abs_diff(n_r) + 1
}

impl CostBand {
    pub fn n_rows(&self) -> usize {
        self.lo.len()
    }

    pub fn lo(&self, i: usize) -> usize {
        self.lo[i]
    }

    pub fn hi(&self, i: usize) -> usize {
        self.hi[i]
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        i < self.lo.len() && j >= self.lo[i] && j <= self.hi[i]
    }

    /// Total number of in-band cells, used to check the multi-pass
    /// "non-increasing area" planning guideline (§4.3).
    pub fn area(&self) -> usize {
        self.lo
            .iter()
            .zip(self.hi.iter())
            .map(|(&lo, &hi)| hi - lo + 1)
            .sum()
    }

    /// Builds a single-pass, diagonal-centred band of width `window_frames`
    /// (§4.3 "Single pass, uniform width").
    pub fn uniform(n_s: usize, n_r: usize, window_frames: usize) -> Result<Self> {
        if n_s == 0 || n_r == 0 {
            return Err(AlignError::EmptyInput(
                "DTW requires non-empty source and reference sequences".into(),
            ));
        }
        let min_width = minimum_feasible_width(n_s, n_r);
        if window_frames < min_width {
            return Err(AlignError::BandInfeasible {
                suggested_width: min_width,
            });
        }

        let half = (window_frames / 2) as i64;
        let mut lo = Vec::with_capacity(n_s);
        let mut hi = Vec::with_capacity(n_s);
        for i in 0..n_s {
            let center = ((i as f64 * n_r as f64 / n_s as f64).round()) as i64;
            let row_lo = (center - half).max(0) as usize;
            let row_lo = row_lo.min(n_r - 1);
            let row_hi = (row_lo + window_frames - 1).min(n_r - 1);
            lo.push(row_lo);
            hi.push(row_hi);
        }
        // Monotonicity is a consequence of the formula above (both center
        // and half are non-decreasing along i), but cheap to reassert.
        for i in 1..n_s {
            lo[i] = lo[i].max(lo[i - 1]);
            hi[i] = hi[i].max(hi[i - 1]).min(n_r - 1);
        }
        lo[0] = 0;
        hi[n_s - 1] = n_r - 1;

        let band = Self { lo, hi };
        band.check_connected(n_s, n_r)?;
        Ok(band)
    }

    /// Builds a narrower band for a refining pass, centred on a coarse
    /// path projected into the finer grid by the ratio of hop durations
    /// (§4.3 "Multi-pass refinement").
    pub fn from_coarse_path(
        coarse_path: &WarpingPath,
        coarse_n_s: usize,
        n_s_fine: usize,
        n_r_fine: usize,
        hop_ratio: f64,
        window_frames: usize,
    ) -> Result<Self> {
        if n_s_fine == 0 || n_r_fine == 0 {
            return Err(AlignError::EmptyInput(
                "DTW requires non-empty source and reference sequences".into(),
            ));
        }
        let min_width = minimum_feasible_width(n_s_fine, n_r_fine);
        if window_frames < min_width {
            return Err(AlignError::BandInfeasible {
                suggested_width: min_width,
            });
        }

        let last_ref = coarse_path.last_ref_per_source(coarse_n_s);
        let filled = forward_and_backward_fill(&last_ref);

        let half = (window_frames / 2) as i64;
        let mut lo = Vec::with_capacity(n_s_fine);
        let mut hi = Vec::with_capacity(n_s_fine);
        for i_fine in 0..n_s_fine {
            let i_coarse = ((i_fine as f64) / hop_ratio).floor() as usize;
            let i_coarse = i_coarse.min(filled.len().saturating_sub(1));
            let projected_j = (filled[i_coarse] as f64 * hop_ratio).round() as i64;
            let row_lo = (projected_j - half).max(0) as usize;
            let row_lo = row_lo.min(n_r_fine - 1);
            let row_hi = (row_lo + window_frames - 1).min(n_r_fine - 1);
            lo.push(row_lo);
            hi.push(row_hi);
        }
        for i in 1..n_s_fine {
            lo[i] = lo[i].max(lo[i - 1]);
            hi[i] = hi[i].max(hi[i - 1]).min(n_r_fine - 1);
        }
        lo[0] = 0;
        hi[n_s_fine - 1] = n_r_fine - 1;

        let band = Self { lo, hi };
        band.check_connected(n_s_fine, n_r_fine)?;
        Ok(band)
    }

    /// Verifies the band actually connects `(0, 0)` to
    /// `(n_s - 1, n_r - 1)`: no row's minimum column can exceed the
    /// previous row's maximum column plus one.
    fn check_connected(&self, n_s: usize, n_r: usize) -> Result<()> {
        if self.lo[0] != 0 || self.hi[n_s - 1] != n_r - 1 {
            return Err(AlignError::BandInfeasible {
                suggested_width: minimum_feasible_width(n_s, n_r),
            });
        }
        for i in 1..n_s {
            if self.lo[i] > self.hi[i - 1] + 1 {
                return Err(AlignError::BandInfeasible {
                    suggested_width: minimum_feasible_width(n_s, n_r),
                });
            }
        }
        Ok(())
    }
}

fn forward_and_backward_fill(values: &[Option<usize>]) -> Vec<usize> {
    let mut filled = vec![0usize; values.len()];
    let mut last = None;
    for (idx, value) in values.iter().enumerate() {
        if let Some(v) = value {
            filled[idx] = *v;
            last = Some(*v);
        } else if let Some(prev) = last {
            filled[idx] = prev;
        }
    }
    let mut next = None;
    for idx in (0..values.len()).rev() {
        if values[idx].is_some() {
            next = Some(filled[idx]);
        } else if let Some(n) = next {
            filled[idx] = n;
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_band_satisfies_width_bound() {
        let band = CostBand::uniform(100, 100, 10).unwrap();
        for i in 0..100 {
            assert!(band.hi(i) - band.lo(i) + 1 <= 10);
        }
        assert_eq!(band.lo(0), 0);
        assert_eq!(band.hi(99), 99);
    }

    #[test]
    fn narrow_window_on_mismatched_lengths_is_infeasible() {
        let result = CostBand::uniform(1000, 100, 5);
        match result {
            Err(AlignError::BandInfeasible { suggested_width }) => {
                assert!(suggested_width >= 900);
            }
            other => panic!("expected BandInfeasible, got {other:?}"),
        }
    }

    #[test]
    fn equal_length_identity_band_hugs_diagonal() {
        let band = CostBand::uniform(50, 50, 3).unwrap();
        for i in 0..50 {
            assert!(band.contains(i, i));
        }
    }
}
