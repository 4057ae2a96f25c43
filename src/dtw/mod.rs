//! C3: banded DTW engine — cost recurrence, path recovery, multi-pass
//! band refinement, and anchored sub-alignment.

mod band;
mod path;

pub use band::CostBand;
pub use path::WarpingPath;

use ndarray::ArrayView2;
use tracing::{debug, info_span};

use crate::cancel::CancellationToken;
use crate::distance::Metric;
use crate::error::{AlignError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Diag,
    Up,
    Left,
}

/// Result of a single banded DTW pass: the recovered warping path and its
/// total accumulated cost.
#[derive(Debug, Clone)]
pub struct DtwResult {
    pub path: WarpingPath,
    pub total_cost: f32,
}

/// Runs banded DTW between `source` and `reference` MFCC (or embedding)
/// sequences — rows are frames, columns are feature dimensions — within
/// `band`, using `metric` as the per-frame cost function (§4.3).
pub fn align(
    source: ArrayView2<f32>,
    reference: ArrayView2<f32>,
    band: &CostBand,
    metric: Metric,
    cancel: &CancellationToken,
    row_check_interval: usize,
) -> Result<DtwResult> {
    let n_s = source.nrows();
    let n_r = reference.nrows();
    if n_s == 0 || n_r == 0 {
        return Err(AlignError::EmptyInput(
            "DTW requires non-empty source and reference sequences".into(),
        ));
    }
    if band.n_rows() != n_s {
        return Err(AlignError::InvalidConfig(format!(
            "band has {} rows but source has {n_s} frames",
            band.n_rows()
        )));
    }

    let span = info_span!("dtw_pass", n_s, n_r);
    let _enter = span.enter();

    let mut previous_row: Vec<f32> = Vec::new();
    let mut traceback: Vec<Vec<Direction>> = Vec::with_capacity(n_s);

    for i in 0..n_s {
        if row_check_interval > 0 && i % row_check_interval == 0 && cancel.is_cancelled() {
            debug!(row = i, "dtw pass cancelled");
            return Err(AlignError::Cancelled);
        }

        let lo = band.lo(i);
        let hi = band.hi(i);
        let width = hi - lo + 1;
        let mut current_row = vec![f32::INFINITY; width];
        let mut current_dirs = vec![Direction::Diag; width];

        for (col, j) in (lo..=hi).enumerate() {
            let cost = metric.distance(source.row(i), reference.row(j));

            if i == 0 {
                current_row[col] = if j == 0 { cost } else { f32::INFINITY };
                continue;
            }

            let diag = cell_at(&previous_row, band.lo(i - 1), band.hi(i - 1), j.wrapping_sub(1));
            let up = cell_at(&previous_row, band.lo(i - 1), band.hi(i - 1), j);
            let left = if col == 0 {
                f32::INFINITY
            } else {
                current_row[col - 1]
            };

            let (best_cost, direction) = best_predecessor(diag, up, left);
            current_row[col] = cost + best_cost;
            current_dirs[col] = direction;
        }

        previous_row = current_row;
        traceback.push(current_dirs);
    }

    let last_lo = band.lo(n_s - 1);
    let last_hi = band.hi(n_s - 1);
    if n_r - 1 < last_lo || n_r - 1 > last_hi {
        return Err(AlignError::BandInfeasible {
            suggested_width: n_s.abs_diff(n_r) + 1,
        });
    }
    let total_cost = previous_row[n_r - 1 - last_lo];
    if !total_cost.is_finite() {
        return Err(AlignError::BandInfeasible {
            suggested_width: n_s.abs_diff(n_r) + 1,
        });
    }

    let path = recover_path(&traceback, band, n_s, n_r)?;
    Ok(DtwResult { path, total_cost })
}

fn cell_at(row: &[f32], lo: usize, hi: usize, j: usize) -> f32 {
    if j < lo || j > hi {
        f32::INFINITY
    } else {
        row[j - lo]
    }
}

/// Picks the cheapest predecessor, preferring diagonal over up over left
/// on ties (§4.3 "Tie-breaking order, top to bottom: diagonal, up, left").
fn best_predecessor(diag: f32, up: f32, left: f32) -> (f32, Direction) {
    let mut best = (diag, Direction::Diag);
    if up < best.0 {
        best = (up, Direction::Up);
    }
    if left < best.0 {
        best = (left, Direction::Left);
    }
    best
}

fn recover_path(
    traceback: &[Vec<Direction>],
    band: &CostBand,
    n_s: usize,
    n_r: usize,
) -> Result<WarpingPath> {
    let mut pairs = Vec::new();
    let mut i = n_s - 1;
    let mut j = n_r - 1;
    loop {
        pairs.push((i, j));
        if i == 0 && j == 0 {
            break;
        }
        let lo = band.lo(i);
        if j < lo || j > band.hi(i) {
            return Err(AlignError::BandInfeasible {
                suggested_width: n_s.abs_diff(n_r) + 1,
            });
        }
        match traceback[i][j - lo] {
            Direction::Diag => {
                if i == 0 || j == 0 {
                    return Err(AlignError::ReferenceMismatch(
                        "DTW traceback ran out of bounds before reaching (0, 0)".into(),
                    ));
                }
                i -= 1;
                j -= 1;
            }
            Direction::Up => {
                if i == 0 {
                    return Err(AlignError::ReferenceMismatch(
                        "DTW traceback ran out of bounds before reaching (0, 0)".into(),
                    ));
                }
                i -= 1;
            }
            Direction::Left => {
                if j == 0 {
                    return Err(AlignError::ReferenceMismatch(
                        "DTW traceback ran out of bounds before reaching (0, 0)".into(),
                    ));
                }
                j -= 1;
            }
        }
    }
    pairs.reverse();
    Ok(WarpingPath::new(pairs))
}

/// Anchored sub-alignment (§4.3): runs one DTW per matched
/// `(source_interval, reference_interval)` pair (in frame indices) and
/// concatenates the sub-paths with the appropriate frame offsets.
pub fn align_anchored(
    source: ArrayView2<f32>,
    reference: ArrayView2<f32>,
    source_intervals: &[(usize, usize)],
    reference_intervals: &[(usize, usize)],
    window_frames: usize,
    metric: Metric,
    cancel: &CancellationToken,
    row_check_interval: usize,
) -> Result<DtwResult> {
    if source_intervals.len() != reference_intervals.len() {
        return Err(AlignError::ReferenceMismatch(
            "anchored alignment requires matching source/reference interval counts".into(),
        ));
    }

    let mut pairs = Vec::new();
    let mut total_cost = 0.0_f32;
    for (&(s_start, s_end), &(r_start, r_end)) in
        source_intervals.iter().zip(reference_intervals.iter())
    {
        if cancel.is_cancelled() {
            return Err(AlignError::Cancelled);
        }
        if s_end <= s_start || r_end <= r_start {
            return Err(AlignError::ReferenceMismatch(
                "anchored interval must be non-empty".into(),
            ));
        }
        let source_slice = source.slice(ndarray::s![s_start..s_end, ..]);
        let reference_slice = reference.slice(ndarray::s![r_start..r_end, ..]);
        let band = CostBand::uniform(source_slice.nrows(), reference_slice.nrows(), window_frames)?;
        let result = align(
            source_slice,
            reference_slice,
            &band,
            metric,
            cancel,
            row_check_interval,
        )?;
        total_cost += result.total_cost;
        pairs.extend(result.path.offset(s_start, r_start).pairs);
    }

    Ok(DtwResult {
        path: WarpingPath::new(pairs),
        total_cost,
    })
}
