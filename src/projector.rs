//! C4: reference timeline projector — maps a `ReferenceTimeline`'s word and
//! phone spans into source-audio time using a recovered warping path.

use crate::config::PhoneAlignmentMethod;
use crate::dtw::WarpingPath;
use crate::error::{AlignError, Result};
use crate::timeline::{PhoneEntry, ReferenceTimeline, WordEntry};

/// Converts a reference-time interval to the enclosing reference frame
/// range, per §4.4 step 1 (floor the start, ceil the end).
fn time_to_frame_range(start: f64, end: f64, hop: f64, n_r: usize) -> (usize, usize) {
    let lo = (start / hop).floor().max(0.0) as usize;
    let hi = ((end / hop).ceil() as usize).min(n_r.saturating_sub(1));
    (lo, hi.max(lo))
}

/// Finds the first path pair reaching `r_lo` and the last path pair at or
/// before `r_hi`, returning the source-frame span they bound.
fn project_frame_span(path: &WarpingPath, r_lo: usize, r_hi: usize) -> Option<(usize, usize)> {
    let first = path.pairs.iter().find(|&&(_, j)| j >= r_lo).copied();
    let last = path.pairs.iter().rev().find(|&&(_, j)| j <= r_hi).copied();
    match (first, last) {
        (Some((i_first, _)), Some((i_last, _))) if i_first <= i_last => Some((i_first, i_last)),
        (Some((i_first, _)), _) => Some((i_first, i_first)),
        (None, Some((i_last, _))) => Some((i_last, i_last)),
        (None, None) => None,
    }
}

fn frame_span_to_time(i_first: usize, i_last: usize, source_hop: f64, source_duration: f64) -> (f64, f64) {
    let start = (i_first as f64 * source_hop).min(source_duration);
    let end = ((i_last as f64 + 1.0) * source_hop).min(source_duration);
    (start, end.max(start))
}

/// Projects a single reference interval (in reference time) into source
/// time via `path`, expanding a zero-width result by one hop so every
/// projected entry keeps positive duration (§4.4 "zero-length entries").
fn project_interval(
    start: f64,
    end: f64,
    path: &WarpingPath,
    ref_hop: f64,
    n_r: usize,
    source_hop: f64,
    source_duration: f64,
) -> Result<(f64, f64)> {
    let (r_lo, r_hi) = time_to_frame_range(start, end, ref_hop, n_r);
    let (i_first, i_last) = project_frame_span(path, r_lo, r_hi).ok_or_else(|| {
        AlignError::ReferenceMismatch("warping path does not cover the requested span".into())
    })?;
    let (mut s_start, mut s_end) = frame_span_to_time(i_first, i_last, source_hop, source_duration);
    if s_end <= s_start {
        s_end = (s_start + source_hop).min(source_duration);
        if s_end <= s_start {
            s_start = (s_end - source_hop).max(0.0);
        }
    }
    Ok((s_start, s_end))
}

/// Projects an entire reference timeline into source time.
///
/// `ref_hop` / `n_r` describe the reference MFCC sequence the path's
/// columns index into; `source_hop` / `source_duration` describe the
/// source audio the path's rows index into.
pub fn project_timeline(
    reference: &ReferenceTimeline,
    path: &WarpingPath,
    ref_hop: f64,
    n_r: usize,
    source_hop: f64,
    source_duration: f64,
    phone_method: PhoneAlignmentMethod,
) -> Result<Vec<WordEntry>> {
    let mut projected = Vec::with_capacity(reference.words.len());
    let mut previous_end = 0.0_f64;

    for word in &reference.words {
        let (mut start, mut end) = project_interval(
            word.start_time,
            word.end_time,
            path,
            ref_hop,
            n_r,
            source_hop,
            source_duration,
        )?;
        if start < previous_end {
            start = previous_end;
            end = end.max(start);
        }

        let phones = project_phones(word, start, end, path, ref_hop, n_r, source_hop, source_duration, phone_method)?;

        previous_end = end;
        projected.push(WordEntry {
            text: word.text.clone(),
            start_time: start,
            end_time: end,
            phones,
        });
    }

    Ok(projected)
}

#[allow(clippy::too_many_arguments)]
fn project_phones(
    word: &WordEntry,
    projected_start: f64,
    projected_end: f64,
    path: &WarpingPath,
    ref_hop: f64,
    n_r: usize,
    source_hop: f64,
    source_duration: f64,
    method: PhoneAlignmentMethod,
) -> Result<Vec<PhoneEntry>> {
    if word.phones.is_empty() {
        return Ok(Vec::new());
    }

    match method {
        PhoneAlignmentMethod::Dtw => {
            let mut phones = Vec::with_capacity(word.phones.len());
            let mut previous_end = projected_start;
            for phone in &word.phones {
                let (mut start, mut end) = project_interval(
                    phone.start_time,
                    phone.end_time,
                    path,
                    ref_hop,
                    n_r,
                    source_hop,
                    source_duration,
                )?;
                if start < previous_end {
                    start = previous_end;
                    end = end.max(start);
                }
                end = end.min(projected_end).max(start);
                previous_end = end;
                phones.push(PhoneEntry {
                    symbol: phone.symbol.clone(),
                    start_time: start,
                    end_time: end,
                });
            }
            Ok(phones)
        }
        PhoneAlignmentMethod::Interpolation => {
            let word_span = (word.end_time - word.start_time).max(f64::MIN_POSITIVE);
            let projected_span = (projected_end - projected_start).max(0.0);
            let mut phones = Vec::with_capacity(word.phones.len());
            let mut previous_end = projected_start;
            for phone in &word.phones {
                let rel_start = (phone.start_time - word.start_time) / word_span;
                let rel_end = (phone.end_time - word.start_time) / word_span;
                let mut start = projected_start + rel_start * projected_span;
                let mut end = projected_start + rel_end * projected_span;
                if start < previous_end {
                    start = previous_end;
                }
                end = end.max(start).min(projected_end);
                previous_end = end;
                phones.push(PhoneEntry {
                    symbol: phone.symbol.clone(),
                    start_time: start,
                    end_time: end,
                });
            }
            Ok(phones)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::WordEntry;

    fn word(text: &str, start: f64, end: f64, phones: Vec<PhoneEntry>) -> WordEntry {
        WordEntry {
            text: text.to_string(),
            start_time: start,
            end_time: end,
            phones,
        }
    }

    fn identity_path(n: usize) -> WarpingPath {
        WarpingPath::new((0..n).map(|i| (i, i)).collect())
    }

    #[test]
    fn identity_path_reproduces_reference_times() {
        let reference = ReferenceTimeline::new(
            vec![word("hi", 0.0, 0.5, vec![]), word("there", 0.5, 1.0, vec![])],
            1.0,
        )
        .unwrap();
        let path = identity_path(100);
        let projected = project_timeline(
            &reference,
            &path,
            0.01,
            100,
            0.01,
            1.0,
            PhoneAlignmentMethod::Dtw,
        )
        .unwrap();
        assert_eq!(projected.len(), 2);
        assert!((projected[0].start_time - 0.0).abs() < 1e-9);
        assert!((projected[1].end_time - 1.0).abs() < 0.02);
    }

    #[test]
    fn projected_words_stay_monotone_and_non_overlapping() {
        let reference = ReferenceTimeline::new(
            vec![
                word("a", 0.0, 0.3, vec![]),
                word("b", 0.3, 0.6, vec![]),
                word("c", 0.6, 1.0, vec![]),
            ],
            1.0,
        )
        .unwrap();
        // a stretched path: every source frame repeats twice.
        let mut pairs = Vec::new();
        for j in 0..100 {
            pairs.push((2 * j, j));
            pairs.push((2 * j + 1, j));
        }
        let path = WarpingPath::new(pairs);
        let projected = project_timeline(
            &reference,
            &path,
            0.01,
            100,
            0.005,
            1.0,
            PhoneAlignmentMethod::Dtw,
        )
        .unwrap();
        let mut previous_end = 0.0;
        for w in &projected {
            assert!(w.start_time + 1e-9 >= previous_end);
            assert!(w.end_time >= w.start_time);
            previous_end = w.end_time;
        }
    }

    #[test]
    fn interpolation_method_scales_phone_boundaries_proportionally() {
        let phones = vec![
            PhoneEntry {
                symbol: "HH".into(),
                start_time: 0.0,
                end_time: 0.2,
            },
            PhoneEntry {
                symbol: "AH".into(),
                start_time: 0.2,
                end_time: 0.4,
            },
        ];
        let reference = ReferenceTimeline::new(vec![word("hi", 0.0, 0.4, phones)], 1.0).unwrap();
        let path = identity_path(100);
        let projected = project_timeline(
            &reference,
            &path,
            0.01,
            100,
            0.02,
            2.0,
            PhoneAlignmentMethod::Interpolation,
        )
        .unwrap();
        let w = &projected[0];
        assert_eq!(w.phones.len(), 2);
        let midpoint = (w.phones[0].end_time - w.start_time) / (w.end_time - w.start_time);
        assert!((midpoint - 0.5).abs() < 0.15);
    }
}
