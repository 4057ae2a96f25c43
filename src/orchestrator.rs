//! Public entry points (§4.5): wires feature extraction, pass planning,
//! banded DTW, recognition-assisted anchoring, and timeline projection
//! into the three alignment variants a caller selects via [`Engine`].

use ndarray::Array2;
use tracing::{debug, info, info_span, warn};

use crate::cancel::CancellationToken;
use crate::config::{AlignmentConfig, PassSpec};
use crate::distance::Metric;
use crate::dtw::{self, CostBand, DtwResult, WarpingPath};
use crate::error::{AlignError, Result};
use crate::features::FeatureExtractor;
use crate::projector;
use crate::recognition;
use crate::timeline::{AlignmentResult, ReferenceTimeline, RecognitionTimeline};

/// One pass's worth of extracted frames and the hop duration they were
/// extracted at, consumed by [`run_multi_pass`].
struct PassFrames {
    source: Array2<f32>,
    reference: Array2<f32>,
    source_hop: f64,
    reference_hop: f64,
}

fn audio_duration_seconds(sample_count: usize, sample_rate: u32) -> f64 {
    sample_count as f64 / sample_rate as f64
}

/// Forced alignment with no side information: banded DTW over the whole
/// source/reference pair, coarse-to-fine across `config.passes`.
pub fn align_plain(
    source_samples: &[f32],
    reference_samples: &[f32],
    sample_rate: u32,
    reference_timeline: &ReferenceTimeline,
    config: &AlignmentConfig,
    cancel: &CancellationToken,
) -> Result<AlignmentResult> {
    let span = info_span!("align_plain");
    let _enter = span.enter();

    config.passes.validate()?;
    let extractor = FeatureExtractor::new();
    let duration_seconds = audio_duration_seconds(source_samples.len(), sample_rate);

    let mut frames_per_pass = Vec::with_capacity(config.passes.passes.len());
    for pass in &config.passes.passes {
        let mfcc_cfg = config.mfcc_for(pass);
        let source = extractor.extract(source_samples, sample_rate, &mfcc_cfg)?;
        let reference = extractor.extract(reference_samples, sample_rate, &mfcc_cfg)?;
        frames_per_pass.push(PassFrames {
            source_hop: source.hop_duration,
            reference_hop: reference.hop_duration,
            source: source.frames,
            reference: reference.frames,
        });
    }

    let result = run_multi_pass(
        &frames_per_pass,
        &config.passes.passes,
        Metric::Euclidean,
        config.row_check_interval,
        duration_seconds,
        cancel,
    )?;

    finish(
        result,
        reference_timeline,
        frames_per_pass.last().expect("at least one pass").reference_hop,
        frames_per_pass.last().expect("at least one pass").reference.nrows(),
        frames_per_pass.last().expect("at least one pass").source_hop,
        duration_seconds,
        config,
    )
}

/// Forced alignment guided by a rough external recognizer transcript of
/// the *source* recording (§4.3 "recognition-assisted"): recognized words
/// are Levenshtein-matched against the reference word sequence, and each
/// matched run anchors an independent banded DTW sub-alignment.
pub fn align_with_recognition(
    source_samples: &[f32],
    reference_samples: &[f32],
    sample_rate: u32,
    reference_timeline: &ReferenceTimeline,
    recognition_timeline: &RecognitionTimeline,
    config: &AlignmentConfig,
    cancel: &CancellationToken,
) -> Result<AlignmentResult> {
    let span = info_span!("align_with_recognition");
    let _enter = span.enter();

    recognition_timeline.validate()?;
    config.passes.validate()?;
    let pass = config
        .passes
        .passes
        .first()
        .expect("pass plan validated non-empty above");
    let mfcc_cfg = config.mfcc_for(pass);

    let extractor = FeatureExtractor::new();
    let duration_seconds = audio_duration_seconds(source_samples.len(), sample_rate);
    let source_seq = extractor.extract(source_samples, sample_rate, &mfcc_cfg)?;
    let reference_seq = extractor.extract(reference_samples, sample_rate, &mfcc_cfg)?;
    let n_s = source_seq.frame_count();
    let n_r = reference_seq.frame_count();

    let spans = recognition::match_words(reference_timeline, recognition_timeline);
    if spans.is_empty() {
        info!("no recognition anchors matched; falling back to a full banded pass");
        let window_frames = window_frames_for(pass, duration_seconds, source_seq.hop_duration)?;
        let band = CostBand::uniform(n_s, n_r, window_frames)?;
        let result = dtw::align(
            source_seq.frames.view(),
            reference_seq.frames.view(),
            &band,
            Metric::Euclidean,
            cancel,
            config.row_check_interval,
        )?;
        return finish(
            result,
            reference_timeline,
            reference_seq.hop_duration,
            n_r,
            source_seq.hop_duration,
            duration_seconds,
            config,
        );
    }

    let (source_intervals, reference_intervals) = anchor_intervals(
        &spans,
        recognition_timeline,
        reference_timeline,
        source_seq.hop_duration,
        reference_seq.hop_duration,
        n_s,
        n_r,
    );

    let window_frames = window_frames_for(pass, duration_seconds, source_seq.hop_duration)?;
    let result = dtw::align_anchored(
        source_seq.frames.view(),
        reference_seq.frames.view(),
        &source_intervals,
        &reference_intervals,
        window_frames,
        Metric::Euclidean,
        cancel,
        config.row_check_interval,
    )?;

    finish(
        result,
        reference_timeline,
        reference_seq.hop_duration,
        n_r,
        source_seq.hop_duration,
        duration_seconds,
        config,
    )
}

/// Forced alignment over caller-supplied embedding sequences (§4.3
/// "embeddings" engine): bypasses MFCC extraction entirely and compares
/// frames with cosine distance, e.g. for phoneme-posterior or
/// self-supervised embeddings computed upstream.
pub fn align_with_embeddings(
    source_embeddings: Array2<f32>,
    reference_embeddings: Array2<f32>,
    source_hop: f64,
    reference_hop: f64,
    reference_timeline: &ReferenceTimeline,
    config: &AlignmentConfig,
    cancel: &CancellationToken,
) -> Result<AlignmentResult> {
    let span = info_span!("align_with_embeddings");
    let _enter = span.enter();

    config.passes.validate()?;
    if source_embeddings.ncols() != reference_embeddings.ncols() {
        return Err(AlignError::InvalidConfig(
            "source and reference embeddings must share a feature dimension".into(),
        ));
    }
    if source_embeddings.nrows() == 0 || reference_embeddings.nrows() == 0 {
        return Err(AlignError::EmptyInput(
            "embedding sequences must be non-empty".into(),
        ));
    }

    let duration_seconds = source_embeddings.nrows() as f64 * source_hop;
    let n_r = reference_embeddings.nrows();
    let frames_per_pass: Vec<PassFrames> = config
        .passes
        .passes
        .iter()
        .map(|_| PassFrames {
            source: source_embeddings.clone(),
            reference: reference_embeddings.clone(),
            source_hop,
            reference_hop,
        })
        .collect();

    let result = run_multi_pass(
        &frames_per_pass,
        &config.passes.passes,
        Metric::Cosine,
        config.row_check_interval,
        duration_seconds,
        cancel,
    )?;

    finish(
        result,
        reference_timeline,
        reference_hop,
        n_r,
        source_hop,
        duration_seconds,
        config,
    )
}

/// Runs each configured pass in order, narrowing the Sakoe-Chiba band by
/// projecting the previous (coarser) pass's path forward, per §4.3
/// "multi-pass refinement".
fn run_multi_pass(
    frames_per_pass: &[PassFrames],
    passes: &[PassSpec],
    metric: Metric,
    row_check_interval: usize,
    duration_seconds: f64,
    cancel: &CancellationToken,
) -> Result<DtwResult> {
    let mut previous: Option<(WarpingPath, usize, f64)> = None;
    let mut previous_area: Option<usize> = None;
    let mut last_result = None;

    for (pass_idx, (frames, pass)) in frames_per_pass.iter().zip(passes.iter()).enumerate() {
        if cancel.is_cancelled() {
            return Err(AlignError::Cancelled);
        }
        let n_s = frames.source.nrows();
        let n_r = frames.reference.nrows();
        let window_frames = window_frames_for(pass, duration_seconds, frames.source_hop)?;

        let band = match &previous {
            None => CostBand::uniform(n_s, n_r, window_frames)?,
            Some((coarse_path, coarse_n_s, coarse_ref_hop)) => {
                let hop_ratio = coarse_ref_hop / frames.reference_hop;
                CostBand::from_coarse_path(coarse_path, *coarse_n_s, n_s, n_r, hop_ratio, window_frames)?
            }
        };

        let area = band.area();
        debug!(pass = pass_idx, granularity = ?pass.granularity, area, "band constructed");
        if let Some(previous_area) = previous_area {
            if area > previous_area {
                warn!(
                    pass = pass_idx,
                    previous_area, area, "pass band area grew instead of shrinking"
                );
            }
        }
        previous_area = Some(area);

        let result = dtw::align(
            frames.source.view(),
            frames.reference.view(),
            &band,
            metric,
            cancel,
            row_check_interval,
        )?;

        previous = Some((result.path.clone(), n_s, frames.reference_hop));
        last_result = Some(result);
    }

    last_result.ok_or_else(|| AlignError::InvalidConfig("pass plan must contain at least one pass".into()))
}

/// Converts a pass's window spec (seconds or a percentage of audio
/// duration) into a Sakoe-Chiba band width in frames.
fn window_frames_for(pass: &PassSpec, duration_seconds: f64, hop_duration: f64) -> Result<usize> {
    let window_seconds = pass.window.resolve_seconds(duration_seconds);
    let frames = (window_seconds / hop_duration).ceil() as usize;
    Ok(frames.max(1))
}

/// Builds contiguous source/reference frame intervals from matched
/// recognition spans, extending each span's boundaries to the midpoint
/// between it and its neighbors so the anchors jointly cover the full
/// `[0, n_s) x [0, n_r)` extent (§4.3).
fn anchor_intervals(
    spans: &[recognition::MatchedSpan],
    recognition_timeline: &RecognitionTimeline,
    reference_timeline: &ReferenceTimeline,
    source_hop: f64,
    reference_hop: f64,
    n_s: usize,
    n_r: usize,
) -> (Vec<(usize, usize)>, Vec<(usize, usize)>) {
    let mut source_raw = Vec::with_capacity(spans.len());
    let mut reference_raw = Vec::with_capacity(spans.len());

    for span in spans {
        let rec_start = recognition_timeline.words[span.rec_word_start].start_time;
        let rec_end = recognition_timeline.words[span.rec_word_end - 1].end_time;
        source_raw.push((
            (rec_start / source_hop).floor().max(0.0) as usize,
            ((rec_end / source_hop).ceil() as usize).min(n_s - 1),
        ));

        let ref_start = reference_timeline.words[span.ref_word_start].start_time;
        let ref_end = reference_timeline.words[span.ref_word_end - 1].end_time;
        reference_raw.push((
            (ref_start / reference_hop).floor().max(0.0) as usize,
            ((ref_end / reference_hop).ceil() as usize).min(n_r - 1),
        ));
    }

    let source_intervals = stitch(&source_raw, n_s);
    let reference_intervals = stitch(&reference_raw, n_r);
    (source_intervals, reference_intervals)
}

fn stitch(raw: &[(usize, usize)], n: usize) -> Vec<(usize, usize)> {
    let mut intervals = Vec::with_capacity(raw.len());
    for (idx, &(start, end)) in raw.iter().enumerate() {
        let lo = if idx == 0 {
            0
        } else {
            (raw[idx - 1].1 + start) / 2 + 1
        };
        let hi = if idx + 1 == raw.len() {
            n
        } else {
            ((end + raw[idx + 1].0) / 2 + 1).min(n)
        };
        let hi = hi.max(lo + 1).min(n);
        intervals.push((lo.min(hi - 1), hi));
    }
    intervals
}

fn finish(
    result: DtwResult,
    reference_timeline: &ReferenceTimeline,
    reference_hop: f64,
    n_r: usize,
    source_hop: f64,
    source_duration: f64,
    config: &AlignmentConfig,
) -> Result<AlignmentResult> {
    let word_timeline = projector::project_timeline(
        reference_timeline,
        &result.path,
        reference_hop,
        n_r,
        source_hop,
        source_duration,
        config.phone_alignment_method,
    )?;

    let phone_timeline: Vec<_> = word_timeline
        .iter()
        .flat_map(|w| w.phones.iter().cloned())
        .collect();
    let phone_timeline = if phone_timeline.is_empty() {
        None
    } else {
        Some(phone_timeline)
    };

    // Inverse of the mean per-pair cost, so longer recordings aren't
    // penalized just for having more pairs summed into `total_cost`.
    let average_cost = result.total_cost / result.path.pairs.len().max(1) as f32;
    let confidence = 1.0 / (1.0 + average_cost.max(0.0));

    let alignment = AlignmentResult {
        word_timeline,
        phone_timeline,
        confidence: Some(confidence),
    };
    alignment.validate()?;
    Ok(alignment)
}
