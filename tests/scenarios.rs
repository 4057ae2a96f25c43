//! End-to-end scenarios from the alignment core's test plan, each driven
//! entirely through the crate's public surface with synthetic frames (no
//! audio fixtures are required above the MFCC extractor itself).

use align_core::dtw::CostBand;
use align_core::distance::Metric;
use align_core::{
    AlignError, AlignmentConfig, CancellationToken, Engine, Granularity, PassPlan,
    PhoneAlignmentMethod, WindowSpec,
};
use align_core::{PhoneEntry, ReferenceTimeline, RecognitionTimeline, RecognitionWord, WordEntry};
use ndarray::Array2;

fn token_sequence(values: &[f32]) -> Array2<f32> {
    let flat: Vec<f32> = values.to_vec();
    Array2::from_shape_vec((values.len(), 1), flat).unwrap()
}

/// Toy 1: identical source and reference frames hug the diagonal exactly
/// and the projected word timeline reproduces the reference one.
#[test]
fn toy1_identity_source_and_reference() {
    let source = token_sequence(&[1.0, 2.0, 3.0]);
    let reference = token_sequence(&[1.0, 2.0, 3.0]);
    let band = CostBand::uniform(3, 3, 3).unwrap();
    let cancel = CancellationToken::new();
    let result = align_core::dtw::align(
        source.view(),
        reference.view(),
        &band,
        Metric::Euclidean,
        &cancel,
        256,
    )
    .unwrap();
    assert_eq!(result.path.pairs, vec![(0, 0), (1, 1), (2, 2)]);

    let reference_timeline =
        ReferenceTimeline::new(vec![WordEntry {
            text: "abc".into(),
            start_time: 0.0,
            end_time: 0.03,
            phones: Vec::new(),
        }], 0.03)
        .unwrap();
    let projected = align_core::projector::project_timeline(
        &reference_timeline,
        &result.path,
        0.01,
        3,
        0.01,
        0.03,
        PhoneAlignmentMethod::Dtw,
    )
    .unwrap();
    assert_eq!(projected.len(), 1);
    assert!((projected[0].start_time - 0.0).abs() < 1e-9);
    assert!((projected[0].end_time - 0.03).abs() < 1e-9);
}

/// Toy 2: a stretched source repeats the first and last reference frames;
/// the word spanning the whole reference projects to the whole source.
#[test]
fn toy2_stretch_alignment_widens_a_word_span() {
    let source = token_sequence(&[1.0, 1.0, 2.0, 3.0, 3.0]);
    let reference = token_sequence(&[1.0, 2.0, 3.0]);
    let band = CostBand::uniform(5, 3, 5).unwrap();
    let cancel = CancellationToken::new();
    let result = align_core::dtw::align(
        source.view(),
        reference.view(),
        &band,
        Metric::Euclidean,
        &cancel,
        256,
    )
    .unwrap();
    assert!(result.path.is_monotone());

    let reference_timeline = ReferenceTimeline::new(
        vec![WordEntry {
            text: "abc".into(),
            start_time: 0.0,
            end_time: 0.03,
            phones: Vec::new(),
        }],
        0.03,
    )
    .unwrap();
    let projected = align_core::projector::project_timeline(
        &reference_timeline,
        &result.path,
        0.01,
        3,
        0.01,
        0.05,
        PhoneAlignmentMethod::Dtw,
    )
    .unwrap();
    assert_eq!(projected.len(), 1);
    assert!((projected[0].start_time - 0.0).abs() < 1e-9);
    assert!((projected[0].end_time - 0.05).abs() < 1e-9);
}

/// Toy 3: a band far narrower than the length mismatch fails with
/// `BandInfeasible` and reports a workable minimum width.
#[test]
fn toy3_band_too_narrow_reports_suggested_width() {
    let result = CostBand::uniform(1000, 100, 5);
    match result {
        Err(AlignError::BandInfeasible { suggested_width }) => {
            assert!(suggested_width >= 1000 - 100);
        }
        other => panic!("expected BandInfeasible, got {other:?}"),
    }
}

/// Toy 4: a two-pass plan projects the coarse path into the fine grid and
/// the resulting band is centred on it — at least 90% of fine-grid rows
/// get the full configured fine width.
#[test]
fn toy4_two_pass_band_centres_on_the_coarse_path() {
    let coarse_n_s = 60;
    let coarse_n_r = 60;
    let coarse_values: Vec<f32> = (0..coarse_n_s).map(|i| i as f32).collect();
    let coarse_source = token_sequence(&coarse_values);
    let coarse_reference = token_sequence(&coarse_values);
    let coarse_band = CostBand::uniform(coarse_n_s, coarse_n_r, 9).unwrap();
    let cancel = CancellationToken::new();
    let coarse_result = align_core::dtw::align(
        coarse_source.view(),
        coarse_reference.view(),
        &coarse_band,
        Metric::Euclidean,
        &cancel,
        256,
    )
    .unwrap();

    // Fine grid is twice as dense (hop halved) as the coarse one.
    let n_s_fine = coarse_n_s * 2;
    let n_r_fine = coarse_n_r * 2;
    let fine_width = 7usize;
    let fine_band = CostBand::from_coarse_path(
        &coarse_result.path,
        coarse_n_s,
        n_s_fine,
        n_r_fine,
        2.0,
        fine_width,
    )
    .unwrap();

    let full_width_rows = (0..n_s_fine)
        .filter(|&i| fine_band.hi(i) - fine_band.lo(i) + 1 == fine_width)
        .count();
    let fraction = full_width_rows as f64 / n_s_fine as f64;
    assert!(
        fraction >= 0.9,
        "expected >=90% of fine rows at full configured width, got {fraction}"
    );
}

/// Assisted scenario: a recognizer transcript with two words anchors two
/// independent sub-alignments, driven end-to-end through
/// `align_with_recognition`, producing a projected timeline that is
/// still non-overlapping and monotone.
#[test]
fn assisted_recognition_anchors_two_sub_alignments() {
    use std::f32::consts::PI;

    fn sine_wave(freq_hz: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    let samples = sine_wave(210.0, 16_000, 0.9);
    let reference_timeline = ReferenceTimeline::new(
        vec![
            WordEntry {
                text: "hello".into(),
                start_time: 0.0,
                end_time: 0.3,
                phones: Vec::new(),
            },
            WordEntry {
                text: "world".into(),
                start_time: 0.3,
                end_time: 0.9,
                phones: Vec::new(),
            },
        ],
        0.9,
    )
    .unwrap();
    let recognition_timeline = RecognitionTimeline {
        words: vec![
            RecognitionWord {
                text: "hello".into(),
                start_time: 0.0,
                end_time: 0.4,
            },
            RecognitionWord {
                text: "world".into(),
                start_time: 0.5,
                end_time: 0.9,
            },
        ],
    };

    let spans = align_core::recognition::match_words(&reference_timeline, &recognition_timeline);
    assert_eq!(spans.len(), 2, "expected one matched span per recognized word");

    let config = AlignmentConfig {
        engine: Engine::Assisted,
        passes: PassPlan::single(Granularity::High, WindowSpec::seconds(5.0).unwrap()),
        phone_alignment_method: PhoneAlignmentMethod::Dtw,
        mfcc: None,
        row_check_interval: 64,
    };
    let cancel = CancellationToken::new();
    let result = align_core::align_with_recognition(
        &samples,
        &samples,
        16_000,
        &reference_timeline,
        &recognition_timeline,
        &config,
        &cancel,
    )
    .unwrap();

    assert_eq!(result.word_timeline.len(), 2);
    let mut previous_end = 0.0;
    for word in &result.word_timeline {
        assert!(word.start_time + 1e-9 >= previous_end);
        assert!(word.end_time >= word.start_time);
        previous_end = word.end_time;
    }
}

/// Phone interpolation: phone boundaries scale proportionally to their
/// original reference durations within the projected word span.
#[test]
fn phone_interpolation_scales_boundaries_proportionally() {
    let phones = vec![
        PhoneEntry {
            symbol: "AA".into(),
            start_time: 0.0,
            end_time: 0.05,
        },
        PhoneEntry {
            symbol: "BB".into(),
            start_time: 0.05,
            end_time: 0.10,
        },
        PhoneEntry {
            symbol: "CC".into(),
            start_time: 0.10,
            end_time: 0.20,
        },
        PhoneEntry {
            symbol: "DD".into(),
            start_time: 0.20,
            end_time: 0.30,
        },
    ];
    let reference_timeline = ReferenceTimeline::new(
        vec![WordEntry {
            text: "word".into(),
            start_time: 0.0,
            end_time: 0.30,
            phones,
        }],
        0.30,
    )
    .unwrap();

    // Identity path: the word's reference-time proportions should survive
    // projection into source time unchanged.
    let n = 31usize;
    let pairs: Vec<(usize, usize)> = (0..n).map(|i| (i, i)).collect();
    let path = align_core::WarpingPath::new(pairs);

    let projected = align_core::projector::project_timeline(
        &reference_timeline,
        &path,
        0.01,
        n,
        0.02,
        2.0,
        PhoneAlignmentMethod::Interpolation,
    )
    .unwrap();

    let word = &projected[0];
    assert!((word.start_time - 0.0).abs() < 1e-9 || word.start_time >= 0.0);
    let boundaries: Vec<f64> = std::iter::once(word.start_time)
        .chain(word.phones.iter().map(|p| p.end_time))
        .collect();
    // Relative boundaries should match the original [0.05, 0.10, 0.20, 0.30]/0.30 proportions.
    let span = word.end_time - word.start_time;
    let expected_rel = [0.0, 0.05 / 0.30, 0.10 / 0.30, 0.20 / 0.30, 1.0];
    for (b, expected) in boundaries.iter().zip(expected_rel.iter()) {
        let rel = (b - word.start_time) / span.max(1e-9);
        assert!(
            (rel - expected).abs() < 0.1,
            "boundary {b} (rel {rel}) not close to expected {expected}"
        );
    }
}

/// `PassPlan::automatic` resolution for the pass-planning table in §4.5,
/// exercised as a host would call it before invoking `align_plain`.
#[test]
fn automatic_pass_plan_matches_duration_buckets() {
    assert_eq!(PassPlan::automatic(10.0).unwrap().passes.len(), 1);
    assert_eq!(
        PassPlan::automatic(120.0).unwrap().passes[0].granularity,
        Granularity::Medium
    );
    assert_eq!(
        PassPlan::automatic(600.0).unwrap().passes[0].granularity,
        Granularity::Low
    );
    let plan = PassPlan::automatic(2000.0).unwrap();
    assert_eq!(plan.passes.len(), 2);
    assert_eq!(plan.passes[0].granularity, Granularity::XxLow);
    assert_eq!(plan.passes[1].granularity, Granularity::Low);
}

/// Hosts are expected to install their own `tracing` subscriber; this test
/// installs `tracing-subscriber`'s `fmt` layer for the duration of a real
/// `align_plain` run to exercise the `info_span!("align_plain")` boundary
/// under an active subscriber rather than the default no-op one.
#[test]
fn align_plain_runs_under_an_installed_tracing_subscriber() {
    use std::f32::consts::PI;
    use tracing_subscriber::EnvFilter;

    fn sine_wave(freq_hz: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("align_core=debug"))
        .with_test_writer()
        .finish();

    let samples = sine_wave(220.0, 16_000, 0.5);
    let reference_timeline = ReferenceTimeline::new(
        vec![WordEntry {
            text: "tone".into(),
            start_time: 0.0,
            end_time: 0.5,
            phones: Vec::new(),
        }],
        0.5,
    )
    .unwrap();
    let config = AlignmentConfig {
        engine: Engine::Plain,
        passes: PassPlan::single(Granularity::High, WindowSpec::seconds(5.0).unwrap()),
        phone_alignment_method: PhoneAlignmentMethod::Dtw,
        mfcc: None,
        row_check_interval: 64,
    };
    let cancel = CancellationToken::new();

    tracing::subscriber::with_default(subscriber, || {
        let result = align_core::align_plain(&samples, &samples, 16_000, &reference_timeline, &config, &cancel)
            .unwrap();
        assert_eq!(result.word_timeline.len(), 1);
    });
}

/// A fully-wired `AlignmentConfig` matching the orchestrator's expected
/// engine/phone-method/pass combination round-trips through `serde_json`,
/// since hosts need to persist or transmit configuration.
#[test]
fn alignment_config_round_trips_through_json() {
    let config = AlignmentConfig {
        engine: Engine::Plain,
        passes: PassPlan::single(Granularity::High, WindowSpec::seconds(60.0).unwrap()),
        phone_alignment_method: PhoneAlignmentMethod::Interpolation,
        mfcc: None,
        row_check_interval: 256,
    };
    let json = serde_json::to_string(&config).unwrap();
    let restored: AlignmentConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.engine, config.engine);
    assert_eq!(restored.row_check_interval, config.row_check_interval);
}
