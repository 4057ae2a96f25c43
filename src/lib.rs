//! Forced speech-to-transcript alignment core.
//!
//! Given a source recording and a reference recording whose transcript
//! timing (`ReferenceTimeline`) is already known, this crate re-times
//! that transcript onto the source recording via MFCC feature extraction
//! and banded dynamic time warping. See [`orchestrator`] for the three
//! public entry points.
//!
//! This crate never installs a `tracing` subscriber; hosts wire one up
//! themselves (`tracing-subscriber`, or any other `Subscriber`).

pub mod cancel;
pub mod config;
pub mod distance;
pub mod dtw;
pub mod error;
pub mod features;
pub mod orchestrator;
pub mod projector;
pub mod recognition;
pub mod timeline;

pub use cancel::CancellationToken;
pub use config::{
    AlignmentConfig, Engine, Granularity, MfccConfig, PassPlan, PassSpec, PhoneAlignmentMethod,
    WindowSpec,
};
pub use distance::Metric;
pub use dtw::{CostBand, DtwResult, WarpingPath};
pub use error::{AlignError, Result};
pub use features::{FeatureExtractor, MfccFrameSequence};
pub use orchestrator::{align_plain, align_with_embeddings, align_with_recognition};
pub use recognition::MatchedSpan;
pub use timeline::{
    AlignmentResult, PhoneEntry, ReferenceTimeline, RecognitionTimeline, RecognitionWord,
    WordEntry,
};
