use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};

/// MFCC granularity preset, trading time resolution for compute cost.
///
/// `XxLow` only appears as the coarse half of a two-pass plan; callers are
/// free to request it directly for a single pass too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    High,
    Medium,
    Low,
    XxLow,
}

impl Granularity {
    /// `(window_duration_ms, hop_duration_ms, fft_order)` for this preset.
    pub fn mfcc_defaults(self) -> (f64, f64, usize) {
        match self {
            Granularity::High => (25.0, 10.0, 512),
            Granularity::Medium => (50.0, 25.0, 1024),
            Granularity::Low => (100.0, 50.0, 2048),
            Granularity::XxLow => (200.0, 100.0, 4096),
        }
    }

    pub fn mfcc_config(self) -> MfccConfig {
        let (window_ms, hop_ms, fft_order) = self.mfcc_defaults();
        MfccConfig {
            window_duration: window_ms / 1000.0,
            hop_duration: hop_ms / 1000.0,
            fft_order,
            ..MfccConfig::default()
        }
    }
}

/// Which alignment variant to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Engine {
    Plain,
    Assisted,
    Embeddings,
}

/// Which method projects phone boundaries from a word's source-time span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhoneAlignmentMethod {
    /// Apply the projection rule (§4.4) directly to each phone entry.
    Dtw,
    /// Project only word endpoints, then interpolate phone boundaries in
    /// proportion to their original reference durations.
    Interpolation,
}

/// A DTW band window expressed either as an absolute duration or as a
/// percentage of total audio duration, resolved against a concrete
/// duration via [`WindowSpec::resolve_seconds`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WindowSpec {
    Seconds(f64),
    Percent(f64),
}

impl WindowSpec {
    /// Parses a window specification the way a host would receive it from
    /// configuration: a bare number of seconds, or a string like `"20%"`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if let Some(percent_str) = trimmed.strip_suffix('%') {
            let percent: f64 = percent_str.trim().parse().map_err(|_| {
                AlignError::InvalidConfig(format!("invalid percentage window '{raw}'"))
            })?;
            return Self::percent(percent);
        }
        let seconds: f64 = trimmed
            .parse()
            .map_err(|_| AlignError::InvalidConfig(format!("invalid window duration '{raw}'")))?;
        Self::seconds(seconds)
    }

    pub fn seconds(value: f64) -> Result<Self> {
        if !(value.is_finite() && value > 0.0) {
            return Err(AlignError::InvalidConfig(
                "window duration must be a positive, finite number of seconds".into(),
            ));
        }
        Ok(WindowSpec::Seconds(value))
    }

    pub fn percent(value: f64) -> Result<Self> {
        if !(value.is_finite() && value > 0.0 && value <= 100.0) {
            return Err(AlignError::InvalidConfig(format!(
                "percentage window must lie in (0, 100], got {value}"
            )));
        }
        Ok(WindowSpec::Percent(value))
    }

    /// Resolves this spec against a concrete audio duration, clamping to
    /// `(0, duration_seconds]` per §4.5.
    pub fn resolve_seconds(&self, duration_seconds: f64) -> f64 {
        let raw = match self {
            WindowSpec::Seconds(s) => *s,
            WindowSpec::Percent(p) => (p / 100.0 * duration_seconds).ceil(),
        };
        raw.clamp(f64::MIN_POSITIVE, duration_seconds.max(f64::MIN_POSITIVE))
    }
}

/// One DTW pass: a granularity preset plus the window duration that pass's
/// Sakoe-Chiba band should use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PassSpec {
    pub granularity: Granularity,
    pub window: WindowSpec,
}

/// Ordered sequence of passes to run, coarse first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassPlan {
    pub passes: Vec<PassSpec>,
}

impl PassPlan {
    pub fn single(granularity: Granularity, window: WindowSpec) -> Self {
        Self {
            passes: vec![PassSpec { granularity, window }],
        }
    }

    /// Picks granularity and default window durations from audio duration,
    /// per §4.5's pass-planning table.
    pub fn automatic(duration_seconds: f64) -> Result<Self> {
        if !(duration_seconds.is_finite() && duration_seconds > 0.0) {
            return Err(AlignError::InvalidAudio(
                "audio duration must be positive and finite".into(),
            ));
        }
        let plan = if duration_seconds < 60.0 {
            Self::single(Granularity::High, WindowSpec::seconds(60.0)?)
        } else if duration_seconds < 300.0 {
            Self::single(Granularity::Medium, WindowSpec::seconds(60.0)?)
        } else if duration_seconds < 1800.0 {
            Self::single(Granularity::Low, WindowSpec::seconds(60.0)?)
        } else {
            Self {
                passes: vec![
                    PassSpec {
                        granularity: Granularity::XxLow,
                        window: WindowSpec::seconds(60.0)?,
                    },
                    PassSpec {
                        granularity: Granularity::Low,
                        window: WindowSpec::seconds(15.0)?,
                    },
                ],
            }
        };
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        if self.passes.is_empty() {
            return Err(AlignError::InvalidConfig(
                "pass plan must contain at least one pass".into(),
            ));
        }
        Ok(())
    }
}

/// MFCC extraction configuration. Defaults match the `high` granularity
/// preset; callers typically derive a config from a [`Granularity`]
/// instead of constructing one by hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MfccConfig {
    pub window_duration: f64,
    pub hop_duration: f64,
    pub fft_order: usize,
    pub filter_bank_count: usize,
    pub cepstral_count: usize,
    pub low_freq_hz: f64,
    pub high_freq_hz: f64,
    pub preemphasis: f32,
    pub liftering: f64,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            window_duration: 0.025,
            hop_duration: 0.010,
            fft_order: 512,
            filter_bank_count: 40,
            cepstral_count: 13,
            low_freq_hz: 0.0,
            high_freq_hz: 8000.0,
            preemphasis: 0.97,
            liftering: 22.0,
        }
    }
}

impl MfccConfig {
    pub fn validate(&self, sample_rate: u32) -> Result<()> {
        if !self.fft_order.is_power_of_two() {
            return Err(AlignError::InvalidConfig(format!(
                "fftOrder must be a power of two, got {}",
                self.fft_order
            )));
        }
        let window_len = (self.window_duration * sample_rate as f64).round() as usize;
        if self.fft_order < window_len {
            return Err(AlignError::InvalidConfig(format!(
                "fftOrder ({}) must be >= window length in samples ({})",
                self.fft_order, window_len
            )));
        }
        if self.filter_bank_count == 0 || self.cepstral_count == 0 {
            return Err(AlignError::InvalidConfig(
                "filterBankCount and cepstralCount must be positive".into(),
            ));
        }
        if self.cepstral_count > self.filter_bank_count {
            return Err(AlignError::InvalidConfig(format!(
                "cepstralCount ({}) cannot exceed filterBankCount ({})",
                self.cepstral_count, self.filter_bank_count
            )));
        }
        if self.high_freq_hz <= self.low_freq_hz {
            return Err(AlignError::InvalidConfig(
                "highFreqHz must be greater than lowFreqHz".into(),
            ));
        }
        if self.window_duration <= 0.0 || self.hop_duration <= 0.0 {
            return Err(AlignError::InvalidConfig(
                "windowDuration and hopDuration must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration for one alignment call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentConfig {
    pub engine: Engine,
    pub passes: PassPlan,
    pub phone_alignment_method: PhoneAlignmentMethod,
    pub mfcc: Option<MfccConfig>,
    pub row_check_interval: usize,
}

impl AlignmentConfig {
    pub fn plain(passes: PassPlan) -> Self {
        Self {
            engine: Engine::Plain,
            passes,
            phone_alignment_method: PhoneAlignmentMethod::Dtw,
            mfcc: None,
            row_check_interval: crate::cancel::DEFAULT_ROW_CHECK_INTERVAL,
        }
    }

    /// Resolves the MFCC configuration for a given pass, honoring an
    /// explicit override and otherwise falling back to the pass's
    /// granularity preset.
    pub fn mfcc_for(&self, pass: &PassSpec) -> MfccConfig {
        self.mfcc.unwrap_or_else(|| pass.granularity.mfcc_config())
    }
}
