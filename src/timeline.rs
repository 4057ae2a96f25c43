use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};

/// A single phone's timed span within a [`WordEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneEntry {
    pub symbol: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl PhoneEntry {
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}

/// A single word's timed span, with its child phones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordEntry {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub phones: Vec<PhoneEntry>,
}

impl WordEntry {
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}

/// The synthesized transcript's nested phone/word timing structure that
/// the source recording is aligned against.
///
/// Invariants (checked by [`ReferenceTimeline::validate`]): entries within
/// a level are pairwise non-overlapping and sorted by `start_time`; every
/// phone interval lies within its parent word's interval; the union of
/// word intervals does not exceed `[0, duration]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceTimeline {
    pub words: Vec<WordEntry>,
    pub duration: f64,
}

impl ReferenceTimeline {
    pub fn new(words: Vec<WordEntry>, duration: f64) -> Result<Self> {
        let timeline = Self { words, duration };
        timeline.validate()?;
        Ok(timeline)
    }

    pub fn validate(&self) -> Result<()> {
        if self.duration <= 0.0 || !self.duration.is_finite() {
            return Err(AlignError::ReferenceMismatch(
                "reference timeline duration must be positive and finite".into(),
            ));
        }
        let mut previous_end = 0.0_f64;
        for (idx, word) in self.words.iter().enumerate() {
            if word.end_time < word.start_time {
                return Err(AlignError::ReferenceMismatch(format!(
                    "word {idx} ('{}') has end_time before start_time",
                    word.text
                )));
            }
            if word.start_time + 1e-9 < previous_end {
                return Err(AlignError::ReferenceMismatch(format!(
                    "word {idx} ('{}') overlaps the previous word",
                    word.text
                )));
            }
            if word.end_time > self.duration + 1e-6 {
                return Err(AlignError::ReferenceMismatch(format!(
                    "word {idx} ('{}') extends past reference duration",
                    word.text
                )));
            }
            validate_phones(idx, word)?;
            previous_end = word.end_time;
        }
        Ok(())
    }

    /// Flattens every phone in timeline order, tagged with its owning word
    /// index.
    pub fn phones(&self) -> impl Iterator<Item = (usize, &PhoneEntry)> {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(idx, word)| word.phones.iter().map(move |phone| (idx, phone)))
    }
}

fn validate_phones(word_idx: usize, word: &WordEntry) -> Result<()> {
    let mut previous_end = word.start_time;
    for (phone_idx, phone) in word.phones.iter().enumerate() {
        if phone.end_time < phone.start_time {
            return Err(AlignError::ReferenceMismatch(format!(
                "word {word_idx} phone {phone_idx} ('{}') has end_time before start_time",
                phone.symbol
            )));
        }
        if phone.start_time + 1e-9 < previous_end {
            return Err(AlignError::ReferenceMismatch(format!(
                "word {word_idx} phone {phone_idx} ('{}') overlaps the previous phone",
                phone.symbol
            )));
        }
        if phone.start_time + 1e-6 < word.start_time || phone.end_time > word.end_time + 1e-6 {
            return Err(AlignError::ReferenceMismatch(format!(
                "word {word_idx} phone {phone_idx} ('{}') lies outside its parent word span",
                phone.symbol
            )));
        }
        previous_end = phone.end_time;
    }
    Ok(())
}

/// A single recognized word from an external recognizer, consumed only by
/// the recognition-assisted variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionWord {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

/// Flat word-level output of an external recognizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionTimeline {
    pub words: Vec<RecognitionWord>,
}

impl RecognitionTimeline {
    pub fn validate(&self) -> Result<()> {
        let mut previous_end = 0.0_f64;
        for (idx, word) in self.words.iter().enumerate() {
            if word.end_time < word.start_time {
                return Err(AlignError::ReferenceMismatch(format!(
                    "recognition word {idx} ('{}') has end_time before start_time",
                    word.text
                )));
            }
            if word.start_time + 1e-9 < previous_end {
                return Err(AlignError::ReferenceMismatch(format!(
                    "recognition word {idx} ('{}') overlaps the previous word",
                    word.text
                )));
            }
            previous_end = word.end_time;
        }
        Ok(())
    }
}

/// Output of a top-level alignment call: the reference timeline's
/// structure, re-timed to source coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub word_timeline: Vec<WordEntry>,
    pub phone_timeline: Option<Vec<PhoneEntry>>,
    pub confidence: Option<f32>,
}

impl AlignmentResult {
    /// Checks the output invariant from §8: entries are pairwise
    /// non-overlapping and sorted.
    pub fn validate(&self) -> Result<()> {
        let mut previous_end = f64::NEG_INFINITY;
        for (idx, word) in self.word_timeline.iter().enumerate() {
            if word.start_time + 1e-9 < previous_end {
                return Err(AlignError::ReferenceMismatch(format!(
                    "projected word {idx} ('{}') overlaps the previous projected word",
                    word.text
                )));
            }
            previous_end = word.end_time;
        }
        Ok(())
    }
}
