//! C5: recognition-assisted matching — aligns a recognizer's flat word
//! timeline against the reference word sequence with a Levenshtein edit
//! script, producing the per-word anchors the DTW engine runs its
//! sub-alignments against (§4.3 "recognition-assisted").

use crate::timeline::{ReferenceTimeline, RecognitionTimeline};

/// A single reference word matched 1:1 to a single recognized word; each
/// matched pair anchors its own sub-alignment (§4.5 step 3, "for each
/// matched recognizer interval").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedSpan {
    pub ref_word_start: usize,
    pub ref_word_end: usize,
    pub rec_word_start: usize,
    pub rec_word_end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Match,
    Substitute,
    Insert,
    Delete,
}

/// Normalizes a token for comparison: lowercased, with surrounding
/// punctuation stripped.
fn normalize_token(token: &str) -> String {
    token
        .trim_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase()
}

/// Runs word-level Levenshtein alignment between `reference` and
/// `recognition`, then turns every exact-match edit into its own
/// single-word anchor. Matched words are *not* merged across runs: two
/// recognized words that both match their reference counterpart still
/// anchor two independent sub-alignments, since nothing in an exact text
/// match guarantees the words are contiguous in time (the recognizer may
/// report a gap, a pause, or reordered timing between them).
pub fn match_words(reference: &ReferenceTimeline, recognition: &RecognitionTimeline) -> Vec<MatchedSpan> {
    let ref_tokens: Vec<String> = reference.words.iter().map(|w| normalize_token(&w.text)).collect();
    let rec_tokens: Vec<String> = recognition
        .words
        .iter()
        .map(|w| normalize_token(&w.text))
        .collect();

    let n = ref_tokens.len();
    let m = rec_tokens.len();
    if n == 0 || m == 0 {
        return Vec::new();
    }

    // dp[i][j] = edit distance between ref_tokens[..i] and rec_tokens[..j].
    let mut dp = vec![vec![0u32; m + 1]; n + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i as u32;
    }
    for j in 0..=m {
        dp[0][j] = j as u32;
    }
    for i in 1..=n {
        for j in 1..=m {
            let sub_cost = if ref_tokens[i - 1] == rec_tokens[j - 1] { 0 } else { 1 };
            let diag = dp[i - 1][j - 1] + sub_cost;
            let up = dp[i - 1][j] + 1;
            let left = dp[i][j - 1] + 1;
            dp[i][j] = diag.min(up).min(left);
        }
    }

    let edits = backtrace(&dp, &ref_tokens, &rec_tokens);
    matches_to_spans(&edits)
}

/// Walks the DP table from `(n, m)` back to `(0, 0)`, preferring a match
/// over a substitution, then a deletion, then an insertion, on ties.
fn backtrace(dp: &[Vec<u32>], ref_tokens: &[String], rec_tokens: &[String]) -> Vec<(Edit, usize, usize)> {
    let mut i = ref_tokens.len();
    let mut j = rec_tokens.len();
    let mut script = Vec::new();

    while i > 0 || j > 0 {
        if i > 0 && j > 0 {
            let is_match = ref_tokens[i - 1] == rec_tokens[j - 1];
            let sub_cost = if is_match { 0 } else { 1 };
            if dp[i][j] == dp[i - 1][j - 1] + sub_cost {
                script.push((if is_match { Edit::Match } else { Edit::Substitute }, i - 1, j - 1));
                i -= 1;
                j -= 1;
                continue;
            }
        }
        if i > 0 && dp[i][j] == dp[i - 1][j] + 1 {
            script.push((Edit::Delete, i - 1, j));
            i -= 1;
            continue;
        }
        if j > 0 && dp[i][j] == dp[i][j - 1] + 1 {
            script.push((Edit::Insert, i, j - 1));
            j -= 1;
            continue;
        }
        unreachable!("DP table is inconsistent with its own recurrence");
    }
    script.reverse();
    script
}

/// One `MatchedSpan` per `Edit::Match` in the script; substitutions,
/// insertions, and deletions contribute no anchor.
fn matches_to_spans(edits: &[(Edit, usize, usize)]) -> Vec<MatchedSpan> {
    edits
        .iter()
        .filter(|&&(edit, _, _)| edit == Edit::Match)
        .map(|&(_, ref_idx, rec_idx)| MatchedSpan {
            ref_word_start: ref_idx,
            ref_word_end: ref_idx + 1,
            rec_word_start: rec_idx,
            rec_word_end: rec_idx + 1,
        })
        .collect()
}
