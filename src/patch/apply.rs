use super::diff::{Op, diff_chars, levenshtein, x_index};
use super::{MAX_PATTERN, Patch};

/// How far from the expected offset a fuzzy match may start.
const MATCH_DISTANCE: usize = 1000;

/// Highest acceptable fuzzy score (error ratio plus distance penalty).
const MATCH_THRESHOLD: f64 = 0.5;

/// Highest acceptable error ratio between a hunk's expected and found text.
const DELETE_THRESHOLD: f64 = 0.5;

/// Result of applying a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub text: String,
    /// One entry per hunk.
    pub applied: Vec<bool>,
}

impl ApplyReport {
    pub fn all_applied(&self) -> bool {
        self.applied.iter().all(|ok| *ok)
    }
}

pub(super) fn apply_patch(patch: &Patch, text: &str) -> ApplyReport {
    let mut chars: Vec<char> = text.chars().collect();
    let mut applied = Vec::with_capacity(patch.hunks.len());
    let mut delta: isize = 0;

    for hunk in &patch.hunks {
        let expected = (hunk.start2 as isize + delta).max(0) as usize;
        let source: Vec<char> = hunk.source_text().chars().collect();
        let target: Vec<char> = hunk.target_text().chars().collect();

        let Some(start) = locate(&chars, &source, expected) else {
            crate::debug_event!("patch", "hunk not found", "expected at {expected}");
            applied.push(false);
            delta -= hunk.length2 as isize - hunk.length1 as isize;
            continue;
        };
        delta = start as isize - expected as isize;

        let end = (start + source.len()).min(chars.len());
        if chars[start..end] == source[..] {
            chars.splice(start..end, target);
            applied.push(true);
            continue;
        }

        // Imperfect match: map each edit through the diff between the
        // expected text and what is actually there.
        let found = chars[start..end].to_vec();
        let drift = diff_chars(&source, &found);
        if !source.is_empty()
            && levenshtein(&drift) as f64 / source.len() as f64 > DELETE_THRESHOLD
        {
            applied.push(false);
            continue;
        }

        let mut index1 = 0;
        for edit in &hunk.edits {
            let len = edit.char_len();
            match edit.op {
                Op::Insert => {
                    let at = (start + x_index(&drift, index1)).min(chars.len());
                    chars.splice(at..at, edit.text.chars());
                }
                Op::Delete => {
                    let hi = (start + x_index(&drift, index1 + len)).min(chars.len());
                    let lo = (start + x_index(&drift, index1)).min(hi);
                    chars.drain(lo..hi);
                }
                Op::Equal => {}
            }
            if edit.op != Op::Delete {
                index1 += len;
            }
        }
        applied.push(true);
    }

    ApplyReport {
        text: chars.into_iter().collect(),
        applied,
    }
}

/// Find where `pattern` best sits in `text`, preferring `expected`.
fn locate(text: &[char], pattern: &[char], expected: usize) -> Option<usize> {
    let expected = expected.min(text.len());
    if pattern.is_empty() {
        return Some(expected);
    }

    let m = pattern.len();
    if expected + m <= text.len() && text[expected..expected + m] == *pattern {
        return Some(expected);
    }

    let nearest = text
        .windows(m)
        .enumerate()
        .filter(|(_, w)| *w == pattern)
        .map(|(i, _)| i)
        .min_by_key(|i| i.abs_diff(expected));
    if nearest.is_some() {
        return nearest;
    }

    fuzzy_locate(text, &pattern[..m.min(MAX_PATTERN)], expected)
}

/// Best approximate start of `pattern` near `expected`, scored by error
/// ratio plus a distance penalty.
fn fuzzy_locate(text: &[char], pattern: &[char], expected: usize) -> Option<usize> {
    if text.is_empty() {
        return None;
    }

    let lo = expected.saturating_sub(MATCH_DISTANCE);
    let hi = (expected + MATCH_DISTANCE).min(text.len() - 1);
    let m = pattern.len() as f64;

    let mut best: Option<(usize, f64)> = None;
    for candidate in lo..=hi {
        let end = (candidate + pattern.len()).min(text.len());
        let errors = levenshtein(&diff_chars(pattern, &text[candidate..end])) as f64;
        let proximity = candidate.abs_diff(expected) as f64 / MATCH_DISTANCE as f64;
        let score = errors / m + proximity;

        if score <= MATCH_THRESHOLD && best.is_none_or(|(_, s)| score < s) {
            best = Some((candidate, score));
        }
    }

    best.map(|(pos, _)| pos)
}
