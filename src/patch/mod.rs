//! Text patches between a shadow and live content.
//!
//! Patches use the diff-match-patch text format so they can be replayed by
//! the server:
//!
//! ```text
//! @@ -17,11 +17,11 @@
//!  fox 
//! -jum
//! +lea
//!  ps o
//! ```
//!
//! Each hunk carries a few characters of context, grown until the context is
//! unique in the source. Application tolerates drift: a hunk is applied at
//! its expected offset, else at the nearest exact occurrence of its context,
//! else at the best fuzzy match.

mod apply;
mod diff;
mod make;
mod text;

use thiserror::Error;

pub use apply::ApplyReport;
pub use diff::{Edit, Op};

/// Characters of context kept on each side of a change.
pub const MARGIN: usize = 4;

/// Context stops growing once the pattern reaches this many characters.
pub const MAX_PATTERN: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("Invalid hunk header: {0}")]
    InvalidHeader(String),

    #[error("Invalid patch line prefix: {0}")]
    InvalidLine(String),

    #[error("Invalid percent-encoding in line: {0}")]
    InvalidEncoding(String),

    #[error("Hunk {index} could not be applied")]
    HunkFailed { index: usize },
}

/// One contiguous change with surrounding context.
///
/// Offsets and lengths count Unicode scalar values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hunk {
    pub start1: usize,
    pub start2: usize,
    pub length1: usize,
    pub length2: usize,
    pub edits: Vec<Edit>,
}

impl Hunk {
    /// Text this hunk expects to find (context plus deletions).
    pub fn source_text(&self) -> String {
        self.edits
            .iter()
            .filter(|e| e.op != Op::Insert)
            .map(|e| e.text.as_str())
            .collect()
    }

    /// Text this hunk leaves behind (context plus insertions).
    pub fn target_text(&self) -> String {
        self.edits
            .iter()
            .filter(|e| e.op != Op::Delete)
            .map(|e| e.text.as_str())
            .collect()
    }
}

/// An ordered list of hunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    pub hunks: Vec<Hunk>,
}

impl Patch {
    /// Build the patch turning `old` into `new`.
    pub fn make(old: &str, new: &str) -> Self {
        make::make_patch(old, new)
    }

    /// No hunks: the inputs were identical.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Apply with per-hunk results.
    pub fn apply(&self, text: &str) -> ApplyReport {
        apply::apply_patch(self, text)
    }
}

/// Patch text turning `old` into `new`; empty when they are equal.
pub fn compute_patch(old: &str, new: &str) -> String {
    Patch::make(old, new).to_string()
}

/// Apply patch text to `old`, keeping whatever hunks fit.
pub fn apply_patch_report(old: &str, patch_text: &str) -> Result<ApplyReport, PatchError> {
    let patch: Patch = patch_text.parse()?;
    Ok(patch.apply(old))
}

/// Apply patch text to `old`.
///
/// Fails if the text does not parse or any hunk cannot be placed.
pub fn apply_patch(old: &str, patch_text: &str) -> Result<String, PatchError> {
    let report = apply_patch_report(old, patch_text)?;
    if let Some(index) = report.applied.iter().position(|ok| !ok) {
        return Err(PatchError::HunkFailed { index });
    }
    Ok(report.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(a: &str, b: &str) {
        let text = compute_patch(a, b);
        assert_eq!(apply_patch(a, &text).unwrap(), b, "patch:\n{text}");
    }

    #[test]
    fn test_identical_inputs_give_empty_patch() {
        assert!(Patch::make("same", "same").is_empty());
        assert_eq!(compute_patch("", ""), "");
        assert_eq!(compute_patch("x", "x"), "");
    }

    #[test]
    fn test_round_trips() {
        round_trip("hello", "hello world");
        round_trip("", "fresh file\n");
        round_trip("to be removed\n", "");
        round_trip("abc", "xyz");
        round_trip(
            "fn main() {\n    println!(\"hi\");\n}\n",
            "fn main() {\n    let x = 1;\n    println!(\"hi {x}\");\n}\n",
        );
        round_trip("naïve café ☕ 日本語", "naive cafe ☕ 日本語です");
        round_trip("100% sure\twith tabs\r\n", "99% sure\twith tabs\r\nand more");
    }

    #[test]
    fn test_round_trip_many_hunks() {
        let old: String = (0..60).map(|i| format!("line {i}\n")).collect();
        let new = old
            .replace("line 3\n", "line three\n")
            .replace("line 30\n", "")
            .replace("line 59\n", "line 59\nappended\n");
        let patch = Patch::make(&old, &new);
        assert!(patch.hunks.len() >= 3);
        round_trip(&old, &new);
    }

    #[test]
    fn test_round_trip_repetitive_text() {
        let old = "aaaa aaaa aaaa aaaa aaaa aaaa aaaa";
        let new = "aaaa aaaa aaaa aaXa aaaa aaaa aaaa";
        round_trip(old, new);
    }

    #[test]
    fn test_round_trip_generated_pairs() {
        // Small deterministic generator, enough to shake out offset bugs.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };
        let alphabet: Vec<char> = "ab c\nd%é".chars().collect();

        for _ in 0..200 {
            let len_a = (next() % 40) as usize;
            let a: String = (0..len_a)
                .map(|_| alphabet[(next() % alphabet.len() as u64) as usize])
                .collect();
            let mut b: Vec<char> = a.chars().collect();
            for _ in 0..(next() % 5) {
                let pos = if b.is_empty() { 0 } else { (next() as usize) % (b.len() + 1) };
                if next() % 2 == 0 && pos < b.len() {
                    b.remove(pos);
                } else {
                    b.insert(pos, alphabet[(next() % alphabet.len() as u64) as usize]);
                }
            }
            let b: String = b.into_iter().collect();
            round_trip(&a, &b);
        }
    }

    #[test]
    fn test_applies_after_offset_drift() {
        let old = "The quick brown fox jumps over the lazy dog.";
        let new = "The quick brown fox leaps over the lazy dog.";
        let text = compute_patch(old, new);

        let drifted = "A preface line. The quick brown fox jumps over the lazy dog.";
        assert_eq!(
            apply_patch(drifted, &text).unwrap(),
            "A preface line. The quick brown fox leaps over the lazy dog."
        );
    }

    #[test]
    fn test_applies_with_fuzzy_context() {
        let old = "The quick brown fox jumps over the lazy dog.";
        let new = "The quick brown fox leaps over the lazy dog.";
        let text = compute_patch(old, new);

        let edited = "The quick brown fax jumps over the lazy dog.";
        assert_eq!(
            apply_patch(edited, &text).unwrap(),
            "The quick brown fax leaps over the lazy dog."
        );
    }

    #[test]
    fn test_unrelated_text_fails() {
        let text = compute_patch("The quick brown fox jumps", "The quick brown fox leaps");
        let err = apply_patch("0123456789", &text).unwrap_err();
        assert_eq!(err, PatchError::HunkFailed { index: 0 });
    }

    #[test]
    fn test_report_keeps_partial_results() {
        let old = "alpha ............................ omega";
        let new = "ALPHA ............................ omega";
        let text = compute_patch(old, new);
        let report = apply_patch_report("alpha ............................ zzzzz", &text).unwrap();
        assert!(report.all_applied());
        assert!(report.text.starts_with("ALPHA"));
    }
}
