//! Character-level diff primitives built on `similar`.

use similar::{Algorithm, DiffOp, capture_diff_slices};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Equal,
    Delete,
    Insert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub op: Op,
    pub text: String,
}

impl Edit {
    pub fn new(op: Op, text: impl Into<String>) -> Self {
        Self {
            op,
            text: text.into(),
        }
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Diff two character sequences.
///
/// Within every run of changes all deletions come before all insertions,
/// and no two neighbouring edits share an op.
pub(crate) fn diff_chars(old: &[char], new: &[char]) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut deleted = String::new();
    let mut inserted = String::new();

    let flush = |edits: &mut Vec<Edit>, deleted: &mut String, inserted: &mut String| {
        if !deleted.is_empty() {
            edits.push(Edit::new(Op::Delete, std::mem::take(deleted)));
        }
        if !inserted.is_empty() {
            edits.push(Edit::new(Op::Insert, std::mem::take(inserted)));
        }
    };

    for op in capture_diff_slices(Algorithm::Myers, old, new) {
        match op {
            DiffOp::Equal { old_index, len, .. } => {
                if len == 0 {
                    continue;
                }
                flush(&mut edits, &mut deleted, &mut inserted);
                let text: String = old[old_index..old_index + len].iter().collect();
                match edits.last_mut() {
                    Some(last) if last.op == Op::Equal => last.text.push_str(&text),
                    _ => edits.push(Edit::new(Op::Equal, text)),
                }
            }
            DiffOp::Delete {
                old_index, old_len, ..
            } => deleted.extend(&old[old_index..old_index + old_len]),
            DiffOp::Insert {
                new_index, new_len, ..
            } => inserted.extend(&new[new_index..new_index + new_len]),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                deleted.extend(&old[old_index..old_index + old_len]);
                inserted.extend(&new[new_index..new_index + new_len]);
            }
        }
    }
    flush(&mut edits, &mut deleted, &mut inserted);

    edits
}

/// Number of inserted, deleted or substituted characters.
pub(crate) fn levenshtein(edits: &[Edit]) -> usize {
    let mut total = 0;
    let mut insertions = 0;
    let mut deletions = 0;

    for edit in edits {
        match edit.op {
            Op::Insert => insertions += edit.char_len(),
            Op::Delete => deletions += edit.char_len(),
            Op::Equal => {
                total += insertions.max(deletions);
                insertions = 0;
                deletions = 0;
            }
        }
    }

    total + insertions.max(deletions)
}

/// Map a character offset in the diff's source to the same spot in its
/// target. Offsets inside a deletion map to the deletion point.
pub(crate) fn x_index(edits: &[Edit], loc: usize) -> usize {
    let mut chars1 = 0;
    let mut chars2 = 0;
    let mut last1 = 0;
    let mut last2 = 0;

    for edit in edits {
        let len = edit.char_len();
        if edit.op != Op::Insert {
            chars1 += len;
        }
        if edit.op != Op::Delete {
            chars2 += len;
        }
        if chars1 > loc {
            if edit.op == Op::Delete {
                return last2;
            }
            break;
        }
        last1 = chars1;
        last2 = chars2;
    }

    last2 + (loc - last1)
}

/// First and last start offsets of `needle` in `hay`.
pub(crate) fn first_and_last(hay: &[char], needle: &[char]) -> (Option<usize>, Option<usize>) {
    if needle.is_empty() {
        return (Some(0), Some(hay.len()));
    }
    if needle.len() > hay.len() {
        return (None, None);
    }
    let mut positions = hay
        .windows(needle.len())
        .enumerate()
        .filter(|(_, w)| *w == needle)
        .map(|(i, _)| i);
    let first = positions.next();
    let last = positions.last().or(first);
    (first, last)
}
