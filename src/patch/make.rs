use super::diff::{Edit, Op, diff_chars, first_and_last};
use super::{Hunk, MARGIN, MAX_PATTERN, Patch};

pub(super) fn make_patch(old: &str, new: &str) -> Patch {
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();
    if old_chars == new_chars {
        return Patch::default();
    }

    let edits = diff_chars(&old_chars, &new_chars);
    let last = edits.len().saturating_sub(1);

    let mut hunks = Vec::new();
    let mut hunk = Hunk::default();
    let mut count1 = 0;
    let mut count2 = 0;
    // Text as it reads before the current hunk / after the edits seen so far.
    let mut prepatch = old_chars.clone();
    let mut postpatch = old_chars;

    for (i, edit) in edits.iter().enumerate() {
        let chars: Vec<char> = edit.text.chars().collect();
        let len = chars.len();

        if hunk.edits.is_empty() && edit.op != Op::Equal {
            hunk.start1 = count1;
            hunk.start2 = count2;
        }

        match edit.op {
            Op::Insert => {
                hunk.edits.push(edit.clone());
                hunk.length2 += len;
                postpatch.splice(count2..count2, chars);
            }
            Op::Delete => {
                hunk.length1 += len;
                hunk.edits.push(edit.clone());
                postpatch.drain(count2..count2 + len);
            }
            Op::Equal => {
                if len <= 2 * MARGIN && !hunk.edits.is_empty() && i != last {
                    // Short gap: keep both sides in one hunk
                    hunk.edits.push(edit.clone());
                    hunk.length1 += len;
                    hunk.length2 += len;
                } else if len >= 2 * MARGIN && !hunk.edits.is_empty() {
                    add_context(&mut hunk, &prepatch);
                    hunks.push(std::mem::take(&mut hunk));
                    prepatch = postpatch.clone();
                    count1 = count2;
                }
            }
        }

        if edit.op != Op::Insert {
            count1 += len;
        }
        if edit.op != Op::Delete {
            count2 += len;
        }
    }

    if !hunk.edits.is_empty() {
        add_context(&mut hunk, &prepatch);
        hunks.push(hunk);
    }

    Patch { hunks }
}

/// Surround a hunk with enough context to locate it unambiguously.
fn add_context(hunk: &mut Hunk, text: &[char]) {
    if text.is_empty() {
        return;
    }

    let mut padding = 0;
    let mut pattern = window(text, hunk.start2, hunk.length1, padding);
    loop {
        let (first, last) = first_and_last(text, pattern);
        if first == last || pattern.len() >= MAX_PATTERN - 2 * MARGIN {
            break;
        }
        padding += MARGIN;
        pattern = window(text, hunk.start2, hunk.length1, padding);
    }
    padding += MARGIN;

    let start = hunk.start2.min(text.len());
    let prefix: String = text[hunk.start2.saturating_sub(padding).min(start)..start]
        .iter()
        .collect();
    let suffix_start = (hunk.start2 + hunk.length1).min(text.len());
    let suffix_end = (suffix_start + padding).min(text.len());
    let suffix: String = text[suffix_start..suffix_end].iter().collect();

    let prefix_len = prefix.chars().count();
    let suffix_len = suffix.chars().count();

    if prefix_len > 0 {
        hunk.edits.insert(0, Edit::new(Op::Equal, prefix));
    }
    if suffix_len > 0 {
        hunk.edits.push(Edit::new(Op::Equal, suffix));
    }

    hunk.start1 -= prefix_len;
    hunk.start2 -= prefix_len;
    hunk.length1 += prefix_len + suffix_len;
    hunk.length2 += prefix_len + suffix_len;
}

fn window(text: &[char], start: usize, len: usize, padding: usize) -> &[char] {
    let hi = (start + len + padding).min(text.len());
    let lo = start.saturating_sub(padding).min(hi);
    &text[lo..hi]
}
