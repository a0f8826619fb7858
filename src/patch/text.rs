//! Serialized patch text.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use super::diff::{Edit, Op};
use super::{Hunk, Patch, PatchError};

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+),?(\d*) \+(\d+),?(\d*) @@$").expect("hunk header regex is valid")
});

/// Characters written verbatim; everything else is percent-encoded.
fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-_.!~*'();/?:@&=+$,# ".contains(c)
}

fn encode(text: &str, out: &mut String) {
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if is_unreserved(c) {
            out.push(c);
        } else {
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
}

fn decode(line: &str) -> Result<String, PatchError> {
    let bytes = line.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = line
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| PatchError::InvalidEncoding(line.to_string()))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| PatchError::InvalidEncoding(line.to_string()))
}

/// `start,len` in the 1-based header convention.
fn coords(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{len}", start + 1),
    }
}

fn parse_coords(start: &str, len: &str, header: &str) -> Result<(usize, usize), PatchError> {
    let invalid = || PatchError::InvalidHeader(header.to_string());
    let start: usize = start.parse().map_err(|_| invalid())?;
    match len {
        "" => Ok((start.checked_sub(1).ok_or_else(invalid)?, 1)),
        "0" => Ok((start, 0)),
        n => {
            let n: usize = n.parse().map_err(|_| invalid())?;
            Ok((start.checked_sub(1).ok_or_else(invalid)?, n))
        }
    }
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = format!(
            "@@ -{} +{} @@\n",
            coords(self.start1, self.length1),
            coords(self.start2, self.length2)
        );
        for edit in &self.edits {
            out.push(match edit.op {
                Op::Insert => '+',
                Op::Delete => '-',
                Op::Equal => ' ',
            });
            encode(&edit.text, &mut out);
            out.push('\n');
        }
        f.write_str(&out)
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for hunk in &self.hunks {
            write!(f, "{hunk}")?;
        }
        Ok(())
    }
}

impl FromStr for Patch {
    type Err = PatchError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut hunks = Vec::new();
        let mut lines = text.split('\n').peekable();

        while let Some(line) = lines.next() {
            if line.is_empty() {
                continue;
            }
            let caps = HEADER
                .captures(line)
                .ok_or_else(|| PatchError::InvalidHeader(line.to_string()))?;
            let (start1, length1) = parse_coords(&caps[1], &caps[2], line)?;
            let (start2, length2) = parse_coords(&caps[3], &caps[4], line)?;

            let mut hunk = Hunk {
                start1,
                start2,
                length1,
                length2,
                edits: Vec::new(),
            };

            while let Some(next) = lines.peek() {
                let op = match next.chars().next() {
                    Some('+') => Op::Insert,
                    Some('-') => Op::Delete,
                    Some(' ') => Op::Equal,
                    Some('@') => break,
                    None => {
                        lines.next();
                        continue;
                    }
                    Some(_) => return Err(PatchError::InvalidLine(next.to_string())),
                };
                hunk.edits.push(Edit::new(op, decode(&next[1..])?));
                lines.next();
            }

            hunks.push(hunk);
        }

        Ok(Patch { hunks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_keeps_spaces_and_escapes_newlines() {
        let mut out = String::new();
        encode("a b\n100%é", &mut out);
        assert_eq!(out, "a b%0A100%25%C3%A9");
        assert_eq!(decode(&out).unwrap(), "a b\n100%é");
    }

    #[test]
    fn test_decode_rejects_bad_escapes() {
        assert!(decode("abc%").is_err());
        assert!(decode("abc%zz").is_err());
        assert!(decode("%FF").is_err());
    }

    #[test]
    fn test_header_coordinates() {
        let patch = Patch::make(
            "The quick brown fox jumps over the lazy dog.",
            "The quick brown fox leaps over the lazy dog.",
        );
        assert_eq!(
            patch.to_string(),
            "@@ -17,11 +17,11 @@\n fox \n-jum\n+lea\n ps o\n"
        );
        assert_eq!(coords(0, 0), "0,0");
        assert_eq!(coords(4, 1), "5");
    }

    #[test]
    fn test_parse_round_trip() {
        let patch = Patch::make("hello\nworld\n", "hello\nbrave new world\n");
        let text = patch.to_string();
        let parsed: Patch = text.parse().unwrap();
        assert_eq!(parsed, patch);
    }

    #[test]
    fn test_parse_single_char_coordinates() {
        let patch: Patch = "@@ -3 +3,0 @@\n-x\n".parse().unwrap();
        let hunk = &patch.hunks[0];
        assert_eq!((hunk.start1, hunk.length1), (2, 1));
        assert_eq!((hunk.start2, hunk.length2), (3, 0));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "garbage".parse::<Patch>(),
            Err(PatchError::InvalidHeader(_))
        ));
        assert!(matches!(
            "@@ -1 +1 @@\n*oops\n".parse::<Patch>(),
            Err(PatchError::InvalidLine(_))
        ));
        assert!(matches!(
            "@@ -0 +1 @@\n".parse::<Patch>(),
            Err(PatchError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_empty_text_is_empty_patch() {
        assert!("".parse::<Patch>().unwrap().is_empty());
    }
}
