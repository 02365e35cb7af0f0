/// Line-oriented text patches between two content blobs.
///
/// Lines are split after each `\n` with the terminator kept, so the last line
/// may or may not end in a newline and concatenating the lines gives back the
/// exact input. Patches are stored as JSON text in version payloads.
use serde::{Deserialize, Serialize};
use similar::{Algorithm, ChangeTag, TextDiff};

/// FNV-1a 64-bit offset basis.
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime.
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Reasons a patch cannot be applied to a base text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchMismatchError {
    #[error("malformed patch payload: {0}")]
    Malformed(String),

    #[error("base has {actual} lines, patch expects {expected}")]
    BaseLineCount { expected: usize, actual: usize },

    #[error("base content checksum does not match patch")]
    BaseChecksum,

    #[error("deleted line {line} does not match base")]
    ContextMismatch { line: usize },

    #[error("patch reads past the end of the base at line {line}")]
    OutOfBounds { line: usize },

    #[error("patch leaves {remaining} base lines unconsumed")]
    TrailingBase { remaining: usize },

    #[error("patched content checksum does not match patch")]
    ResultChecksum,
}

/// One step of a patch, applied in order against a cursor over the base lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOp {
    /// Copy the next `count` base lines unchanged.
    Keep { count: usize },
    /// Skip base lines, which must equal `lines`.
    Delete { lines: Vec<String> },
    /// Emit new lines.
    Insert { lines: Vec<String> },
}

/// A reversible-forward patch from one text to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub base_lines: usize,
    pub base_checksum: u64,
    pub result_checksum: u64,
    pub ops: Vec<PatchOp>,
}

impl Patch {
    /// Whether applying this patch leaves the base unchanged.
    pub fn is_noop(&self) -> bool {
        self.base_checksum == self.result_checksum
            && self.ops.iter().all(|op| matches!(op, PatchOp::Keep { .. }))
    }

    /// Number of lines inserted and deleted.
    pub fn line_stats(&self) -> (usize, usize) {
        self.ops.iter().fold((0, 0), |(ins, del), op| match op {
            PatchOp::Keep { .. } => (ins, del),
            PatchOp::Delete { lines } => (ins, del + lines.len()),
            PatchOp::Insert { lines } => (ins + lines.len(), del),
        })
    }

    /// Serializes the patch into its payload text.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses a payload produced by [`Patch::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`PatchMismatchError::Malformed`] if the payload is not a patch.
    pub fn decode(payload: &str) -> Result<Self, PatchMismatchError> {
        serde_json::from_str(payload).map_err(|e| PatchMismatchError::Malformed(e.to_string()))
    }

    fn push(&mut self, op: PatchOp) {
        let op = match (self.ops.last_mut(), op) {
            (Some(PatchOp::Keep { count }), PatchOp::Keep { count: more }) => {
                *count += more;
                return;
            }
            (Some(PatchOp::Delete { lines }), PatchOp::Delete { lines: more })
            | (Some(PatchOp::Insert { lines }), PatchOp::Insert { lines: more }) => {
                lines.extend(more);
                return;
            }
            (_, op) => op,
        };
        self.ops.push(op);
    }
}

/// Splits text into lines, each keeping its trailing `\n` if present.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// 64-bit FNV-1a over the UTF-8 bytes of `text`.
pub fn checksum(text: &str) -> u64 {
    text.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Computes the patch turning `old` into `new`.
///
/// Deterministic and infallible. Identical inputs give a no-op patch rather
/// than an empty value.
pub fn diff(old: &str, new: &str) -> Patch {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);

    let mut patch = Patch {
        base_lines: old_lines.len(),
        base_checksum: checksum(old),
        result_checksum: checksum(new),
        ops: Vec::new(),
    };

    // Diff the pre-split slices so line boundaries match `apply` exactly.
    let text_diff = TextDiff::configure()
        .algorithm(Algorithm::Patience)
        .diff_slices(&old_lines, &new_lines);

    for change in text_diff.iter_all_changes() {
        let line = change.value();
        match change.tag() {
            ChangeTag::Equal => patch.push(PatchOp::Keep { count: 1 }),
            ChangeTag::Delete => patch.push(PatchOp::Delete {
                lines: vec![line.to_string()],
            }),
            ChangeTag::Insert => patch.push(PatchOp::Insert {
                lines: vec![line.to_string()],
            }),
        }
    }

    patch
}

/// Applies `patch` to `base`.
///
/// # Errors
///
/// Returns a [`PatchMismatchError`] if `base` is not the text the patch was
/// computed against, or if the output does not match the recorded result.
pub fn apply(base: &str, patch: &Patch) -> Result<String, PatchMismatchError> {
    let base_lines = split_lines(base);
    if base_lines.len() != patch.base_lines {
        return Err(PatchMismatchError::BaseLineCount {
            expected: patch.base_lines,
            actual: base_lines.len(),
        });
    }
    if checksum(base) != patch.base_checksum {
        return Err(PatchMismatchError::BaseChecksum);
    }

    let mut out = String::with_capacity(base.len());
    let mut cursor: usize = 0;

    for op in &patch.ops {
        match op {
            PatchOp::Keep { count } => {
                let end = cursor.saturating_add(*count);
                if end > base_lines.len() {
                    return Err(PatchMismatchError::OutOfBounds {
                        line: base_lines.len() + 1,
                    });
                }
                base_lines[cursor..end].iter().for_each(|l| out.push_str(l));
                cursor = end;
            }
            PatchOp::Delete { lines } => {
                for expected in lines {
                    let Some(actual) = base_lines.get(cursor) else {
                        return Err(PatchMismatchError::OutOfBounds { line: cursor + 1 });
                    };
                    if actual != expected {
                        return Err(PatchMismatchError::ContextMismatch { line: cursor + 1 });
                    }
                    cursor += 1;
                }
            }
            PatchOp::Insert { lines } => lines.iter().for_each(|l| out.push_str(l)),
        }
    }

    if cursor != base_lines.len() {
        return Err(PatchMismatchError::TrailingBase {
            remaining: base_lines.len() - cursor,
        });
    }
    if checksum(&out) != patch.result_checksum {
        return Err(PatchMismatchError::ResultChecksum);
    }
    Ok(out)
}

/// Decodes a payload and applies it to `base`.
///
/// # Errors
///
/// Returns a [`PatchMismatchError`] if the payload is malformed or doesn't fit `base`.
pub fn apply_encoded(base: &str, payload: &str) -> Result<String, PatchMismatchError> {
    let patch = Patch::decode(payload)?;
    apply(base, &patch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(old: &str, new: &str) {
        let patch = diff(old, new);
        let applied = apply(old, &patch).expect("apply");
        assert_eq!(applied, new, "round trip {old:?} -> {new:?}");

        let decoded = Patch::decode(&patch.encode().expect("encode")).expect("decode");
        assert_eq!(decoded, patch);
    }

    #[test]
    fn test_split_lines_keeps_terminators() {
        assert!(split_lines("").is_empty());
        assert_eq!(split_lines("a"), vec!["a"]);
        assert_eq!(split_lines("a\n"), vec!["a\n"]);
        assert_eq!(split_lines("a\nb"), vec!["a\n", "b"]);
        assert_eq!(split_lines("\n\n"), vec!["\n", "\n"]);
    }

    #[test]
    fn test_round_trip_edge_cases() {
        let cases = [
            ("", ""),
            ("", "hello"),
            ("hello", ""),
            ("line", "line\n"),
            ("line\n", "line"),
            ("a\nb\nc\n", "a\nc\n"),
            ("a\nb\nc", "x\na\nb\nc\ny"),
            ("\n\n\n", "\n"),
            ("same\ntext\n", "same\ntext\n"),
            ("# Título\n\nCafé ☕\n", "# Título\n\nCafé ☕ and 🍰\n"),
            ("crlf\r\nline\r\n", "crlf\r\nchanged\r\n"),
        ];
        for (old, new) in cases {
            round_trip(old, new);
        }
    }

    #[test]
    fn test_round_trip_long_document() {
        let old: String = (0..200).map(|i| format!("paragraph {i}\n")).collect();
        let new: String = (0..200)
            .filter(|i| i % 7 != 0)
            .map(|i| {
                if i % 11 == 0 {
                    format!("rewritten {i}\n")
                } else {
                    format!("paragraph {i}\n")
                }
            })
            .chain(std::iter::once("epilogue".to_string()))
            .collect();
        round_trip(&old, &new);
    }

    #[test]
    fn test_identical_text_is_explicit_noop() {
        let patch = diff("one\ntwo\n", "one\ntwo\n");
        assert!(patch.is_noop());
        assert_eq!(patch.ops, vec![PatchOp::Keep { count: 2 }]);

        let empty = diff("", "");
        assert!(empty.is_noop());
        assert!(empty.ops.is_empty());
        assert!(!empty.encode().expect("encode").is_empty());
    }

    #[test]
    fn test_diff_is_deterministic() {
        let a = "alpha\nbeta\ngamma\n";
        let b = "alpha\ngamma\ndelta\n";
        assert_eq!(
            diff(a, b).encode().expect("encode"),
            diff(a, b).encode().expect("encode")
        );
    }

    #[test]
    fn test_adjacent_ops_are_merged() {
        let patch = diff("a\nb\nc\n", "x\ny\nz\n");
        assert_eq!(patch.ops.len(), 2);
        assert_eq!(patch.line_stats(), (3, 3));
    }

    #[test]
    fn test_apply_rejects_wrong_base() {
        let patch = diff("a\nb\n", "a\nc\n");
        assert_eq!(
            apply("a\nb\nextra\n", &patch),
            Err(PatchMismatchError::BaseLineCount {
                expected: 2,
                actual: 3
            })
        );
        assert_eq!(apply("q\nb\n", &patch), Err(PatchMismatchError::BaseChecksum));
    }

    #[test]
    fn test_apply_reports_context_mismatch() {
        let mut patch = diff("a\nb\n", "a\nc\n");
        // Point the patch at a base whose second line differs.
        patch.base_checksum = checksum("a\nz\n");
        assert_eq!(
            apply("a\nz\n", &patch),
            Err(PatchMismatchError::ContextMismatch { line: 2 })
        );
    }

    #[test]
    fn test_apply_rejects_unconsumed_base() {
        let patch = Patch {
            base_lines: 2,
            base_checksum: checksum("a\nb\n"),
            result_checksum: checksum("a\n"),
            ops: vec![PatchOp::Keep { count: 1 }],
        };
        assert_eq!(
            apply("a\nb\n", &patch),
            Err(PatchMismatchError::TrailingBase { remaining: 1 })
        );
    }

    #[test]
    fn test_apply_rejects_keep_past_end() {
        let patch = Patch {
            base_lines: 1,
            base_checksum: checksum("a\n"),
            result_checksum: checksum("a\n"),
            ops: vec![PatchOp::Keep { count: 3 }],
        };
        assert_eq!(
            apply("a\n", &patch),
            Err(PatchMismatchError::OutOfBounds { line: 2 })
        );
    }

    #[test]
    fn test_keep_count_near_usize_max_is_out_of_bounds() {
        let patch = Patch {
            base_lines: 2,
            base_checksum: checksum("a\nb\n"),
            result_checksum: checksum("a\nb\n"),
            ops: vec![PatchOp::Keep { count: 1 }, PatchOp::Keep { count: usize::MAX }],
        };
        assert_eq!(
            apply("a\nb\n", &patch),
            Err(PatchMismatchError::OutOfBounds { line: 3 })
        );
    }

    #[test]
    fn test_encoded_payload_decodes_to_same_patch() {
        let patch = diff("title\nbody\n", "title\nnew body\n");
        let payload = patch.encode().expect("encode");
        assert!(payload.starts_with('{'));
        assert_eq!(
            apply_encoded("title\nbody\n", &payload),
            Ok("title\nnew body\n".to_string())
        );
    }

    #[test]
    fn test_apply_checks_result_checksum() {
        let mut patch = diff("a\n", "b\n");
        patch.result_checksum ^= 1;
        assert_eq!(apply("a\n", &patch), Err(PatchMismatchError::ResultChecksum));
    }

    #[test]
    fn test_decode_malformed_payload() {
        let err = apply_encoded("a", "full content, not a patch").unwrap_err();
        assert!(matches!(err, PatchMismatchError::Malformed(_)));
    }

    #[test]
    fn test_checksum_known_values() {
        assert_eq!(checksum(""), FNV_OFFSET);
        assert_eq!(checksum("a"), 0xaf63_dc4c_8601_ec8c);
        assert_ne!(checksum("a\n"), checksum("a"));
    }
}
