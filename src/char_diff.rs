//! Character level diff between a left and a right value

use difference::{Changeset, Difference};
use serde::Serialize;
use serde_json::Value;

/// Text shown for a null value
pub const NULL_TEXT: &str = "NULL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Unchanged,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub value: String,
}

impl Segment {
    pub fn unchanged(value: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Unchanged,
            value: value.into(),
        }
    }

    pub fn added(value: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Added,
            value: value.into(),
        }
    }

    pub fn removed(value: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Removed,
            value: value.into(),
        }
    }
}

/// Display-ready diff of two values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharDiff {
    pub segments: Vec<Segment>,
    pub left_is_null: bool,
    pub right_is_null: bool,
}

impl CharDiff {
    pub fn has_change(&self) -> bool {
        self.segments
            .iter()
            .any(|s| s.kind != SegmentKind::Unchanged)
    }

    /// Two nulls compare equal as text but carry no value to show
    pub fn has_value(&self) -> bool {
        !(self.left_is_null && self.right_is_null)
    }

    /// Segments of the left side: unchanged and removed
    pub fn left_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .filter(|s| s.kind != SegmentKind::Added)
    }

    /// Segments of the right side: unchanged and added
    pub fn right_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .filter(|s| s.kind != SegmentKind::Removed)
    }

    pub fn left_display(&self) -> Option<Vec<&Segment>> {
        self.has_value().then(|| self.left_segments().collect())
    }

    pub fn right_display(&self) -> Option<Vec<&Segment>> {
        self.has_value().then(|| self.right_segments().collect())
    }
}

/// Format a value for display: strings are quoted, objects and arrays are
/// compact JSON, null is `NULL`.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => NULL_TEXT.to_string(),
        Value::String(s) => format!("\"{}\"", s),
        Value::Object(_) | Value::Array(_) => value.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
    }
}

/// Diff two values.
///
/// When exactly one side is null the whole left text is removed and the
/// whole right text is added, without aligning characters across the
/// null boundary.
pub fn char_diff(left: &Value, right: &Value) -> CharDiff {
    let left_is_null = left.is_null();
    let right_is_null = right.is_null();
    let left_text = format_value(left);
    let right_text = format_value(right);

    let segments = if left_is_null ^ right_is_null {
        vec![Segment::removed(left_text), Segment::added(right_text)]
    } else {
        diff_chars(&left_text, &right_text)
    };

    CharDiff {
        segments,
        left_is_null,
        right_is_null,
    }
}

/// Upper bound on the LCS table built for the differing middle of two
/// strings, in cells. Larger middles are shown as one removal and one
/// addition.
pub const MAX_DIFF_CELLS: usize = 1 << 22;

/// Character level diff of two strings.
///
/// The common prefix and suffix are matched in linear time; only the
/// middle goes through the LCS.
pub fn diff_chars(left: &str, right: &str) -> Vec<Segment> {
    let prefix = common_prefix_len(left, right);
    let suffix = common_suffix_len(&left[prefix..], &right[prefix..]);
    let left_middle = &left[prefix..left.len() - suffix];
    let right_middle = &right[prefix..right.len() - suffix];

    let mut segments: Vec<Segment> = Vec::new();
    push_segment(&mut segments, Segment::unchanged(&left[..prefix]));

    let cells = left_middle
        .chars()
        .count()
        .saturating_mul(right_middle.chars().count());
    if cells > MAX_DIFF_CELLS {
        log::debug!("Diff of {} cells over the limit, replacing wholesale", cells);
        push_segment(&mut segments, Segment::removed(left_middle));
        push_segment(&mut segments, Segment::added(right_middle));
    } else if !left_middle.is_empty() || !right_middle.is_empty() {
        let Changeset { diffs, .. } = Changeset::new(left_middle, right_middle, "");
        for diff in diffs {
            let segment = match diff {
                Difference::Same(x) => Segment::unchanged(x),
                Difference::Add(x) => Segment::added(x),
                Difference::Rem(x) => Segment::removed(x),
            };
            push_segment(&mut segments, segment);
        }
    }

    push_segment(&mut segments, Segment::unchanged(&left[left.len() - suffix..]));
    segments
}

/// Append a segment, merging it into the previous one of the same kind
fn push_segment(segments: &mut Vec<Segment>, segment: Segment) {
    if segment.value.is_empty() {
        return;
    }
    match segments.last_mut() {
        Some(last) if last.kind == segment.kind => last.value.push_str(&segment.value),
        _ => segments.push(segment),
    }
}

/// Length in bytes of the longest common prefix, on a char boundary
fn common_prefix_len(left: &str, right: &str) -> usize {
    left.char_indices()
        .zip(right.chars())
        .find(|((_, a), b)| a != b)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| left.len().min(right.len()))
}

/// Length in bytes of the longest common suffix, on a char boundary
fn common_suffix_len(left: &str, right: &str) -> usize {
    left.chars()
        .rev()
        .zip(right.chars().rev())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a.len_utf8())
        .sum()
}
