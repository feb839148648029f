//! Unit tests for character level value diffs

use data_diff_viewer::char_diff::{char_diff, diff_chars, Segment, SegmentKind, MAX_DIFF_CELLS};
use data_diff_viewer::output::{render_left, render_right};
use serde_json::{json, Value};

fn concat(kinds: &[SegmentKind], left: &Value, right: &Value) -> String {
    char_diff(left, right)
        .segments
        .iter()
        .filter(|s| kinds.contains(&s.kind))
        .map(|s| s.value.as_str())
        .collect()
}

#[test]
fn test_sides_rebuild_the_formatted_values() {
    let cases = [
        (json!("apple"), json!("apples")),
        (json!("pear"), json!("peach")),
        (json!(1.5), json!(15)),
        (json!({"a": 1}), json!({"a": 2})),
        (json!("Café"), json!("Cafe")),
    ];

    for (left, right) in cases {
        let left_side = concat(&[SegmentKind::Unchanged, SegmentKind::Removed], &left, &right);
        let right_side = concat(&[SegmentKind::Unchanged, SegmentKind::Added], &left, &right);
        assert_eq!(left_side, data_diff_viewer::char_diff::format_value(&left));
        assert_eq!(right_side, data_diff_viewer::char_diff::format_value(&right));
    }
}

#[test]
fn test_appended_suffix() {
    let diff = char_diff(&json!("apple"), &json!("apples"));
    assert_eq!(render_left(&diff), "\"apple\"");
    assert_eq!(render_right(&diff), "\"apple{+s+}\"");
}

#[test]
fn test_both_null_has_nothing_to_show() {
    let diff = char_diff(&Value::Null, &Value::Null);
    assert!(!diff.has_change());
    assert!(!diff.has_value());
    assert!(diff.left_display().is_none());
    assert!(diff.right_display().is_none());
}

#[test]
fn test_no_empty_segments() {
    for (a, b) in [("", "abc"), ("abc", ""), ("", ""), ("xyz", "abc")] {
        assert!(diff_chars(a, b).iter().all(|s| !s.value.is_empty()));
    }
}

#[test]
fn test_numbers_diff_as_text() {
    let diff = char_diff(&json!(100), &json!(101));
    assert!(diff.has_change());
    assert!(diff.left_segments().all(|s| s.kind != SegmentKind::Added));
    assert!(diff.right_segments().all(|s| s.kind != SegmentKind::Removed));
}

#[test]
fn test_large_near_identical_values() {
    let base = "0123456789".repeat(2_000);
    let left = format!("{}x{}", base, base);
    let right = format!("{}y{}", base, base);

    assert_eq!(
        diff_chars(&left, &right),
        vec![
            Segment::unchanged(base.as_str()),
            Segment::removed("x"),
            Segment::added("y"),
            Segment::unchanged(base.as_str()),
        ]
    );
}

#[test]
fn test_large_rewrite_is_replaced_wholesale() {
    let left = format!("[{}]", "a".repeat(5_000));
    let right = format!("[{}]", "b".repeat(5_000));

    let segments = diff_chars(&left, &right);
    assert_eq!(
        segments,
        vec![
            Segment::unchanged("["),
            Segment::removed("a".repeat(5_000)),
            Segment::added("b".repeat(5_000)),
            Segment::unchanged("]"),
        ]
    );
    assert!(5_000 * 5_000 > MAX_DIFF_CELLS);
}

#[test]
fn test_large_json_values_keep_both_sides() {
    let left = json!({ "items": vec!["alpha"; 4_000] });
    let mut items = vec!["alpha"; 4_000];
    items[2_000] = "omega";
    let right = json!({ "items": items });

    let left_side = concat(&[SegmentKind::Unchanged, SegmentKind::Removed], &left, &right);
    let right_side = concat(&[SegmentKind::Unchanged, SegmentKind::Added], &left, &right);
    assert_eq!(left_side, data_diff_viewer::char_diff::format_value(&left));
    assert_eq!(right_side, data_diff_viewer::char_diff::format_value(&right));
}
