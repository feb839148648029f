//! Unit tests for the per-column aggregation

use crate::common::sample_data;
use data_diff_viewer::aggregate::{aggregate_column, build_data_diff_table, BucketColor, DataDiffTable};
use data_diff_viewer::report::{decode_column_diff, BucketKind, DiffReport, SchemaDiffSummary};
use serde_json::json;

fn fruit_report() -> DiffReport {
    let summary: SchemaDiffSummary = serde_json::from_value(sample_data::fruit_summary()).unwrap();
    let columns = sample_data::fruit_columns()
        .iter()
        .map(|c| decode_column_diff(&sample_data::column_row(c)).unwrap())
        .collect();
    DiffReport::new(
        "Fruit report".to_string(),
        chrono::Utc::now(),
        summary,
        columns,
    )
}

#[test]
fn test_buckets_in_display_order_with_labels() {
    let report = fruit_report();
    let summary = aggregate_column(report.column("name").unwrap(), &report.diff_summary);

    let kinds: Vec<BucketKind> = summary.buckets.iter().map(|b| b.kind).collect();
    assert_eq!(kinds, BucketKind::ALL.to_vec());

    let left = summary.bucket(BucketKind::OnlyInLeft).unwrap();
    assert_eq!(left.name, "Only in before");
    assert_eq!(left.top_title, "Most frequent values in before");
    assert_eq!(left.color, BucketColor::Blue);

    let right = summary.bucket(BucketKind::OnlyInRight).unwrap();
    assert_eq!(right.name, "Only in after");
    assert_eq!(right.color, BucketColor::Purple);
}

#[test]
fn test_bucket_percentages_sum_to_about_100() {
    let report = fruit_report();
    for column in &report.diff_per_col {
        let summary = aggregate_column(column, &report.diff_summary);
        let total: u64 = summary.buckets.iter().map(|b| b.pct.hundredths()).sum();
        assert!(
            (9_996..=10_004).contains(&total),
            "column {} sums to {}",
            column.column_name,
            total
        );
    }
}

#[test]
fn test_rounded_percentages_stay_near_100() {
    let report = fruit_report();
    let cases = [[1, 1, 1, 0], [2, 1, 0, 0], [1, 1, 1, 4], [1, 0, 0, 6]];

    for [no_change, changed, only_in_left, only_in_right] in cases {
        let total = no_change + changed + only_in_left + only_in_right;
        let column = json!({
            "column_number": 0,
            "column_name": "thirds",
            "counts": {
                "total": total,
                "no_change": no_change,
                "changed": changed,
                "only_in_left": only_in_left,
                "only_in_right": only_in_right
            },
            "diff": {}
        });
        let column = decode_column_diff(&sample_data::column_row(&column)).unwrap();
        let summary = aggregate_column(&column, &report.diff_summary);

        let sum: u64 = summary.buckets.iter().map(|b| b.pct.hundredths()).sum();
        assert!((9_996..=10_004).contains(&sum), "{} of {} sums to {}", no_change, total, sum);
    }

    let column = json!({
        "column_number": 0,
        "column_name": "thirds",
        "counts": {"total": 3, "no_change": 1, "changed": 1, "only_in_left": 1, "only_in_right": 0},
        "diff": {}
    });
    let column = decode_column_diff(&sample_data::column_row(&column)).unwrap();
    let summary = aggregate_column(&column, &report.diff_summary);
    let pcts: Vec<String> = summary.buckets.iter().map(|b| b.pct.to_string()).collect();
    assert_eq!(pcts, vec!["33.33", "33.33", "33.33", "0.00"]);
}

#[test]
fn test_ranking_keeps_report_order_on_ties() {
    let report = fruit_report();
    let summary = aggregate_column(report.column("id").unwrap(), &report.diff_summary);
    let no_change = summary.bucket(BucketKind::NoChange).unwrap();

    let values: Vec<_> = no_change
        .diff
        .iter()
        .map(|r| match &r.entry.values {
            data_diff_viewer::report::EntryValues::Single { value } => value.clone(),
            other => panic!("unexpected values {:?}", other),
        })
        .collect();
    assert_eq!(values, vec![json!(1), json!(2), json!(3)]);
    assert!(no_change.diff.iter().all(|r| r.pct.to_string() == "20.00"));
}

#[test]
fn test_empty_bucket_has_no_details() {
    let report = fruit_report();
    let summary = aggregate_column(report.column("id").unwrap(), &report.diff_summary);

    let changed = summary.bucket(BucketKind::Changed).unwrap();
    assert!(!changed.shows_details());
    assert_eq!(changed.bar_width(), 0.0);
    assert_eq!(changed.pct.to_string(), "0.00");
}

#[test]
fn test_join_column_and_marker() {
    let report = fruit_report();
    let id = aggregate_column(report.column("id").unwrap(), &report.diff_summary);
    let name = aggregate_column(report.column("name").unwrap(), &report.diff_summary);

    assert!(id.is_join_col);
    assert!(!name.is_join_col);
    assert_eq!(id.marker, " ");
    assert!(!id.no_change);
}

#[test]
fn test_tooltip_lists_every_bucket() {
    let report = fruit_report();
    let summary = aggregate_column(report.column("name").unwrap(), &report.diff_summary);
    assert_eq!(
        summary.tooltip(),
        "Not changed: 1 (20.00 %)\nChanged: 2 (40.00 %)\nOnly in before: 1 (20.00 %)\nOnly in after: 1 (20.00 %)"
    );
}

#[test]
fn test_data_diff_table_follows_column_number() {
    let report = fruit_report();
    match build_data_diff_table(&report) {
        DataDiffTable::Columns(columns) => {
            let names: Vec<&str> = columns.iter().map(|c| c.column_name.as_str()).collect();
            assert_eq!(names, vec!["id", "name", "b.c"]);
        }
        DataDiffTable::Empty => panic!("report is not empty"),
    }
}

#[test]
fn test_serialized_bucket_shape() {
    let report = fruit_report();
    let summary = aggregate_column(report.column("name").unwrap(), &report.diff_summary);
    let value = serde_json::to_value(summary.bucket(BucketKind::Changed).unwrap()).unwrap();

    assert_eq!(value["type"], json!("changed"));
    assert_eq!(value["count"], json!(2));
    assert_eq!(value["pct"], json!("40.00"));
    assert_eq!(value["color"], json!("red"));
    assert_eq!(value["diff"][0]["left_value"], json!("apple"));
    assert_eq!(value["diff"][0]["right_value"], json!("apples"));
}
