//! Edge case tests for report decoding and aggregation

use crate::common::{sample_data, MockStore, TestFixture};
use data_diff_viewer::aggregate::{build_data_diff_table, DataDiffTable};
use data_diff_viewer::interaction::ViewState;
use data_diff_viewer::output::PrettyPrinter;
use data_diff_viewer::report::{decode_column_diff, decode_report_metadata, BucketKind};
use data_diff_viewer::{AnalyticalStore, ReportLoader, ViewerConfig, ViewerError};
use num_bigint::BigUint;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

fn empty_summary() -> serde_json::Value {
    json!({
        "same_schema": true,
        "schema_diff_str": "",
        "same_data": true,
        "total_nb_rows": 0,
        "left_df_alias": "left",
        "right_df_alias": "right",
        "join_cols": ["id"],
        "column_names_diff": {"id": " "}
    })
}

#[tokio::test]
async fn test_both_datasets_empty() {
    let fixture = TestFixture::new().unwrap();
    let column = json!({
        "column_number": 0,
        "column_name": "id",
        "counts": {"total": 0, "no_change": 0, "changed": 0, "only_in_left": 0, "only_in_right": 0},
        "diff": {}
    });
    let db = fixture
        .create_custom_report_db("empty.duckdb", &empty_summary(), &[column])
        .unwrap();

    let report = ReportLoader::new(ViewerConfig::with_defaults(&db))
        .load_report()
        .await
        .unwrap();
    let table = build_data_diff_table(&report);
    assert_eq!(table, DataDiffTable::Empty);

    let rendered = PrettyPrinter::render_data_diff_table(&table, &report, &ViewState::new(true, false));
    assert_eq!(rendered, "🟠 Both DataFrames are empty\n");
    assert!(PrettyPrinter::render_header(&report, &ViewState::new(true, false)).contains("DATA: OK (0)"));
}

#[test]
fn test_malformed_summary_json() {
    let mut row = sample_data::report_row(&json!({}));
    row.insert("diff_summary".to_string(), json!("{not json"));

    let err = decode_report_metadata(&[row]).unwrap_err();
    assert!(matches!(err, ViewerError::Decode { .. }));
}

#[test]
fn test_schema_change_without_description_is_rejected() {
    let mut summary = sample_data::fruit_summary();
    summary["schema_diff_str"] = json!("");

    let err = decode_report_metadata(&[sample_data::report_row(&summary)]).unwrap_err();
    assert!(matches!(err, ViewerError::Decode { .. }));
}

#[test]
fn test_extra_metadata_rows_use_first() {
    let first = sample_data::report_row(&sample_data::fruit_summary());
    let mut second = first.clone();
    second.insert("report_title".to_string(), json!("Second"));

    let (title, _, _) = decode_report_metadata(&[first, second]).unwrap();
    assert_eq!(title, "Fruit report");
}

#[test]
fn test_inconsistent_counts_are_rejected() {
    let column = json!({
        "column_number": 0,
        "column_name": "id",
        "counts": {"total": 10, "no_change": 3, "changed": 0, "only_in_left": 0, "only_in_right": 0},
        "diff": {}
    });
    let err = decode_column_diff(&sample_data::column_row(&column)).unwrap_err();
    assert!(matches!(err, ViewerError::Decode { .. }));
}

#[test]
fn test_counters_beyond_u64() {
    let huge = "123456789012345678901234567890";
    let column = json!({
        "column_number": 0,
        "column_name": "id",
        "counts": {"total": huge, "no_change": huge, "changed": "0", "only_in_left": 0, "only_in_right": 0},
        "diff": {"no_change": [{"value": 1, "nb": huge, "sample_ids": []}]}
    });

    let decoded = decode_column_diff(&sample_data::column_row(&column)).unwrap();
    assert_eq!(decoded.counts.total, BigUint::from_str(huge).unwrap());
    assert!(decoded.no_change());
    assert_eq!(decoded.diff.get(BucketKind::NoChange)[0].nb, BigUint::from_str(huge).unwrap());
}

#[test]
fn test_zero_nb_entry_is_kept() {
    let column = json!({
        "column_number": 0,
        "column_name": "id",
        "counts": {"total": 1, "no_change": 1, "changed": 0, "only_in_left": 0, "only_in_right": 0},
        "diff": {"no_change": [{"value": 1, "nb": 1}, {"value": 2, "nb": 0}]}
    });

    let decoded = decode_column_diff(&sample_data::column_row(&column)).unwrap();
    assert_eq!(decoded.diff.no_change.len(), 2);
    assert!(decoded.diff.no_change[1].sample_ids.is_empty());
}

#[test]
fn test_changed_entry_with_null_side() {
    let column = json!({
        "column_number": 3,
        "column_name": "price",
        "counts": {"total": 1, "no_change": 0, "changed": 1, "only_in_left": 0, "only_in_right": 0},
        "diff": {"changed": [{"left_value": null, "right_value": 1.5, "nb": 1, "sample_ids": [""]}]}
    });

    let decoded = decode_column_diff(&sample_data::column_row(&column)).unwrap();
    let entry = &decoded.diff.changed[0];
    assert_eq!(entry.sample_ids, vec![None]);
    assert!(!entry.has_sample());
}

#[tokio::test]
async fn test_unknown_diff_per_col_table_fails_load() {
    let mut summary = sample_data::fruit_summary();
    summary["diff_per_col_table_name"] = json!("missing_table");

    let store = Arc::new(MockStore::new());
    store.respond("diff_report", vec![sample_data::report_row(&summary)]);
    store.fail("missing_table", 1);

    let loader = ReportLoader::with_store(
        ViewerConfig::with_defaults("mock.duckdb"),
        Arc::clone(&store) as Arc<dyn AnalyticalStore>,
    );
    let err = loader.load_report().await.unwrap_err();
    assert!(matches!(err, ViewerError::Load { .. }));
}
