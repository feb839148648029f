//! Integration tests for sample row resolution

use crate::common::{sample_data, MockStore};
use data_diff_viewer::report::{decode_column_diff, DiffReport, SchemaDiffSummary};
use data_diff_viewer::sample::{SampleCell, SampleRow, SampleRowResolver};
use data_diff_viewer::AnalyticalStore;
use serde_json::json;
use std::sync::Arc;

fn tables(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn resolver(store: &Arc<MockStore>) -> SampleRowResolver {
    SampleRowResolver::new(Arc::clone(store) as Arc<dyn AnalyticalStore>, "__SAMPLE_ID__")
}

#[tokio::test]
async fn test_partial_rows_are_merged_and_unmangled() {
    let store = Arc::new(MockStore::new());
    store.respond("\"t1\"", vec![sample_data::sample_row(&[("a", json!(1))])]);
    store.respond("\"t2\"", vec![sample_data::sample_row(&[("b__STRUCT__c", json!(2))])]);

    let merged = resolver(&store)
        .resolve(&tables(&["t1", "t2"]), &[Some("x".into()), Some("y".into())])
        .await;

    let keys: Vec<&str> = merged.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["a", "b.c"]);
    assert_eq!(merged["a"], json!(1));
    assert_eq!(merged["b.c"], json!(2));
    assert_eq!(store.query_count("= 'x' LIMIT 1"), 1);
    assert_eq!(store.query_count("= 'y' LIMIT 1"), 1);
}

#[tokio::test]
async fn test_missing_ids_are_not_queried() {
    let store = Arc::new(MockStore::new());
    store.respond("\"t2\"", vec![sample_data::sample_row(&[("b", json!("only"))])]);

    let merged = resolver(&store)
        .resolve(&tables(&["t1", "t2"]), &[None, Some("y".into())])
        .await;

    assert_eq!(merged.len(), 1);
    assert_eq!(store.query_count("\"t1\""), 0);
}

#[tokio::test]
async fn test_failing_table_is_skipped() {
    let store = Arc::new(MockStore::new());
    store.respond("\"t1\"", vec![sample_data::sample_row(&[("a", json!(1))])]);
    store.respond("\"t2\"", vec![sample_data::sample_row(&[("b", json!(2))])]);
    store.fail("\"t1\"", 1);

    let merged = resolver(&store)
        .resolve(&tables(&["t1", "t2"]), &[Some("x".into()), Some("y".into())])
        .await;

    let keys: Vec<&str> = merged.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["b"]);
}

#[tokio::test]
async fn test_no_row_found_projects_to_none() {
    let store = Arc::new(MockStore::new());
    let merged = resolver(&store)
        .resolve(&tables(&["t1"]), &[Some("nothing".into())])
        .await;
    assert!(merged.is_empty());

    let summary: SchemaDiffSummary = serde_json::from_value(sample_data::fruit_summary()).unwrap();
    let report = DiffReport::new("r".to_string(), chrono::Utc::now(), summary, Vec::new());
    assert!(SampleRow::project(&merged, &report, None).is_none());
}

#[tokio::test]
async fn test_projection_follows_report_columns() {
    let store = Arc::new(MockStore::new());
    store.respond(
        "\"sample_0\"",
        vec![sample_data::sample_row(&[
            ("__SAMPLE_ID__", json!("s1")),
            ("name", sample_data::sides(json!("apple"), json!("apples"))),
            ("id", sample_data::sides(json!(1), json!(1))),
        ])],
    );

    let merged = resolver(&store)
        .resolve(&tables(&["sample_0"]), &[Some("s1".into())])
        .await;

    let summary: SchemaDiffSummary = serde_json::from_value(sample_data::fruit_summary()).unwrap();
    let columns = sample_data::fruit_columns()
        .iter()
        .map(|c| decode_column_diff(&sample_data::column_row(c)).unwrap())
        .collect();
    let report = DiffReport::new("r".to_string(), chrono::Utc::now(), summary, columns);

    let row = SampleRow::project(&merged, &report, Some("name")).unwrap();
    let names: Vec<&str> = row.columns.iter().map(|c| c.column_name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "b.c"]);

    let name = row.column("name").unwrap();
    assert!(name.selected);
    match &name.cell {
        SampleCell::Present {
            left_value,
            right_value,
            diff,
        } => {
            assert_eq!(left_value, &json!("apple"));
            assert_eq!(right_value, &json!("apples"));
            assert!(diff.has_change());
        }
        SampleCell::Missing => panic!("name should be present"),
    }

    assert_eq!(row.column("b.c").unwrap().cell, SampleCell::Missing);
    assert!(!row.column("id").unwrap().selected);
}
