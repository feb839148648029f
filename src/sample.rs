//! Resolution of sample ids into full sample rows

use crate::char_diff::{char_diff, CharDiff};
use crate::error::{Result, ViewerError};
use crate::report::{DiffReport, SampleId};
use crate::store::{quote_identifier, quote_literal, AnalyticalStore, Row};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Marker of a nested struct field in a sample column label
pub const STRUCT_MARKER: &str = "__STRUCT__";
/// Marker of a repeated (array) field in a sample column label
pub const ARRAY_MARKER: &str = "__ARRAY__";

/// Raw label marker → display text. Unknown markers pass through.
const COLUMN_NAME_ESCAPES: [(&str, &str); 2] = [(STRUCT_MARKER, "."), (ARRAY_MARKER, "!")];

/// Decode a raw sample column label into the report's column name,
/// e.g. `b__STRUCT__c` → `b.c`, `tags__ARRAY__` → `tags!`
pub fn unmangle_column_name(raw: &str) -> String {
    COLUMN_NAME_ESCAPES
        .iter()
        .fold(raw.to_string(), |name, (marker, replacement)| {
            name.replace(marker, replacement)
        })
}

/// Point lookup of one sample row
pub fn sample_lookup_sql(table: &str, id_column: &str, sample_id: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE {} = {} LIMIT 1",
        quote_identifier(table),
        quote_identifier(id_column),
        quote_literal(sample_id)
    )
}

/// Fetches partial rows from the sample tables and merges them
pub struct SampleRowResolver {
    store: Arc<dyn AnalyticalStore>,
    id_column: String,
}

impl SampleRowResolver {
    pub fn new(store: Arc<dyn AnalyticalStore>, id_column: impl Into<String>) -> Self {
        Self {
            store,
            id_column: id_column.into(),
        }
    }

    /// Look up `sample_ids[i]` in `table_names[i]` for every table
    /// concurrently and merge the rows found, left to right.
    ///
    /// Missing ids, missing rows and failed lookups contribute nothing.
    pub async fn resolve(&self, table_names: &[String], sample_ids: &[SampleId]) -> Row {
        let lookups = table_names
            .iter()
            .zip(sample_ids.iter())
            .filter_map(|(table, id)| id.as_deref().map(|id| (table.as_str(), id)))
            .map(|(table, id)| self.lookup(table, id));

        let partial_rows = join_all(lookups).await;

        let mut merged = Row::new();
        for partial in partial_rows {
            match partial {
                Ok(Some(row)) => merged.extend(row),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping sample table: {}", e),
            }
        }

        merged
            .into_iter()
            .map(|(label, value)| (unmangle_column_name(&label), value))
            .collect()
    }

    async fn lookup(&self, table: &str, sample_id: &str) -> Result<Option<Row>> {
        let sql = sample_lookup_sql(table, &self.id_column, sample_id);
        let rows = self
            .store
            .query(&sql)
            .await
            .map_err(|e| ViewerError::sample_lookup(table, e.to_string()))?;

        if rows.is_empty() {
            log::debug!("No row with id '{}' in sample table '{}'", sample_id, table);
        }

        Ok(rows.into_iter().next())
    }
}

/// Value of one column in the sample row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SampleCell {
    Present {
        left_value: Value,
        right_value: Value,
        diff: CharDiff,
    },
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleColumn {
    pub column_name: String,
    /// Column of the selected diff entry
    pub selected: bool,
    pub cell: SampleCell,
}

/// A merged sample row laid out in the report's column order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRow {
    pub columns: Vec<SampleColumn>,
}

impl SampleRow {
    /// Project a merged row onto the report columns. Returns `None` when no
    /// sample table held the row.
    pub fn project(merged: &Row, report: &DiffReport, selected_column: Option<&str>) -> Option<Self> {
        if merged.is_empty() {
            return None;
        }

        let columns = report
            .diff_per_col
            .iter()
            .map(|col| SampleColumn {
                column_name: col.column_name.clone(),
                selected: selected_column == Some(col.column_name.as_str()),
                cell: split_sides(merged.get(&col.column_name)),
            })
            .collect();

        Some(Self { columns })
    }

    pub fn column(&self, name: &str) -> Option<&SampleColumn> {
        self.columns.iter().find(|c| c.column_name == name)
    }
}

/// Split a merged value into its left and right side
fn split_sides(value: Option<&Value>) -> SampleCell {
    let (left_value, right_value) = match value {
        None | Some(Value::Null) => return SampleCell::Missing,
        Some(Value::Object(object))
            if object.contains_key("left_value") || object.contains_key("right_value") =>
        {
            (
                object.get("left_value").cloned().unwrap_or(Value::Null),
                object.get("right_value").cloned().unwrap_or(Value::Null),
            )
        }
        Some(other) => (other.clone(), other.clone()),
    };

    let diff = char_diff(&left_value, &right_value);
    SampleCell::Present {
        left_value,
        right_value,
        diff,
    }
}
