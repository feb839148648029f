//! Diff report model and decoding of the raw report rows

use crate::error::{Result, ViewerError};
use crate::store::Row;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use indexmap::IndexMap;
use num_bigint::BigUint;
use num_traits::{FromPrimitive, Zero};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Identifier of a row inside one partitioned sample table, absent when that
/// table does not hold the row
pub type SampleId = Option<String>;

/// The complete decoded report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffReport {
    pub report_title: String,
    pub creation_timestamp: DateTime<Utc>,
    pub diff_summary: SchemaDiffSummary,
    /// Sorted ascending by `column_number`
    pub diff_per_col: Vec<ColumnDiff>,
}

impl DiffReport {
    pub fn new(
        report_title: String,
        creation_timestamp: DateTime<Utc>,
        diff_summary: SchemaDiffSummary,
        mut diff_per_col: Vec<ColumnDiff>,
    ) -> Self {
        diff_per_col.sort_by_key(|col| col.column_number);
        Self {
            report_title,
            creation_timestamp,
            diff_summary,
            diff_per_col,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDiff> {
        self.diff_per_col.iter().find(|col| col.column_name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.diff_per_col
            .iter()
            .map(|col| col.column_name.as_str())
            .collect()
    }

    /// Both datasets are empty
    pub fn is_empty(&self) -> bool {
        self.diff_summary.total_nb_rows.is_zero()
    }
}

/// Metadata of the diff, stored as JSON text in `diff_report.diff_summary`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDiffSummary {
    pub same_schema: bool,
    pub same_data: bool,
    #[serde(default)]
    pub schema_diff_str: String,
    #[serde(with = "counter")]
    pub total_nb_rows: BigUint,
    pub left_df_alias: String,
    pub right_df_alias: String,
    #[serde(default)]
    pub join_cols: Vec<String>,
    /// Column name → " " (both sides), "-" (left only) or "+" (right only)
    #[serde(default)]
    pub column_names_diff: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_with: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_diff_viewer_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_serialized_with: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_per_col_table_name: Option<String>,
}

impl SchemaDiffSummary {
    pub fn is_join_col(&self, column_name: &str) -> bool {
        self.join_cols.iter().any(|c| c == column_name)
    }

    /// Marker displayed in front of a column name, a blank when unknown
    pub fn column_marker(&self, column_name: &str) -> &str {
        self.column_names_diff
            .get(column_name)
            .map(String::as_str)
            .unwrap_or(" ")
    }

    pub fn validate(&self) -> Result<()> {
        if !self.same_schema && self.schema_diff_str.trim().is_empty() {
            return Err(ViewerError::decode(
                "diff_summary reports a schema change but schema_diff_str is empty",
            ));
        }
        Ok(())
    }
}

/// The four mutually exclusive outcome categories of a column's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKind {
    NoChange,
    Changed,
    OnlyInLeft,
    OnlyInRight,
}

impl BucketKind {
    /// Display order of the buckets
    pub const ALL: [BucketKind; 4] = [
        BucketKind::NoChange,
        BucketKind::Changed,
        BucketKind::OnlyInLeft,
        BucketKind::OnlyInRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BucketKind::NoChange => "no_change",
            BucketKind::Changed => "changed",
            BucketKind::OnlyInLeft => "only_in_left",
            BucketKind::OnlyInRight => "only_in_right",
        }
    }
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketKind {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self> {
        BucketKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                ViewerError::invalid_input(format!(
                    "Unknown bucket '{}', expected one of: no_change, changed, only_in_left, only_in_right",
                    s
                ))
            })
    }
}

/// One column of the diff
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDiff {
    pub column_number: u64,
    pub column_name: String,
    pub counts: DiffCounts,
    pub diff: DiffBuckets,
}

impl ColumnDiff {
    /// True when every value of the column is unchanged
    pub fn no_change(&self) -> bool {
        self.counts.no_change == self.counts.total
    }
}

/// Global counts of a column, unbounded width
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffCounts {
    #[serde(with = "counter")]
    pub total: BigUint,
    #[serde(with = "counter")]
    pub no_change: BigUint,
    #[serde(with = "counter")]
    pub changed: BigUint,
    #[serde(with = "counter")]
    pub only_in_left: BigUint,
    #[serde(with = "counter")]
    pub only_in_right: BigUint,
}

impl DiffCounts {
    pub fn get(&self, kind: BucketKind) -> &BigUint {
        match kind {
            BucketKind::NoChange => &self.no_change,
            BucketKind::Changed => &self.changed,
            BucketKind::OnlyInLeft => &self.only_in_left,
            BucketKind::OnlyInRight => &self.only_in_right,
        }
    }

    pub fn is_consistent(&self) -> bool {
        &self.no_change + &self.changed + &self.only_in_left + &self.only_in_right == self.total
    }
}

/// Most frequent examples of each bucket, in server order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffBuckets {
    pub no_change: Vec<DiffEntry>,
    pub changed: Vec<DiffEntry>,
    pub only_in_left: Vec<DiffEntry>,
    pub only_in_right: Vec<DiffEntry>,
}

impl DiffBuckets {
    pub fn get(&self, kind: BucketKind) -> &[DiffEntry] {
        match kind {
            BucketKind::NoChange => &self.no_change,
            BucketKind::Changed => &self.changed,
            BucketKind::OnlyInLeft => &self.only_in_left,
            BucketKind::OnlyInRight => &self.only_in_right,
        }
    }

    fn get_mut(&mut self, kind: BucketKind) -> &mut Vec<DiffEntry> {
        match kind {
            BucketKind::NoChange => &mut self.no_change,
            BucketKind::Changed => &mut self.changed,
            BucketKind::OnlyInLeft => &mut self.only_in_left,
            BucketKind::OnlyInRight => &mut self.only_in_right,
        }
    }
}

/// Values carried by a diff entry, depending on its bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntryValues {
    Changed { left_value: Value, right_value: Value },
    Single { value: Value },
}

/// One frequent value (or change) and how often it occurs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    #[serde(flatten)]
    pub values: EntryValues,
    #[serde(with = "counter")]
    pub nb: BigUint,
    /// One id per sample table, aligned with the sample table list
    pub sample_ids: Vec<SampleId>,
}

impl DiffEntry {
    pub fn single(value: Value, nb: u64) -> Self {
        Self {
            values: EntryValues::Single { value },
            nb: BigUint::from(nb),
            sample_ids: Vec::new(),
        }
    }

    pub fn changed(left_value: Value, right_value: Value, nb: u64) -> Self {
        Self {
            values: EntryValues::Changed {
                left_value,
                right_value,
            },
            nb: BigUint::from(nb),
            sample_ids: Vec::new(),
        }
    }

    pub fn with_sample_ids(mut self, sample_ids: Vec<SampleId>) -> Self {
        self.sample_ids = sample_ids;
        self
    }

    pub fn has_sample(&self) -> bool {
        self.sample_ids.iter().any(Option::is_some)
    }
}

/// Serde adapter for unbounded counters: accepts integers, integral floats
/// and decimal strings; writes a number when it fits in u64.
pub mod counter {
    use num_bigint::BigUint;
    use num_traits::ToPrimitive;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        super::parse_counter(&value).map_err(D::Error::custom)
    }

    pub fn serialize<S>(value: &BigUint, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value.to_u64() {
            Some(n) => serializer.serialize_u64(n),
            None => serializer.serialize_str(&value.to_string()),
        }
    }
}

/// Parse an unbounded unsigned counter from a JSON value
pub fn parse_counter(value: &Value) -> std::result::Result<BigUint, String> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(BigUint::from(u))
            } else if let Some(f) = n.as_f64() {
                if f >= 0.0 && f.fract() == 0.0 {
                    BigUint::from_f64(f).ok_or_else(|| format!("invalid counter: {}", n))
                } else {
                    Err(format!("counter must be a non-negative integer, got {}", n))
                }
            } else {
                Err(format!("invalid counter: {}", n))
            }
        }
        Value::String(s) => BigUint::from_str(s.trim())
            .map_err(|_| format!("counter must be a non-negative integer, got \"{}\"", s)),
        other => Err(format!("counter must be a number, got {}", other)),
    }
}

/// Decode the single row of the `diff_report` table
pub fn decode_report_metadata(
    rows: &[Row],
) -> Result<(String, DateTime<Utc>, SchemaDiffSummary)> {
    let row = match rows {
        [row] => row,
        [] => {
            return Err(ViewerError::decode(
                "expected exactly one row in diff_report, got 0",
            ))
        }
        [row, ..] => {
            log::warn!(
                "diff_report contains {} rows, using the first one",
                rows.len()
            );
            row
        }
    };

    let report_title = match row.get("report_title") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let creation_timestamp = match row.get("creation_timestamp") {
        Some(Value::String(s)) => parse_timestamp(s)?,
        other => {
            return Err(ViewerError::decode(format!(
                "creation_timestamp must be a timestamp string, got {:?}",
                other
            )))
        }
    };

    let summary_payload = payload(row, "diff_summary", "diff_report")?;
    let diff_summary: SchemaDiffSummary = serde_json::from_value(summary_payload)
        .map_err(|e| ViewerError::decode(format!("malformed diff_summary: {}", e)))?;
    diff_summary.validate()?;

    Ok((report_title, creation_timestamp, diff_summary))
}

/// Decode one row of the `diff_per_col` table
pub fn decode_column_diff(row: &Row) -> Result<ColumnDiff> {
    let column_name = match row.get("column_name") {
        Some(Value::String(s)) => s.clone(),
        other => {
            return Err(ViewerError::decode(format!(
                "column_name must be a string, got {:?}",
                other
            )))
        }
    };

    let column_number = match row.get("column_number") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        ViewerError::decode(format!(
            "column '{}' has an invalid column_number",
            column_name
        ))
    })?;

    let counts: DiffCounts = serde_json::from_value(payload(row, "counts", &column_name)?)
        .map_err(|e| {
            ViewerError::decode(format!("malformed counts for column '{}': {}", column_name, e))
        })?;

    if !counts.is_consistent() {
        return Err(ViewerError::decode(format!(
            "counts of column '{}' do not add up: total={} no_change={} changed={} only_in_left={} only_in_right={}",
            column_name,
            counts.total,
            counts.no_change,
            counts.changed,
            counts.only_in_left,
            counts.only_in_right
        )));
    }

    let diff = decode_buckets(&payload(row, "diff", &column_name)?, &column_name)?;

    Ok(ColumnDiff {
        column_number,
        column_name,
        counts,
        diff,
    })
}

/// A JSON payload column, either JSON text or an already structured value
fn payload(row: &Row, field: &str, context: &str) -> Result<Value> {
    match row.get(field) {
        Some(Value::String(text)) => serde_json::from_str(text).map_err(|e| {
            ViewerError::decode(format!("malformed JSON in {} of '{}': {}", field, context, e))
        }),
        Some(value @ (Value::Object(_) | Value::Array(_))) => Ok(value.clone()),
        other => Err(ViewerError::decode(format!(
            "missing {} payload for '{}' (got {:?})",
            field, context, other
        ))),
    }
}

fn decode_buckets(value: &Value, column_name: &str) -> Result<DiffBuckets> {
    let object = value.as_object().ok_or_else(|| {
        ViewerError::decode(format!("diff of column '{}' must be an object", column_name))
    })?;

    let mut buckets = DiffBuckets::default();
    for kind in BucketKind::ALL {
        let entries = match object.get(kind.as_str()) {
            Some(Value::Array(entries)) => entries,
            Some(Value::Null) | None => continue,
            Some(other) => {
                return Err(ViewerError::decode(format!(
                    "diff.{} of column '{}' must be an array, got {}",
                    kind, column_name, other
                )))
            }
        };

        let decoded = buckets.get_mut(kind);
        for entry in entries {
            decoded.push(decode_entry(entry, kind, column_name)?);
        }
    }

    Ok(buckets)
}

fn decode_entry(value: &Value, kind: BucketKind, column_name: &str) -> Result<DiffEntry> {
    let object = value.as_object().ok_or_else(|| {
        ViewerError::decode(format!(
            "diff.{} entry of column '{}' must be an object",
            kind, column_name
        ))
    })?;

    let field = |name: &str| object.get(name).cloned().unwrap_or(Value::Null);

    let values = match kind {
        BucketKind::Changed => EntryValues::Changed {
            left_value: field("left_value"),
            right_value: field("right_value"),
        },
        _ => EntryValues::Single {
            value: field("value"),
        },
    };

    let nb = object
        .get("nb")
        .ok_or_else(|| {
            ViewerError::decode(format!(
                "diff.{} entry of column '{}' has no nb",
                kind, column_name
            ))
        })
        .and_then(|nb| {
            parse_counter(nb).map_err(|e| {
                ViewerError::decode(format!(
                    "diff.{} entry of column '{}': {}",
                    kind, column_name, e
                ))
            })
        })?;

    if nb.is_zero() {
        log::warn!(
            "diff.{} entry of column '{}' has nb = 0",
            kind,
            column_name
        );
    }

    let sample_ids = match object.get("sample_ids") {
        Some(Value::Array(ids)) => ids.iter().map(decode_sample_id).collect(),
        _ => Vec::new(),
    };

    Ok(DiffEntry {
        values,
        nb,
        sample_ids,
    })
}

fn decode_sample_id(value: &Value) -> SampleId {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse the report creation timestamp
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();

    // "2024-01-01 15:00:00" or with fractional seconds, as DuckDB prints TIMESTAMP
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive_dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&naive_dt));
        }
    }

    // ISO 8601 with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    // DuckDB TIMESTAMPTZ text, e.g. "2024-01-01 15:00:00+00"
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(naive_dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive_dt));
        }
    }

    Err(ViewerError::decode(format!(
        "invalid creation_timestamp: '{}'",
        text
    )))
}
