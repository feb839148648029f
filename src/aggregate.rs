//! Per-column aggregation of the diff into ranked buckets

use crate::report::{BucketKind, ColumnDiff, DiffEntry, DiffReport, SchemaDiffSummary};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Serialize, Serializer};
use std::fmt;

/// Minimum width (in percent) of a non-empty bar
pub const MIN_BAR_WIDTH: f64 = 2.5;

/// A percentage with exactly two decimals, stored in hundredths of a percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Percentage {
    hundredths: u64,
}

impl Percentage {
    /// `part / total * 100`, rounded half-up at the second decimal.
    /// A zero total yields 0.00.
    pub fn of(part: &BigUint, total: &BigUint) -> Self {
        if total.is_zero() {
            return Self::default();
        }

        // round(part * 10000 / total) == (2 * part * 10000 + total) / (2 * total)
        let numerator = part * 20_000u32 + total;
        let denominator = total * 2u32;
        let hundredths = (numerator / denominator).to_u64().unwrap_or(u64::MAX);

        Self { hundredths }
    }

    pub fn from_hundredths(hundredths: u64) -> Self {
        Self { hundredths }
    }

    pub fn hundredths(&self) -> u64 {
        self.hundredths
    }

    pub fn as_f64(&self) -> f64 {
        self.hundredths as f64 / 100.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.hundredths / 100, self.hundredths % 100)
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketColor {
    Green,
    Red,
    Blue,
    Purple,
}

impl BucketColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketColor::Green => "green",
            BucketColor::Red => "red",
            BucketColor::Blue => "blue",
            BucketColor::Purple => "purple",
        }
    }
}

/// A diff entry with its rank inside the bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    /// Position of the entry in the bucket as stored in the report
    pub index: usize,
    pub pct: Percentage,
    #[serde(flatten)]
    pub entry: DiffEntry,
}

impl RankedEntry {
    pub fn bar_width(&self) -> f64 {
        self.pct.as_f64().max(MIN_BAR_WIDTH)
    }
}

/// One of the four buckets of a column, ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedBucket {
    #[serde(rename = "type")]
    pub kind: BucketKind,
    pub name: String,
    pub desc: String,
    #[serde(with = "crate::report::counter")]
    pub count: BigUint,
    pub pct: Percentage,
    pub top_title: String,
    pub color: BucketColor,
    /// Sorted by `nb` descending, ties keep report order
    pub diff: Vec<RankedEntry>,
}

impl RankedBucket {
    /// Empty buckets still count in the summary but have no detail table
    pub fn shows_details(&self) -> bool {
        !self.count.is_zero()
    }

    pub fn bar_width(&self) -> f64 {
        if self.count.is_zero() {
            0.0
        } else {
            self.pct.as_f64().max(MIN_BAR_WIDTH)
        }
    }

    pub fn tooltip_line(&self) -> String {
        format!("{}: {} ({} %)", self.name, self.count, self.pct)
    }
}

/// Display data of one column row and its detail table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column_number: u64,
    pub column_name: String,
    /// " ", "-" or "+" from `column_names_diff`
    pub marker: String,
    pub is_join_col: bool,
    /// Every value unchanged, eligible for hiding
    pub no_change: bool,
    pub buckets: Vec<RankedBucket>,
}

impl ColumnSummary {
    pub fn bucket(&self, kind: BucketKind) -> Option<&RankedBucket> {
        self.buckets.iter().find(|b| b.kind == kind)
    }

    pub fn tooltip(&self) -> String {
        self.buckets
            .iter()
            .map(RankedBucket::tooltip_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content of the data-diff table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "columns", rename_all = "snake_case")]
pub enum DataDiffTable {
    /// Both datasets are empty
    Empty,
    Columns(Vec<ColumnSummary>),
}

/// Aggregate every column of the report, in display order
pub fn build_data_diff_table(report: &DiffReport) -> DataDiffTable {
    if report.is_empty() {
        return DataDiffTable::Empty;
    }

    DataDiffTable::Columns(
        report
            .diff_per_col
            .iter()
            .map(|col| aggregate_column(col, &report.diff_summary))
            .collect(),
    )
}

/// Build the four ranked buckets of a column
pub fn aggregate_column(col: &ColumnDiff, summary: &SchemaDiffSummary) -> ColumnSummary {
    ColumnSummary {
        column_number: col.column_number,
        column_name: col.column_name.clone(),
        marker: summary.column_marker(&col.column_name).to_string(),
        is_join_col: summary.is_join_col(&col.column_name),
        no_change: col.no_change(),
        buckets: BucketKind::ALL
            .into_iter()
            .map(|kind| rank_bucket(col, kind, summary))
            .collect(),
    }
}

pub fn rank_bucket(col: &ColumnDiff, kind: BucketKind, summary: &SchemaDiffSummary) -> RankedBucket {
    let (name, desc, top_title, color) = bucket_labels(kind, summary);
    let count = col.counts.get(kind).clone();
    let pct = Percentage::of(&count, &col.counts.total);

    RankedBucket {
        kind,
        name,
        desc,
        count,
        pct,
        top_title,
        color,
        diff: rank_entries(col.diff.get(kind), &col.counts.total),
    }
}

/// Sort entries by `nb` descending. `sort_by` is stable, so entries with the
/// same `nb` keep their report order.
pub fn rank_entries(entries: &[DiffEntry], total: &BigUint) -> Vec<RankedEntry> {
    let mut ranked: Vec<RankedEntry> = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| RankedEntry {
            index,
            pct: Percentage::of(&entry.nb, total),
            entry: entry.clone(),
        })
        .collect();

    ranked.sort_by(|a, b| b.entry.nb.cmp(&a.entry.nb));
    ranked
}

fn bucket_labels(kind: BucketKind, summary: &SchemaDiffSummary) -> (String, String, String, BucketColor) {
    match kind {
        BucketKind::NoChange => (
            "Not changed".to_string(),
            "Number of values that did not change".to_string(),
            "Most frequent identical values".to_string(),
            BucketColor::Green,
        ),
        BucketKind::Changed => (
            "Changed".to_string(),
            "Number of values that changed".to_string(),
            "Most frequent changes".to_string(),
            BucketColor::Red,
        ),
        BucketKind::OnlyInLeft => (
            format!("Only in {}", summary.left_df_alias),
            format!("Number of values only in {}", summary.left_df_alias),
            format!("Most frequent values in {}", summary.left_df_alias),
            BucketColor::Blue,
        ),
        BucketKind::OnlyInRight => (
            format!("Only in {}", summary.right_df_alias),
            format!("Number of values only in {}", summary.right_df_alias),
            format!("Most frequent values in {}", summary.right_df_alias),
            BucketColor::Purple,
        ),
    }
}
