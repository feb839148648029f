//! Output formatting utilities

use crate::aggregate::{ColumnSummary, DataDiffTable, RankedBucket};
use crate::char_diff::{char_diff, CharDiff, Segment, SegmentKind};
use crate::error::Result;
use crate::interaction::ViewState;
use crate::report::{BucketKind, DiffReport, EntryValues};
use crate::sample::{SampleCell, SampleRow};
use serde_json::json;

/// Width of the per-column bar, in characters
const BAR_WIDTH: usize = 40;

/// Pretty printer for the terminal
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Title, schema and data status of the report
    pub fn render_header(report: &DiffReport, view: &ViewState) -> String {
        let summary = &report.diff_summary;
        let mut out = String::new();

        out.push_str(&format!("📊 {}\n", report.report_title));
        out.push_str(&format!(
            "├─ Created: {}\n",
            report.creation_timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if let Some(ref generated_with) = summary.generated_with {
            out.push_str(&format!("├─ Generated with: {}\n", generated_with));
        }
        out.push_str(&format!(
            "├─ Compared: {} → {} (join: {})\n",
            summary.left_df_alias,
            summary.right_df_alias,
            summary.join_cols.join(", ")
        ));

        if summary.same_schema {
            out.push_str("├─ ✅ SCHEMA: OK\n");
        } else {
            out.push_str("├─ ❌ SCHEMA: CHANGES DETECTED\n");
        }
        if view.show_schema {
            for line in summary.schema_diff_str.lines() {
                out.push_str(&format!("│    {}\n", line));
            }
        }

        if summary.same_data {
            out.push_str(&format!("└─ ✅ DATA: OK ({})\n", summary.total_nb_rows));
        } else {
            out.push_str("└─ ❌ DATA: CHANGES DETECTED\n");
        }

        out
    }

    /// All visible columns with their bars and, when expanded, details
    pub fn render_data_diff_table(table: &DataDiffTable, report: &DiffReport, view: &ViewState) -> String {
        let columns = match table {
            DataDiffTable::Empty => return "🟠 Both DataFrames are empty\n".to_string(),
            DataDiffTable::Columns(columns) => columns,
        };

        let name_width = columns
            .iter()
            .map(|c| c.column_name.chars().count())
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        for column in columns {
            if !view.column_row_visible(column.no_change) {
                continue;
            }
            out.push_str(&Self::render_column_row(column, name_width));
            if view.details_visible(&column.column_name, column.no_change) {
                out.push_str(&Self::render_column_details(column, report));
            }
        }
        out
    }

    pub fn render_column_row(column: &ColumnSummary, name_width: usize) -> String {
        let join_flag = if column.is_join_col { "🔑" } else { "  " };
        format!(
            "{}{} {:<width$} {}\n",
            join_flag,
            column.marker,
            column.column_name,
            text_bar(&column.buckets),
            width = name_width
        )
    }

    /// The ranked entries of every non-empty bucket
    pub fn render_column_details(column: &ColumnSummary, report: &DiffReport) -> String {
        let summary = &report.diff_summary;
        let mut out = String::new();

        for bucket in column.buckets.iter().filter(|b| b.shows_details()) {
            out.push_str(&format!(
                "    {}: {} {} ({}%)\n",
                bucket.top_title, bucket.name, bucket.count, bucket.pct
            ));

            for ranked in &bucket.diff {
                let value = match &ranked.entry.values {
                    EntryValues::Changed {
                        left_value,
                        right_value,
                    } => {
                        let diff = char_diff(left_value, right_value);
                        format!(
                            "{}: {} ➔ {}: {}",
                            summary.left_df_alias,
                            render_left(&diff),
                            summary.right_df_alias,
                            render_right(&diff)
                        )
                    }
                    EntryValues::Single { value } => crate::char_diff::format_value(value),
                };
                out.push_str(&format!(
                    "      [{}] {}  ×{} ({}%)\n",
                    ranked.index, value, ranked.entry.nb, ranked.pct
                ));
            }
        }

        out
    }

    /// Sample row, one line per column
    pub fn render_sample_row(row: &SampleRow, report: &DiffReport) -> String {
        let summary = &report.diff_summary;
        let mut out = String::from("🔵 Example of row where the selected value appears\n");
        out.push_str(&format!(
            "   Column name | {} | {}\n",
            summary.left_df_alias, summary.right_df_alias
        ));

        for column in &row.columns {
            let marker = if column.selected { "▶" } else { " " };
            let line = match &column.cell {
                SampleCell::Present { diff, .. } => {
                    format!("{} | {}", render_left(diff), render_right(diff))
                }
                SampleCell::Missing => "(missing)".to_string(),
            };
            out.push_str(&format!("{}  {} | {}\n", marker, column.column_name, line));
        }

        out
    }

    pub fn print_report(report: &DiffReport, table: &DataDiffTable, view: &ViewState) {
        print!("{}", Self::render_header(report, view));
        println!();
        print!("{}", Self::render_data_diff_table(table, report, view));
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    pub fn format_report(report: &DiffReport, table: &DataDiffTable) -> Result<String> {
        Self::format(&json!({
            "report_title": report.report_title,
            "creation_timestamp": report.creation_timestamp,
            "diff_summary": report.diff_summary,
            "data_diff": table,
        }))
    }
}

/// Left side of a diff: unchanged text and `[-removed-]` text
pub fn render_left(diff: &CharDiff) -> String {
    match diff.left_display() {
        Some(segments) => render_segments(segments),
        None => "NULL".to_string(),
    }
}

/// Right side of a diff: unchanged text and `{+added+}` text
pub fn render_right(diff: &CharDiff) -> String {
    match diff.right_display() {
        Some(segments) => render_segments(segments),
        None => "NULL".to_string(),
    }
}

fn render_segments(segments: Vec<&Segment>) -> String {
    segments
        .into_iter()
        .map(|segment| match segment.kind {
            SegmentKind::Unchanged => segment.value.clone(),
            SegmentKind::Removed => format!("[-{}-]", segment.value),
            SegmentKind::Added => format!("{{+{}+}}", segment.value),
        })
        .collect()
}

fn bar_char(kind: BucketKind) -> char {
    match kind {
        BucketKind::NoChange => '=',
        BucketKind::Changed => '~',
        BucketKind::OnlyInLeft => '<',
        BucketKind::OnlyInRight => '>',
    }
}

/// Proportional text bar of the four buckets
fn text_bar(buckets: &[RankedBucket]) -> String {
    let total_width: f64 = buckets.iter().map(RankedBucket::bar_width).sum();
    if total_width <= 0.0 {
        return format!("[{}]", " ".repeat(BAR_WIDTH));
    }

    let mut bar = String::with_capacity(BAR_WIDTH + 2);
    bar.push('[');
    let mut used = 0;
    for (i, bucket) in buckets.iter().enumerate() {
        let width = if i + 1 == buckets.len() {
            BAR_WIDTH - used
        } else {
            let share = bucket.bar_width() / total_width * BAR_WIDTH as f64;
            (share.round() as usize).min(BAR_WIDTH - used)
        };
        let width = if bucket.bar_width() > 0.0 { width } else { 0 };
        bar.extend(std::iter::repeat(bar_char(bucket.kind)).take(width));
        used += width;
    }
    bar.extend(std::iter::repeat(' ').take(BAR_WIDTH - used));
    bar.push(']');
    bar
}
