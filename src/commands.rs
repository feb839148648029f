//! Command implementations for the data-diff-viewer CLI

use crate::aggregate::{aggregate_column, DataDiffTable};
use crate::cli::{Cli, Commands, OutputFormat};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::interaction::{EntryRef, Intent, SamplePanel};
use crate::loader::ReportLoader;
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::package::write_report_database;
use crate::progress::LoadProgress;
use crate::report::{BucketKind, DiffReport, SchemaDiffSummary};
use crate::session::{LoadState, ReportSession};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Settings shared by every command that reads a report
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    pub sample_prefix: Option<String>,
    pub memory_limit: Option<String>,
    pub threads: Option<usize>,
}

impl StoreOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            sample_prefix: cli.sample_prefix.clone(),
            memory_limit: cli.memory_limit.clone(),
            threads: cli.threads,
        }
    }

    /// Environment defaults first, command-line flags on top
    pub fn to_config(&self, db: &Path) -> ViewerConfig {
        let mut config = ViewerConfig::new(db);
        if let Some(ref prefix) = self.sample_prefix {
            config = config.with_sample_table_prefix(prefix.clone());
        }
        if let Some(ref limit) = self.memory_limit {
            config = config.with_memory_limit(limit.clone());
        }
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        config
    }
}

/// Execute a command
pub async fn execute_command(cli: Cli) -> Result<()> {
    let options = StoreOptions::from_cli(&cli);

    match cli.command {
        Commands::Summary {
            db,
            hide_unchanged,
            expand_all,
            format,
        } => summary_command(&options, &db, hide_unchanged, expand_all, &format).await,
        Commands::Column { db, name, format } => column_command(&options, &db, &name, &format).await,
        Commands::Sample {
            db,
            column,
            bucket,
            index,
            format,
        } => sample_command(&options, &db, &column, bucket, index, &format).await,
        Commands::Package {
            db,
            title,
            summary,
            diff_per_col,
        } => package_command(db, title, summary, diff_per_col).await,
    }
}

/// Open a session and wait for the report, or fail with the load error
async fn open_session(options: &StoreOptions, db: &Path, output_format: OutputFormat) -> Result<ReportSession> {
    let config = options.to_config(db);
    config.validate()?;

    let mut progress = match output_format {
        OutputFormat::Pretty => LoadProgress::new("Loading report..."),
        OutputFormat::Json => LoadProgress::new_minimal(),
    };

    let session = ReportSession::open(Arc::new(ReportLoader::new(config))).await;
    progress.clear();

    match session.load_state() {
        LoadState::Loaded(_) => Ok(session),
        LoadState::Failed(message) => Err(ViewerError::load(message)),
        LoadState::Loading => Err(ViewerError::load("Report load did not complete")),
    }
}

fn loaded_report(session: &ReportSession) -> Result<Arc<DiffReport>> {
    session
        .report()
        .ok_or_else(|| ViewerError::load("Report is not loaded"))
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    OutputFormat::parse(format).map_err(|e| ViewerError::invalid_input(e))
}

/// Show the report header and the per-column summary
async fn summary_command(
    options: &StoreOptions,
    db: &Path,
    hide_unchanged: bool,
    expand_all: bool,
    format: &str,
) -> Result<()> {
    let output_format = parse_format(format)?;
    let session = open_session(options, db, output_format).await?;
    let report = loaded_report(&session)?;

    if hide_unchanged {
        session.dispatch(Intent::ToggleHideUnchangedColumns);
    }
    if expand_all {
        session.dispatch(Intent::ToggleExpandAllDetails);
    }

    let table = session.data_diff_table().unwrap_or(DataDiffTable::Empty);

    match output_format {
        OutputFormat::Pretty => PrettyPrinter::print_report(&report, &table, &session.view()),
        OutputFormat::Json => println!("{}", JsonFormatter::format_report(&report, &table)?),
    }

    Ok(())
}

/// Show the ranked values of one column
async fn column_command(options: &StoreOptions, db: &Path, name: &str, format: &str) -> Result<()> {
    let output_format = parse_format(format)?;
    let session = open_session(options, db, output_format).await?;
    let report = loaded_report(&session)?;

    let column = report
        .column(name)
        .ok_or_else(|| ViewerError::column_not_found(name))?;
    let summary = aggregate_column(column, &report.diff_summary);

    match output_format {
        OutputFormat::Pretty => {
            print!("{}", PrettyPrinter::render_column_row(&summary, name.chars().count()));
            print!("{}", PrettyPrinter::render_column_details(&summary, &report));
            println!("{}", summary.tooltip());
        }
        OutputFormat::Json => println!("{}", JsonFormatter::format(&summary)?),
    }

    Ok(())
}

/// Show the sample row of one diff entry
async fn sample_command(
    options: &StoreOptions,
    db: &Path,
    column: &str,
    bucket: BucketKind,
    index: usize,
    format: &str,
) -> Result<()> {
    let output_format = parse_format(format)?;
    let session = open_session(options, db, output_format).await?;
    let report = loaded_report(&session)?;

    if !session.view().drilldown_enabled {
        println!("ℹ️  This report has no sample tables");
        return Ok(());
    }

    let mut progress = match output_format {
        OutputFormat::Pretty => LoadProgress::new("Fetching sample row..."),
        OutputFormat::Json => LoadProgress::new_minimal(),
    };
    session.select_entry(EntryRef::new(column, bucket, index)).await?;
    progress.clear();

    match (session.view().sample, output_format) {
        (SamplePanel::Loaded(row), OutputFormat::Pretty) => {
            print!("{}", PrettyPrinter::render_sample_row(&row, &report));
        }
        (SamplePanel::Loaded(row), OutputFormat::Json) => {
            println!("{}", JsonFormatter::format(&row)?);
        }
        (_, OutputFormat::Pretty) => println!("ℹ️  No sample row found for this value"),
        (_, OutputFormat::Json) => println!("null"),
    }

    Ok(())
}

/// Package a computed diff into a report database
async fn package_command(db: PathBuf, title: String, summary: PathBuf, diff_per_col: PathBuf) -> Result<()> {
    let summary_text = std::fs::read_to_string(&summary)?;
    let summary: SchemaDiffSummary = serde_json::from_str(&summary_text)?;

    let mut progress = LoadProgress::new("Writing report database...");
    let packaged = tokio::task::spawn_blocking(move || {
        write_report_database(&db, &title, &summary, &diff_per_col)
    })
    .await??;
    progress.finish("Done");

    println!(
        "✅ Report written to {} ({} columns)",
        packaged.db_path.display(),
        packaged.column_count
    );

    Ok(())
}
