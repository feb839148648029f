//! Single-flight loading of the store handle, the report and the sample catalog

use crate::cache::LoadCache;
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::report::{decode_column_diff, decode_report_metadata, DiffReport, SampleId};
use crate::sample::SampleRowResolver;
use crate::store::{quote_identifier, AnalyticalStore, DuckDbStore, Row};
use std::cmp::Ordering;
use std::sync::Arc;

/// Table holding the report metadata row
pub const DIFF_REPORT_TABLE: &str = "diff_report";
/// Default table holding one row per column
pub const DIFF_PER_COL_TABLE: &str = "diff_per_col";

/// Opens the store described by a configuration; runs on a blocking thread
pub type StoreOpener =
    Arc<dyn Fn(&ViewerConfig) -> Result<Arc<dyn AnalyticalStore>> + Send + Sync>;

/// Loads everything that must be computed at most once per report.
///
/// Every public operation goes through a [`LoadCache`], so concurrent callers
/// share one store connection, one report query and one catalog query.
pub struct ReportLoader {
    config: ViewerConfig,
    opener: StoreOpener,
    stores: LoadCache<String, Arc<dyn AnalyticalStore>>,
    reports: LoadCache<String, Arc<DiffReport>>,
    sample_tables: LoadCache<String, Arc<Vec<String>>>,
}

impl ReportLoader {
    /// Loader backed by a DuckDB report database
    pub fn new(config: ViewerConfig) -> Self {
        let opener: StoreOpener = Arc::new(|config: &ViewerConfig| {
            let store = DuckDbStore::open(config)?;
            Ok(Arc::new(store) as Arc<dyn AnalyticalStore>)
        });
        Self::with_opener(config, opener)
    }

    pub fn with_opener(config: ViewerConfig, opener: StoreOpener) -> Self {
        Self {
            config,
            opener,
            stores: LoadCache::new(),
            reports: LoadCache::new(),
            sample_tables: LoadCache::new(),
        }
    }

    /// Loader over an already open store
    pub fn with_store(config: ViewerConfig, store: Arc<dyn AnalyticalStore>) -> Self {
        let opener: StoreOpener = Arc::new(move |_: &ViewerConfig| Ok(Arc::clone(&store)));
        Self::with_opener(config, opener)
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// The process-wide store handle
    pub async fn store(&self) -> Result<Arc<dyn AnalyticalStore>> {
        let key = self.config.cache_key();
        self.stores
            .get_or_load(key, || async {
                let opener = Arc::clone(&self.opener);
                let config = self.config.clone();
                tokio::task::spawn_blocking(move || opener(&config))
                    .await?
                    .map_err(|e| match e {
                        ViewerError::Load { .. } | ViewerError::Config { .. } => e,
                        other => ViewerError::load(other.to_string()),
                    })
            })
            .await
    }

    /// The decoded report, loaded once
    pub async fn load_report(&self) -> Result<Arc<DiffReport>> {
        let key = self.config.cache_key();
        self.reports
            .get_or_load(key, || async {
                let store = self.store().await?;
                let report = fetch_report(store.as_ref()).await?;
                log::info!(
                    "Loaded report '{}' with {} columns",
                    report.report_title,
                    report.diff_per_col.len()
                );
                Ok(Arc::new(report))
            })
            .await
    }

    /// Names of the partitioned sample tables in positional order.
    /// Empty when the report has no sample tables.
    pub async fn sample_table_names(&self) -> Result<Arc<Vec<String>>> {
        let key = self.config.cache_key();
        self.sample_tables
            .get_or_load(key, || async {
                let store = self.store().await?;
                let mut names = store
                    .list_tables(&self.config.sample_table_prefix)
                    .await
                    .map_err(|e| ViewerError::load(format!("Failed to list sample tables: {}", e)))?;
                sort_sample_tables(&mut names, &self.config.sample_table_prefix);

                if names.is_empty() {
                    log::info!("No sample tables found, sample rows are unavailable");
                } else {
                    log::debug!("Sample tables: {}", names.join(", "));
                }
                Ok(Arc::new(names))
            })
            .await
    }

    /// Fetch and merge the sample row of a diff entry
    pub async fn fetch_sample_row(&self, sample_ids: &[SampleId]) -> Result<Row> {
        let tables = self.sample_table_names().await?;
        if tables.is_empty() {
            return Ok(Row::new());
        }

        let store = self.store().await?;
        let resolver = SampleRowResolver::new(store, self.config.sample_id_column.clone());
        Ok(resolver.resolve(&tables, sample_ids).await)
    }

    /// Drop every cached load so the next call retries from scratch
    pub fn invalidate(&self) {
        let key = self.config.cache_key();
        self.stores.invalidate(&key);
        self.reports.invalidate(&key);
        self.sample_tables.invalidate(&key);
    }

    /// The report if it is already loaded
    pub fn cached_report(&self) -> Option<Arc<DiffReport>> {
        self.reports.get(&self.config.cache_key())
    }
}

/// Run the two report queries and decode their rows
pub async fn fetch_report(store: &dyn AnalyticalStore) -> Result<DiffReport> {
    let metadata_sql = format!(
        "SELECT report_title, CAST(creation_timestamp AS VARCHAR) AS creation_timestamp, diff_summary FROM {}",
        quote_identifier(DIFF_REPORT_TABLE)
    );
    let metadata_rows = store
        .query(&metadata_sql)
        .await
        .map_err(|e| ViewerError::load(format!("Failed to query {}: {}", DIFF_REPORT_TABLE, e)))?;
    let (report_title, creation_timestamp, diff_summary) = decode_report_metadata(&metadata_rows)?;

    let table = diff_summary
        .diff_per_col_table_name
        .clone()
        .unwrap_or_else(|| DIFF_PER_COL_TABLE.to_string());
    let columns_sql = format!(
        "SELECT column_number, column_name, counts, diff FROM {}",
        quote_identifier(&table)
    );
    let column_rows = store
        .query(&columns_sql)
        .await
        .map_err(|e| ViewerError::load(format!("Failed to query {}: {}", table, e)))?;

    let diff_per_col = column_rows
        .iter()
        .map(decode_column_diff)
        .collect::<Result<Vec<_>>>()?;

    Ok(DiffReport::new(
        report_title,
        creation_timestamp,
        diff_summary,
        diff_per_col,
    ))
}

/// Natural order: numeric suffix first (`sample_2` before `sample_10`), then name
pub fn sort_sample_tables(names: &mut [String], prefix: &str) {
    let suffix_number = |name: &str| -> Option<u64> { name.strip_prefix(prefix)?.parse().ok() };

    names.sort_by(|a, b| match (suffix_number(a), suffix_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    });
}
