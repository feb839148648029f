//! Report session: load state, view state and sample drill-down

use crate::aggregate::{build_data_diff_table, DataDiffTable};
use crate::error::{Result, ViewerError};
use crate::interaction::{Effect, EntryRef, Intent, ViewState};
use crate::loader::ReportLoader;
use crate::report::DiffReport;
use crate::sample::SampleRow;
use std::sync::{Arc, Mutex, MutexGuard};

/// Progress of the initial report load
#[derive(Debug, Clone)]
pub enum LoadState {
    Loading,
    /// Persistent until an explicit retry
    Failed(String),
    Loaded(Arc<DiffReport>),
}

impl LoadState {
    pub fn report(&self) -> Option<&Arc<DiffReport>> {
        match self {
            LoadState::Loaded(report) => Some(report),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LoadState::Failed(_))
    }
}

/// One viewer of one report.
///
/// Locks are never held across an await: a selection is an atomic state
/// transition, and the fetch result is applied in a second transition that
/// drops it if the selection moved on.
pub struct ReportSession {
    loader: Arc<ReportLoader>,
    load_state: Mutex<LoadState>,
    view: Mutex<ViewState>,
}

impl ReportSession {
    pub fn new(loader: Arc<ReportLoader>) -> Self {
        Self {
            loader,
            load_state: Mutex::new(LoadState::Loading),
            view: Mutex::new(ViewState::default()),
        }
    }

    /// Create a session and run the initial load
    pub async fn open(loader: Arc<ReportLoader>) -> Self {
        let session = Self::new(loader);
        session.load().await;
        session
    }

    pub fn loader(&self) -> &Arc<ReportLoader> {
        &self.loader
    }

    /// Load the report and the sample catalog
    pub async fn load(&self) -> LoadState {
        let state = match self.loader.load_report().await {
            Ok(report) => {
                let drilldown_enabled = match self.loader.sample_table_names().await {
                    Ok(tables) => !tables.is_empty(),
                    Err(e) => {
                        log::warn!("Sample rows disabled: {}", e);
                        false
                    }
                };
                *lock(&self.view) = ViewState::new(report.diff_summary.same_schema, drilldown_enabled);
                LoadState::Loaded(report)
            }
            Err(e) => {
                log::error!("{}", e);
                LoadState::Failed(e.to_string())
            }
        };

        *lock(&self.load_state) = state.clone();
        state
    }

    /// Explicit retry after a failed load
    pub async fn retry(&self) -> LoadState {
        self.loader.invalidate();
        *lock(&self.load_state) = LoadState::Loading;
        self.load().await
    }

    pub fn load_state(&self) -> LoadState {
        lock(&self.load_state).clone()
    }

    pub fn report(&self) -> Option<Arc<DiffReport>> {
        self.load_state().report().cloned()
    }

    /// Snapshot of the current view state
    pub fn view(&self) -> ViewState {
        lock(&self.view).clone()
    }

    pub fn sample_row(&self) -> Option<SampleRow> {
        lock(&self.view).sample_row().cloned()
    }

    /// Aggregated data-diff table, `None` while the report is not loaded
    pub fn data_diff_table(&self) -> Option<DataDiffTable> {
        self.report().map(|report| build_data_diff_table(&report))
    }

    /// Apply an intent and return the effect it requested
    pub fn dispatch(&self, intent: Intent) -> Effect {
        let mut view = lock(&self.view);
        let (next, effect) = std::mem::take(&mut *view).apply(intent);
        *view = next;
        effect
    }

    /// Select (or deselect) a diff entry and fetch its sample row
    pub async fn select_entry(&self, entry: EntryRef) -> Result<()> {
        let report = self
            .report()
            .ok_or_else(|| ViewerError::invalid_input("Report is not loaded"))?;

        let sample_ids = report
            .column(&entry.column_name)
            .ok_or_else(|| ViewerError::column_not_found(&entry.column_name))?
            .diff
            .get(entry.bucket)
            .get(entry.index)
            .ok_or_else(|| {
                ViewerError::invalid_input(format!(
                    "No entry {} in bucket {} of column '{}'",
                    entry.index, entry.bucket, entry.column_name
                ))
            })?
            .sample_ids
            .clone();

        let effect = self.dispatch(Intent::Select { entry, sample_ids });

        let (ticket, column_name, sample_ids) = match effect {
            Effect::FetchSample {
                ticket,
                column_name,
                sample_ids,
            } => (ticket, column_name, sample_ids),
            Effect::CancelFetch(ticket) => {
                log::debug!("Deselected entry, fetch {} abandoned", ticket.generation());
                return Ok(());
            }
            Effect::None => return Ok(()),
        };

        let intent = match self.loader.fetch_sample_row(&sample_ids).await {
            Ok(merged) => Intent::SampleLoaded {
                ticket,
                row: SampleRow::project(&merged, &report, Some(&column_name)),
            },
            Err(e) => Intent::SampleFailed {
                ticket,
                message: e.to_string(),
            },
        };
        self.dispatch(intent);

        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
