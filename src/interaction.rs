//! Interaction state of the report view
//!
//! The state is a plain value: every user intent goes through
//! [`ViewState::apply`], which returns the next state and the side effect the
//! caller has to run. Selection changes bump a generation counter and sample
//! fetches carry a [`FetchTicket`] of that generation, so a fetch result that
//! arrives after a newer selection is dropped.

use crate::report::{BucketKind, SampleId};
use crate::sample::SampleRow;
use std::collections::BTreeSet;

/// Identity of a diff entry: column, bucket and position in the report
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryRef {
    pub column_name: String,
    pub bucket: BucketKind,
    pub index: usize,
}

impl EntryRef {
    pub fn new(column_name: impl Into<String>, bucket: BucketKind, index: usize) -> Self {
        Self {
            column_name: column_name.into(),
            bucket,
            index,
        }
    }
}

/// Generation of the selection a sample fetch was started for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// What the sample panel currently shows
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SamplePanel {
    #[default]
    Hidden,
    Loading(FetchTicket),
    Loaded(SampleRow),
    /// The fetch finished without data, no panel is shown
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    ToggleHideUnchangedColumns,
    ToggleExpandAllDetails,
    ToggleShowSchema,
    ToggleColumnDetails(String),
    /// Click on a diff entry: selects it, or deselects it when already selected
    Select {
        entry: EntryRef,
        sample_ids: Vec<SampleId>,
    },
    SampleLoaded {
        ticket: FetchTicket,
        row: Option<SampleRow>,
    },
    SampleFailed {
        ticket: FetchTicket,
        message: String,
    },
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    FetchSample {
        ticket: FetchTicket,
        column_name: String,
        sample_ids: Vec<SampleId>,
    },
    /// The fetch of this ticket is no longer wanted
    CancelFetch(FetchTicket),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub hide_unchanged_columns: bool,
    pub all_details_expanded: bool,
    pub show_schema: bool,
    pub expanded_columns: BTreeSet<String>,
    pub selected: Option<EntryRef>,
    pub sample: SamplePanel,
    /// False when the report has no sample tables
    pub drilldown_enabled: bool,
    generation: u64,
}

impl ViewState {
    /// Initial state: the schema panel starts open only when schemas differ
    pub fn new(same_schema: bool, drilldown_enabled: bool) -> Self {
        Self {
            show_schema: !same_schema,
            drilldown_enabled,
            ..Self::default()
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.0 == self.generation && self.selected.is_some()
    }

    pub fn apply(mut self, intent: Intent) -> (Self, Effect) {
        match intent {
            Intent::ToggleHideUnchangedColumns => {
                self.hide_unchanged_columns = !self.hide_unchanged_columns;
                (self, Effect::None)
            }
            Intent::ToggleExpandAllDetails => {
                self.all_details_expanded = !self.all_details_expanded;
                (self, Effect::None)
            }
            Intent::ToggleShowSchema => {
                self.show_schema = !self.show_schema;
                (self, Effect::None)
            }
            Intent::ToggleColumnDetails(column_name) => {
                if !self.expanded_columns.remove(&column_name) {
                    self.expanded_columns.insert(column_name);
                }
                (self, Effect::None)
            }
            Intent::Select { entry, sample_ids } => self.select(entry, sample_ids),
            Intent::SampleLoaded { ticket, row } => {
                if !self.is_current(ticket) {
                    log::warn!(
                        "Dropping stale sample result (generation {}, current {})",
                        ticket.0,
                        self.generation
                    );
                    return (self, Effect::None);
                }
                self.sample = match row {
                    Some(row) => SamplePanel::Loaded(row),
                    None => SamplePanel::Empty,
                };
                (self, Effect::None)
            }
            Intent::SampleFailed { ticket, message } => {
                if self.is_current(ticket) {
                    log::warn!("Sample fetch failed: {}", message);
                    self.sample = SamplePanel::Empty;
                }
                (self, Effect::None)
            }
        }
    }

    fn select(mut self, entry: EntryRef, sample_ids: Vec<SampleId>) -> (Self, Effect) {
        if !self.drilldown_enabled {
            return (self, Effect::None);
        }

        let previous = match &self.sample {
            SamplePanel::Loading(ticket) => Some(*ticket),
            _ => None,
        };

        self.generation += 1;

        if self.selected.as_ref() == Some(&entry) {
            self.selected = None;
            self.sample = SamplePanel::Hidden;
            let effect = previous.map_or(Effect::None, Effect::CancelFetch);
            return (self, effect);
        }

        let ticket = FetchTicket(self.generation);
        let column_name = entry.column_name.clone();
        self.selected = Some(entry);
        self.sample = SamplePanel::Loading(ticket);

        (
            self,
            Effect::FetchSample {
                ticket,
                column_name,
                sample_ids,
            },
        )
    }

    /// A column summary row is hidden only by the "hide unchanged" filter
    pub fn column_row_visible(&self, no_change: bool) -> bool {
        !(self.hide_unchanged_columns && no_change)
    }

    pub fn details_visible(&self, column_name: &str, no_change: bool) -> bool {
        let expanded = self.all_details_expanded || self.expanded_columns.contains(column_name);
        expanded && self.column_row_visible(no_change)
    }

    pub fn is_selected(&self, entry: &EntryRef) -> bool {
        self.selected.as_ref() == Some(entry)
    }

    pub fn sample_row(&self) -> Option<&SampleRow> {
        match &self.sample {
            SamplePanel::Loaded(row) => Some(row),
            _ => None,
        }
    }
}
