//! The live resource table synchronization engine behind the Kestrel
//! dashboard.
//!
//! A [`TableData`] holds the rows of one resource view. Each refresh cycle
//! hands a freshly fetched snapshot to [`TableData::render`] (or rows to
//! [`TableData::update`]); the table reconciles it against what is already
//! displayed, classifying every row as added, updated or unchanged and
//! dropping rows the snapshot no longer reports. Filtering, label projection
//! and cloning produce independent tables, so the canonical one is the only
//! instance ever contended.

mod error;
mod filter;
mod header;
mod render;
mod row;
mod row_events;
mod sort;
mod table_data;
mod view_setting;

pub use self::{
    error::Error,
    filter::{FilterError, FilterOpts, FilterQuery},
    header::{ColumnRole, Header, HeaderColumn},
    render::{
        GenericRenderer, GenericTable, RawObject, RenderError, Renderer, TableColumnDefinition,
        TableRow,
    },
    row::{DeltaRow, EventKind, Row, RowEvent},
    row_events::{DeleteOutcome, RowEvents},
    sort::SortColumn,
    table_data::{DeltaPolicy, Filtered, ReconcileReport, TableData},
    view_setting::ViewSetting,
};
