//! The table façade: one header and one row store behind a single
//! read/write lock.
//!
//! Writers (`render`, `update`, `delete`, `clear`, `reset`, `set_header`,
//! `sort`, `add_row`, `set_row`) hold the lock exclusively for the whole
//! operation, so readers never observe a half-reconciled store. Derived
//! tables (`filter`, `labelize`, `clone`) are deep copies with their own lock.

use std::{
    collections::{HashMap, HashSet},
    ptr,
};

use kestrel_base::{consts::columns, namespace};
use parking_lot::RwLock;

use crate::{
    error::{self, Error},
    filter::{self, FilterError, FilterOpts, FilterQuery},
    header::{Header, HeaderColumn},
    render::{self, RawObject, Renderer},
    row::{DeltaRow, EventKind, Row, RowEvent},
    row_events::{DeleteOutcome, RowEvents},
    sort::SortColumn,
    view_setting::ViewSetting,
};

/// Which columns take part in per-row change detection.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DeltaPolicy {
    /// Every column, so a ticking `AGE` marks the row updated.
    #[default]
    AllColumns,

    /// Every column but the volatile `AGE` column.
    IgnoreVolatile,
}

impl DeltaPolicy {
    fn ignored_column(self, header: &Header) -> Option<usize> {
        match self {
            Self::AllColumns => None,
            Self::IgnoreVolatile => header.age_index(),
        }
    }
}

/// What a reconciliation pass did, by row ID.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReconcileReport {
    pub added: Vec<String>,

    pub updated: Vec<String>,

    pub unchanged: Vec<String>,

    /// Rows the snapshot no longer reported, classified as deleted.
    pub removed: Vec<RowEvent>,

    /// Rows scheduled for removal that were already gone.
    pub missing: Vec<String>,
}

impl ReconcileReport {
    /// Returns `true` if any row was added, updated or removed.
    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty())
    }
}

/// A filtered table and the reason text filtering was skipped, if it was.
#[derive(Debug)]
pub struct Filtered {
    pub table: TableData,

    pub fallback: Option<FilterError>,
}

#[derive(Clone, Debug, Default)]
struct Inner {
    header: Header,

    rows: RowEvents,

    namespace: String,
}

/// The rows of one resource view, reconciled snapshot after snapshot.
#[derive(Debug)]
pub struct TableData {
    resource: String,

    delta_policy: DeltaPolicy,

    inner: RwLock<Inner>,
}

impl TableData {
    /// Creates an empty table for `resource`, scoped to all namespaces until
    /// [`reset`](Self::reset) or [`set_header`](Self::set_header) says
    /// otherwise.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            delta_policy: DeltaPolicy::default(),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Builds a table around rows that are already reconciled, e.g. the
    /// output of a filter or a snapshot restored by the caller.
    ///
    /// The rows are taken as is. Their cell counts are expected to match
    /// `header`; no reconciliation happens until the next
    /// [`update`](Self::update).
    pub fn with_rows(
        resource: impl Into<String>,
        namespace: impl Into<String>,
        header: Header,
        rows: RowEvents,
    ) -> Self {
        Self {
            resource: resource.into(),
            delta_policy: DeltaPolicy::default(),
            inner: RwLock::new(Inner { header, rows, namespace: namespace.into() }),
        }
    }

    /// Replaces the policy deciding which cell changes count as deltas.
    #[must_use]
    pub const fn with_delta_policy(mut self, delta_policy: DeltaPolicy) -> Self {
        self.delta_policy = delta_policy;
        self
    }

    fn derive(&self, inner: Inner) -> Self {
        Self {
            resource: self.resource.clone(),
            delta_policy: self.delta_policy,
            inner: RwLock::new(inner),
        }
    }

    #[inline]
    pub fn resource(&self) -> &str { &self.resource }

    #[inline]
    pub const fn delta_policy(&self) -> DeltaPolicy { self.delta_policy }

    /// The namespace scope, empty when the table spans all namespaces.
    pub fn namespace(&self) -> String { self.inner.read().namespace.clone() }

    pub fn header(&self) -> Header { self.inner.read().header.clone() }

    pub fn header_count(&self) -> usize { self.inner.read().header.len() }

    /// Looks up a column by name, wide columns only when `wide` is set.
    pub fn head_col(&self, name: &str, wide: bool) -> Option<(usize, HeaderColumn)> {
        let inner = self.inner.read();
        let idx = inner.header.index_of(name, wide)?;
        inner.header.get(idx).cloned().map(|col| (idx, col))
    }

    /// Position of the non-wide column `name`.
    pub fn index_of_header(&self, name: &str) -> Option<usize> {
        self.inner.read().header.index_of(name, false)
    }

    pub fn column_names(&self, wide: bool) -> Vec<String> {
        self.inner.read().header.column_names(wide)
    }

    pub fn is_empty(&self) -> bool { self.inner.read().rows.is_empty() }

    pub fn row_count(&self) -> usize { self.inner.read().rows.len() }

    pub fn row_at(&self, index: usize) -> Option<RowEvent> { self.inner.read().rows.at(index).cloned() }

    pub fn find_row(&self, id: &str) -> Option<RowEvent> { self.inner.read().rows.get(id).cloned() }

    /// A copy of the row store.
    pub fn row_events(&self) -> RowEvents { self.inner.read().rows.clone() }

    /// Visits rows in display order while `f` returns `true`.
    ///
    /// The read lock is held for the whole visit; `f` must not write to this
    /// table.
    pub fn range<F>(&self, f: F)
    where
        F: FnMut(usize, &RowEvent) -> bool,
    {
        self.inner.read().rows.range(f);
    }

    /// Inserts or replaces a row by ID, returning the replaced one.
    pub fn add_row(&self, event: RowEvent) -> Option<RowEvent> { self.inner.write().rows.add(event) }

    /// Replaces the row at `index`.
    ///
    /// # Errors
    ///
    /// Fails when `index` is out of range or the row's ID is held elsewhere.
    pub fn set_row(&self, index: usize, event: RowEvent) -> Result<RowEvent, Error> {
        self.inner.write().rows.set(index, event)
    }

    /// Replaces the header and the namespace scope.
    pub fn set_header(&self, namespace: impl Into<String>, header: Header) {
        let mut inner = self.inner.write();
        inner.namespace = namespace.into();
        inner.header = header;
    }

    /// Drops the header and every row.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.header = Header::clear();
        inner.rows.clear();
    }

    /// Switches to another namespace scope and drops the current content.
    pub fn reset(&self, namespace: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.namespace = namespace.into();
        inner.header = Header::clear();
        inner.rows.clear();
    }

    /// Hydrates `objects` and reconciles the resulting rows.
    ///
    /// # Errors
    ///
    /// Fails when the objects do not have the shape the renderer expects,
    /// when hydration fails, or when the renderer resolves no column. Rows
    /// are hydrated outside the lock, so the render is also abandoned when
    /// the namespace scope was switched meanwhile. The table is left
    /// untouched in every case.
    pub fn render<R: Renderer>(
        &self,
        renderer: &R,
        objects: &[RawObject<R::Object>],
    ) -> Result<ReconcileReport, Error> {
        let namespace = self.namespace();
        let rows = render::hydrate(renderer, &self.resource, &namespace, objects)?;
        let header = renderer.header(&namespace);
        snafu::ensure!(!header.is_empty(), error::NoDataSnafu { resource: self.resource.as_str() });

        let mut inner = self.inner.write();
        snafu::ensure!(
            inner.namespace == namespace,
            error::NamespaceChangedSnafu {
                resource: self.resource.as_str(),
                rendered: namespace,
                current: inner.namespace.as_str(),
            }
        );
        inner.header = header;
        Ok(Self::reconcile(&mut inner, rows, self.delta_policy))
    }

    /// Reconciles a fresh snapshot into the table. Afterwards the table
    /// holds exactly the IDs of `rows`.
    pub fn update(&self, rows: Vec<Row>) -> ReconcileReport {
        Self::reconcile(&mut self.inner.write(), rows, self.delta_policy)
    }

    fn reconcile(inner: &mut Inner, rows: Vec<Row>, policy: DeltaPolicy) -> ReconcileReport {
        let ignore = policy.ignored_column(&inner.header);
        let mut report = ReconcileReport::default();

        let mut last_seen = HashMap::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            if last_seen.insert(row.id.clone(), idx).is_some() {
                tracing::debug!("Row {} is reported more than once, keeping the last one", row.id);
            }
        }

        for (idx, row) in rows.into_iter().enumerate() {
            if last_seen.get(&row.id) != Some(&idx) {
                continue;
            }
            let id = row.id.clone();
            let event = match inner.rows.get(&id) {
                None => {
                    report.added.push(id);
                    RowEvent::new(EventKind::Added, row)
                }
                Some(existing) => {
                    let deltas = DeltaRow::new(&existing.row, &row, ignore);
                    if deltas.is_blank() {
                        report.unchanged.push(id);
                        RowEvent::new(EventKind::Unchanged, row)
                    } else {
                        report.updated.push(id);
                        RowEvent::with_deltas(row, deltas)
                    }
                }
            };
            drop(inner.rows.add(event));
        }

        let victims = inner
            .rows
            .ids()
            .filter(|id| !last_seen.contains_key(*id))
            .map(ToString::to_string)
            .collect::<HashSet<_>>();
        let DeleteOutcome { removed, missing } = inner.rows.delete_all(&victims);
        for id in &missing {
            tracing::warn!("Row {id} was already gone when removing stale rows");
        }

        report.removed = removed
            .into_iter()
            .map(|event| RowEvent { kind: EventKind::Deleted, ..event })
            .collect();
        report.missing = missing;
        report
    }

    /// Removes the rows with the given IDs. IDs that are not present are
    /// reported rather than treated as failures.
    pub fn delete(&self, ids: &HashSet<String>) -> DeleteOutcome {
        let outcome = self.inner.write().rows.delete_all(ids);
        for id in &outcome.missing {
            tracing::warn!("Failed to delete row {id}, it is not in {}", self.resource);
        }
        outcome
    }

    /// Sorts the rows by the named column. An unknown column leaves the
    /// order unchanged.
    pub fn sort(&self, sort_column: &SortColumn) {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let Some(idx) = inner.header.index_of(&sort_column.name, true) else {
            return;
        };
        let role = inner.header.get(idx).map(|col| col.role).unwrap_or_default();
        inner.rows.sort(&inner.namespace, idx, role, sort_column.asc);
    }

    /// Resolves the sort column to apply.
    ///
    /// Without persisted settings the current sort wins when set, otherwise
    /// a default is derived from the header. With persisted settings a
    /// manual sort wins when set, otherwise the persisted one applies.
    pub fn compute_sort_col(
        &self,
        view_setting: Option<&ViewSetting>,
        current: &SortColumn,
        manual: bool,
    ) -> SortColumn {
        match view_setting.filter(|setting| !setting.is_blank()) {
            None if current.is_set() => current.clone(),
            None => self.default_sort_col().unwrap_or_else(|| current.clone()),
            Some(_) if manual && current.is_set() => current.clone(),
            Some(setting) => setting.sort_col().unwrap_or_else(|err| {
                tracing::debug!("{err}");
                current.clone()
            }),
        }
    }

    fn default_sort_col(&self) -> Option<SortColumn> {
        let inner = self.inner.read();
        let first = inner.header.get(0)?;
        let name = [columns::NAMESPACE, columns::NAME]
            .into_iter()
            .filter(|&name| {
                name != columns::NAMESPACE || namespace::is_all_namespaces(&inner.namespace)
            })
            .find(|name| inner.header.index_of(name, false).is_some())
            .unwrap_or(first.name.as_str());
        Some(SortColumn::new(name, true))
    }

    /// Returns a new table holding the rows selected by `opts`. An invalid
    /// regex is logged and the rows are left unfiltered by text.
    #[must_use]
    pub fn filter(&self, opts: &FilterOpts) -> Self {
        let Filtered { table, fallback } = self.filter_with_outcome(opts);
        if let Some(err) = fallback {
            tracing::error!("{err}");
        }
        table
    }

    /// Like [`TableData::filter`], reporting why text filtering was skipped.
    pub fn filter_with_outcome(&self, opts: &FilterOpts) -> Filtered {
        let inner = self.inner.read();
        let base =
            if opts.toast { filter::toast_filter(&inner.header, &inner.rows) } else { inner.rows.clone() };

        let (rows, fallback) = match opts.query() {
            FilterQuery::Empty | FilterQuery::LabelSelector(_) => (base, None),
            FilterQuery::Fuzzy(query) => (filter::fuzzy_filter(&base, &query), None),
            FilterQuery::Regex { pattern, invert } => {
                match filter::rx_filter(&inner.header, &base, &inner.namespace, &pattern, invert) {
                    Ok(rows) => (rows, None),
                    Err(err) => (base, Some(err)),
                }
            }
        };

        let table = self.derive(Inner {
            header: inner.header.clone(),
            rows,
            namespace: inner.namespace.clone(),
        });
        Filtered { table, fallback }
    }

    /// Returns a new table projecting the `LABELS` column into one column
    /// per label key, after the identity columns. With no `keys` every key
    /// found in the rows is projected. A table without a `LABELS` column is
    /// copied as is.
    #[must_use]
    pub fn labelize(&self, keys: &[String]) -> Self {
        let inner = self.inner.read();
        let Some(label_col) = inner.header.index_of(columns::LABELS, true) else {
            return self.derive(Inner::clone(&inner));
        };

        let mut cols = Vec::with_capacity(2);
        if namespace::is_all_namespaces(&inner.namespace)
            && let Some(idx) = inner.header.index_of(columns::NAMESPACE, true)
        {
            cols.push(idx);
        }
        if let Some(idx) = inner.header.index_of(columns::NAME, true) {
            cols.push(idx);
        }
        let keys =
            if keys.is_empty() { inner.rows.extract_header_labels(label_col) } else { keys.to_vec() };

        self.derive(Inner {
            header: inner.header.labelize(&cols, &keys),
            rows: inner.rows.labelize(&cols, label_col, &keys),
            namespace: inner.namespace.clone(),
        })
    }

    /// Returns `true` if the tables differ in namespace, header, or any row
    /// field other than `AGE`.
    pub fn diff(&self, other: &Self) -> bool {
        if ptr::eq(self, other) {
            return false;
        }
        // Lock in address order so two opposite diffs cannot deadlock.
        let (first, second) =
            if ptr::from_ref(self) < ptr::from_ref(other) { (self, other) } else { (other, self) };
        let lhs = first.inner.read();
        let rhs = second.inner.read();

        if lhs.namespace != rhs.namespace || lhs.header.diff(&rhs.header) {
            return true;
        }
        lhs.rows.diff(&rhs.rows, lhs.header.age_index())
    }
}

impl Clone for TableData {
    fn clone(&self) -> Self { self.derive(Inner::clone(&self.inner.read())) }
}

#[cfg(test)]
mod tests {
    use std::{convert::Infallible, sync::Arc, thread};

    use super::*;
    use crate::{
        RenderError,
        render::{GenericRenderer, GenericTable},
    };

    fn header() -> Header {
        Header::new(vec![
            HeaderColumn::new("NAME"),
            HeaderColumn::metric("COUNT"),
            HeaderColumn::new("VALID"),
            HeaderColumn::new("LABELS").wide(),
            HeaderColumn::time("AGE"),
        ])
    }

    fn row(name: &str, count: &str, age: &str) -> Row {
        Row::new(format!("default/{name}"), [name, count, "", "app=web", age])
    }

    fn table() -> TableData {
        let table = TableData::new("pods");
        table.set_header("default", header());
        drop(table.update(vec![row("a", "1", "5m"), row("b", "2", "3m"), row("c", "3", "1h")]));
        table
    }

    fn ids(table: &TableData) -> Vec<String> {
        table.row_events().ids().map(ToString::to_string).collect()
    }

    fn kind(table: &TableData, id: &str) -> Option<EventKind> { table.find_row(id).map(|ev| ev.kind) }

    #[test]
    fn test_update_fresh_rows_added() {
        let table = TableData::new("pods");
        table.set_header("default", header());
        let report = table.update(vec![row("a", "1", "5m"), row("b", "2", "3m")]);

        assert_eq!(report.added, vec!["default/a", "default/b"]);
        assert!(report.has_changes());
        assert_eq!(kind(&table, "default/a"), Some(EventKind::Added));
    }

    #[test]
    fn test_update_converges() {
        let table = table();
        let report = table.update(vec![row("b", "2", "3m"), row("d", "4", "1s")]);

        assert_eq!(ids(&table), vec!["default/b", "default/d"]);
        assert_eq!(report.added, vec!["default/d"]);
        assert_eq!(report.unchanged, vec!["default/b"]);
        assert_eq!(
            report.removed.iter().map(RowEvent::id).collect::<Vec<_>>(),
            vec!["default/a", "default/c"]
        );
        assert!(report.removed.iter().all(|ev| ev.kind == EventKind::Deleted));
        assert!(report.missing.is_empty());
    }

    #[test]
    fn test_update_idempotent() {
        let table = table();
        let snapshot = vec![row("a", "1", "5m"), row("b", "2", "3m"), row("c", "3", "1h")];
        let report = table.update(snapshot);

        assert!(!report.has_changes());
        assert_eq!(report.unchanged.len(), 3);
        table.range(|_, ev| {
            assert_eq!(ev.kind, EventKind::Unchanged);
            assert!(ev.deltas.is_blank());
            true
        });
    }

    #[test]
    fn test_update_marks_changed_cell() {
        let table = TableData::new("pods");
        table.set_header("default", Header::new(vec![HeaderColumn::new("NAME"), HeaderColumn::new("COUNT")]));
        drop(table.update(vec![Row::new("a", ["a", "1"])]));
        let report = table.update(vec![Row::new("a", ["a", "2"])]);

        assert_eq!(report.updated, vec!["a"]);
        let event = table.find_row("a").expect("row a");
        assert_eq!(event.kind, EventKind::Updated);
        assert!(!event.deltas.is_changed(0));
        assert!(event.deltas.is_changed(1));
        assert_eq!(event.deltas.previous(1), Some("1"));

        // A later identical snapshot clears the markers but keeps the value.
        drop(table.update(vec![Row::new("a", ["a", "2"])]));
        let event = table.find_row("a").expect("row a");
        assert_eq!(event.kind, EventKind::Unchanged);
        assert!(event.deltas.is_blank());
        assert_eq!(event.row.fields, vec!["a", "2"]);
    }

    #[test]
    fn test_update_duplicate_last_wins() {
        let table = table();
        let report = table.update(vec![row("a", "1", "5m"), row("a", "9", "5m")]);

        assert_eq!(ids(&table), vec!["default/a"]);
        assert_eq!(report.updated, vec!["default/a"]);
        assert_eq!(table.find_row("default/a").and_then(|ev| ev.row.field(1).map(str::to_string)), Some("9".to_string()));
    }

    #[test]
    fn test_delta_policy() {
        let table = table();
        drop(table.update(vec![row("a", "1", "6m")]));
        assert_eq!(kind(&table, "default/a"), Some(EventKind::Updated));

        let table = self::table().with_delta_policy(DeltaPolicy::IgnoreVolatile);
        drop(table.update(vec![row("a", "1", "6m")]));
        assert_eq!(kind(&table, "default/a"), Some(EventKind::Unchanged));
        assert_eq!(table.find_row("default/a").and_then(|ev| ev.row.field(4).map(str::to_string)), Some("6m".to_string()));
    }

    #[test]
    fn test_delete_reports_missing() {
        let table = table();
        let ids = HashSet::from(["default/a".to_string(), "default/z".to_string()]);
        let outcome = table.delete(&ids);

        assert_eq!(outcome.removed.len(), 1);
        assert_eq!(outcome.missing, vec!["default/z"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_clear_and_reset() {
        let table = table();
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.header_count(), 0);
        assert_eq!(table.namespace(), "default");

        let table = self::table();
        table.reset("kube-system");
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.namespace(), "kube-system");
    }

    #[test]
    fn test_accessors() {
        let table = table();
        assert_eq!(table.resource(), "pods");
        assert_eq!(table.column_names(false), vec!["NAME", "COUNT", "VALID", "AGE"]);
        assert_eq!(table.index_of_header("LABELS"), None);
        assert_eq!(table.head_col("LABELS", true).map(|(idx, _)| idx), Some(3));
        assert_eq!(table.row_at(1).map(|ev| ev.row.id), Some("default/b".to_string()));
        assert!(table.row_at(3).is_none());

        let previous = table.add_row(RowEvent::new(EventKind::Added, row("a", "7", "5m")));
        assert!(previous.is_some());
        let replaced = table.set_row(2, RowEvent::new(EventKind::Added, row("e", "5", "1s")));
        assert_eq!(replaced.map(|ev| ev.row.id).ok(), Some("default/c".to_string()));
        assert!(matches!(
            table.set_row(9, RowEvent::default()),
            Err(Error::IndexOutOfRange { index: 9, len: 3 })
        ));
    }

    #[test]
    fn test_filter_empty_is_independent_copy() {
        let table = table();
        let filtered = table.filter(&FilterOpts::default());
        assert!(!table.diff(&filtered));
        assert_eq!(table.row_events(), filtered.row_events());

        drop(filtered.update(vec![row("z", "0", "1s")]));
        assert_eq!(table.row_count(), 3);
        assert!(table.find_row("default/z").is_none());
    }

    #[test]
    fn test_filter_regex_and_inversion() {
        let table = TableData::new("pods");
        table.set_header("default", header());
        drop(table.update(vec![row("foo", "1", "1m"), row("bar", "2", "1m")]));

        let filtered = table.filter(&FilterOpts::new("foo"));
        assert_eq!(ids(&filtered), vec!["default/foo"]);

        let inverted = table.filter(&FilterOpts { invert: true, ..FilterOpts::new("foo") });
        assert_eq!(ids(&inverted), vec!["default/bar"]);

        let marked = table.filter(&FilterOpts::new("!foo"));
        assert_eq!(ids(&marked), vec!["default/bar"]);
    }

    #[test]
    fn test_filter_invalid_regex_falls_back() {
        let table = table();
        let Filtered { table: filtered, fallback } = table.filter_with_outcome(&FilterOpts::new("a("));
        assert!(matches!(fallback, Some(FilterError::InvalidRegex { .. })));
        assert_eq!(filtered.row_count(), 3);
    }

    #[test]
    fn test_filter_toast_then_text() {
        let table = TableData::new("pods");
        table.set_header("default", header());
        drop(table.update(vec![
            Row::new("default/a", ["a", "1", "restarts", "", "1m"]),
            Row::new("default/b", ["b", "1", "", "", "1m"]),
            Row::new("default/c", ["c", "1", "image", "", "1m"]),
        ]));

        let toast = table.filter(&FilterOpts { toast: true, ..FilterOpts::default() });
        assert_eq!(ids(&toast), vec!["default/a", "default/c"]);

        let narrowed = table.filter(&FilterOpts { toast: true, ..FilterOpts::new("image") });
        assert_eq!(ids(&narrowed), vec!["default/c"]);

        let selector = table.filter(&FilterOpts::new("app=web"));
        assert_eq!(selector.row_count(), 3);
    }

    #[test]
    fn test_filter_fuzzy() {
        let table = TableData::new("pods");
        table.set_header("", Header::new(vec![HeaderColumn::new("NAME")]));
        drop(table.update(["apple", "banana", "apply"].map(|id| Row::new(id, [id])).to_vec()));

        let filtered = table.filter(&FilterOpts::new("-f appl"));
        assert_eq!(ids(&filtered), vec!["apple", "apply"]);

        drop(table.update(["xaxpxpxlx", "appl-0"].map(|id| Row::new(id, [id])).to_vec()));
        let ranked = table.filter(&FilterOpts::new("-f appl"));
        assert_eq!(ids(&ranked), vec!["appl-0", "xaxpxpxlx"]);
        assert_eq!(ids(&table), vec!["xaxpxpxlx", "appl-0"]);
    }

    #[test]
    fn test_sort() {
        let table = table();
        table.sort(&SortColumn::new("AGE", true));
        assert_eq!(ids(&table), vec!["default/b", "default/a", "default/c"]);

        table.sort(&SortColumn::new("COUNT", false));
        assert_eq!(ids(&table), vec!["default/c", "default/b", "default/a"]);
        assert_eq!(table.find_row("default/c").map(|ev| ev.row.id), table.row_at(0).map(|ev| ev.row.id));

        table.sort(&SortColumn::new("BOGUS", true));
        assert_eq!(ids(&table), vec!["default/c", "default/b", "default/a"]);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let table = TableData::new("pods");
        table.set_header("default", header());
        drop(table.update(vec![row("c", "1", "1m"), row("a", "1", "1m"), row("b", "1", "1m")]));
        assert_eq!(ids(&table), vec!["default/c", "default/a", "default/b"]);
        for _ in 0..3 {
            table.sort(&SortColumn::new("COUNT", false));
            assert_eq!(ids(&table), vec!["default/a", "default/b", "default/c"]);
        }
    }

    #[test]
    fn test_compute_sort_col() {
        let table = table();
        let unset = SortColumn::default();
        let current = SortColumn::new("AGE", false);
        let persisted = ViewSetting { sort_column: "COUNT:asc".to_string(), ..ViewSetting::default() };
        let broken = ViewSetting { sort_column: "COUNT".to_string(), ..ViewSetting::default() };

        assert_eq!(table.compute_sort_col(None, &current, false), current);
        assert_eq!(table.compute_sort_col(None, &unset, false), SortColumn::new("NAME", true));
        assert_eq!(
            table.compute_sort_col(Some(&ViewSetting::default()), &unset, true),
            SortColumn::new("NAME", true)
        );
        assert_eq!(table.compute_sort_col(Some(&persisted), &current, true), current);
        assert_eq!(table.compute_sort_col(Some(&persisted), &current, false), SortColumn::new("COUNT", true));
        assert_eq!(table.compute_sort_col(Some(&broken), &current, false), current);

        let all = TableData::new("pods");
        all.set_header("", Header::new(vec![HeaderColumn::new("NAMESPACE"), HeaderColumn::new("NAME")]));
        assert_eq!(all.compute_sort_col(None, &unset, false), SortColumn::new("NAMESPACE", true));

        let nameless = TableData::new("events");
        nameless.set_header("default", Header::new(vec![HeaderColumn::new("REASON")]));
        assert_eq!(nameless.compute_sort_col(None, &unset, false), SortColumn::new("REASON", true));

        assert_eq!(TableData::new("pods").compute_sort_col(None, &unset, false), unset);
    }

    #[test]
    fn test_diff() {
        let table = table();
        assert!(!table.diff(&table));

        let aged = table.clone();
        drop(aged.update(vec![row("a", "1", "6m"), row("b", "2", "4m"), row("c", "3", "2h")]));
        assert!(!table.diff(&aged));

        let changed = table.clone();
        drop(changed.update(vec![row("a", "1", "5m"), row("b", "5", "3m"), row("c", "3", "1h")]));
        assert!(table.diff(&changed));
        assert!(changed.diff(&table));

        let moved = table.clone();
        moved.set_header("kube-system", header());
        assert!(table.diff(&moved));

        let narrowed = table.clone();
        narrowed.set_header("default", Header::new(header().iter().take(4).cloned().collect()));
        assert!(table.diff(&narrowed));

        let shrunk = table.clone();
        drop(shrunk.update(vec![row("a", "1", "5m")]));
        assert!(table.diff(&shrunk));
    }

    #[test]
    fn test_labelize() {
        let table = TableData::new("pods");
        table.set_header("", Header::new(vec![
            HeaderColumn::new("NAMESPACE"),
            HeaderColumn::new("NAME"),
            HeaderColumn::new("LABELS"),
        ]));
        drop(table.update(vec![
            Row::new("default/a", ["default", "a", "app=web,tier=fe"]),
            Row::new("default/b", ["default", "b", "app=db"]),
        ]));

        let all_keys = table.labelize(&[]);
        assert_eq!(all_keys.column_names(true), vec!["NAMESPACE", "NAME", "app", "tier"]);
        assert_eq!(all_keys.find_row("default/b").map(|ev| ev.row.fields), Some(vec![
            "default".to_string(),
            "b".to_string(),
            "db".to_string(),
            String::new(),
        ]));

        let selected = table.labelize(&["tier".to_string()]);
        assert_eq!(selected.column_names(true), vec!["NAMESPACE", "NAME", "tier"]);
        assert_eq!(table.header_count(), 3);

        let plain = TableData::new("nodes");
        plain.set_header("", Header::new(vec![HeaderColumn::new("NAME")]));
        assert!(!plain.labelize(&[]).diff(&plain));
    }

    struct Names;

    impl Renderer for Names {
        type Object = (String, String);

        fn header(&self, _namespace: &str) -> Header {
            Header::new(vec![HeaderColumn::new("NAME"), HeaderColumn::new("STATUS")])
        }

        fn render(&self, object: &Self::Object, namespace: &str) -> Result<Row, RenderError> {
            let (name, status) = object;
            if name.is_empty() {
                return Err(RenderError::missing_field("name"));
            }
            Ok(Row::new(namespace::fqn(namespace, name), [name.as_str(), status.as_str()]))
        }
    }

    struct Empty;

    impl Renderer for Empty {
        type Object = Infallible;

        fn header(&self, _namespace: &str) -> Header { Header::default() }

        fn render(&self, object: &Self::Object, _namespace: &str) -> Result<Row, RenderError> {
            match *object {}
        }
    }

    fn object(name: &str, status: &str) -> RawObject<(String, String)> {
        RawObject::Object((name.to_string(), status.to_string()))
    }

    #[test]
    fn test_render_reconciles() {
        let table = TableData::new("pods");
        table.reset("default");
        let report =
            table.render(&Names, &[object("a", "Running"), object("b", "Pending")]).expect("rendered");
        assert_eq!(report.added, vec!["default/a", "default/b"]);
        assert_eq!(table.column_names(false), vec!["NAME", "STATUS"]);

        let report = table.render(&Names, &[object("b", "Running")]).expect("rendered");
        assert_eq!(report.updated, vec!["default/b"]);
        assert_eq!(ids(&table), vec!["default/b"]);
    }

    #[test]
    fn test_render_failures_leave_table_untouched() {
        let table = TableData::new("pods");
        table.reset("default");
        drop(table.render(&Names, &[object("a", "Running")]).expect("rendered"));
        let before = table.clone();

        let err = table.render(&Names, &[RawObject::Table(GenericTable::default())]).expect_err("shape");
        assert!(matches!(err, Error::ShapeMismatch { .. }));

        let err = table.render(&Names, &[object("", "Running")]).expect_err("hydration");
        assert!(matches!(err, Error::Hydrate { .. }));

        let tables = [RawObject::Table(GenericTable::default())];
        let err = table.render(&GenericRenderer::new(), &tables).expect_err("no name column");
        assert!(matches!(err, Error::Hydrate { .. }));

        let err = table.render(&Empty, &[]).expect_err("no data");
        assert!(matches!(err, Error::NoData { ref resource } if resource == "pods"));

        assert!(!table.diff(&before));
        assert_eq!(table.row_events(), before.row_events());
    }

    /// Switches the table to another namespace while hydrating.
    struct Switching<'a> {
        table: &'a TableData,
    }

    impl Renderer for Switching<'_> {
        type Object = (String, String);

        fn header(&self, namespace: &str) -> Header { Names.header(namespace) }

        fn render(&self, object: &Self::Object, namespace: &str) -> Result<Row, RenderError> {
            self.table.reset("kube-system");
            Names.render(object, namespace)
        }
    }

    #[test]
    fn test_render_abandoned_when_namespace_switches() {
        let table = TableData::new("pods");
        table.reset("default");

        let err = table
            .render(&Switching { table: &table }, &[object("a", "Running")])
            .expect_err("namespace switched");
        assert!(matches!(
            err,
            Error::NamespaceChanged { ref rendered, ref current, .. }
                if rendered == "default" && current == "kube-system"
        ));
        assert_eq!(table.namespace(), "kube-system");
        assert!(table.is_empty());
        assert_eq!(table.header_count(), 0);
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let table = Arc::new(table());
        let snapshot_a = vec![row("a", "1", "5m"), row("b", "2", "3m"), row("c", "3", "1h")];
        let snapshot_b = vec![row("d", "1", "5m"), row("e", "2", "3m")];
        let ids_a = HashSet::from(["default/a", "default/b", "default/c"].map(String::from));
        let ids_b = HashSet::from(["default/d", "default/e"].map(String::from));

        thread::scope(|scope| {
            let writer = Arc::clone(&table);
            let _writer = scope.spawn(move || {
                for round in 0..500 {
                    let rows = if round % 2 == 0 { snapshot_b.clone() } else { snapshot_a.clone() };
                    drop(writer.update(rows));
                    if round % 50 == 0 {
                        writer.sort(&SortColumn::new("COUNT", round % 100 == 0));
                    }
                }
            });

            for _ in 0..4 {
                let reader = Arc::clone(&table);
                let (ids_a, ids_b) = (&ids_a, &ids_b);
                let _reader = scope.spawn(move || {
                    for _ in 0..500 {
                        let mut seen = HashSet::new();
                        reader.range(|_, ev| seen.insert(ev.id().to_string()));
                        assert!(seen == *ids_a || seen == *ids_b, "torn read: {seen:?}");
                        assert!(reader.row_count() == 2 || reader.row_count() == 3);
                        assert_eq!(reader.header_count(), 5);
                        let _ = reader.diff(&reader.filter(&FilterOpts::default()));
                    }
                });
            }
        });
    }
}
