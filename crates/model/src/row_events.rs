//! The canonical, ID-indexed row store.

use std::collections::{BTreeSet, HashMap, HashSet};

use kestrel_base::namespace;

use crate::{
    error::{self, Error},
    header::ColumnRole,
    row::{RowEvent, parse_labels},
    sort::compare_cells,
};

/// Result of removing a batch of rows by ID.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeleteOutcome {
    /// The removed events, in their former enumeration order.
    pub removed: Vec<RowEvent>,

    /// Requested IDs that were not in the store.
    pub missing: Vec<String>,
}

/// Order-preserving collection of [`RowEvent`]s keyed by row ID.
///
/// Enumeration follows insertion order until [`RowEvents::sort`] reorders
/// it. An ID→position index is kept in step with every mutation so lookups
/// by ID and by position are both O(1).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RowEvents {
    events: Vec<RowEvent>,

    index: HashMap<String, usize>,
}

impl RowEvents {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { events: Vec::with_capacity(capacity), index: HashMap::with_capacity(capacity) }
    }

    #[inline]
    pub fn len(&self) -> usize { self.events.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.events.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, RowEvent> { self.events.iter() }

    /// Row IDs in enumeration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ { self.events.iter().map(RowEvent::id) }

    /// Appends an event. An event whose ID is already present replaces the
    /// existing one in place and the previous event is returned.
    pub fn add(&mut self, event: RowEvent) -> Option<RowEvent> {
        if let Some(&idx) = self.index.get(event.id()) {
            return Some(std::mem::replace(&mut self.events[idx], event));
        }
        let _ = self.index.insert(event.id().to_string(), self.events.len());
        self.events.push(event);
        None
    }

    /// Replaces the event at `index` and returns the previous one.
    ///
    /// # Errors
    ///
    /// Fails when `index` is out of range, or when the new event's ID is
    /// already held by another position.
    pub fn set(&mut self, index: usize, event: RowEvent) -> Result<RowEvent, Error> {
        let len = self.events.len();
        let Some(slot) = self.events.get_mut(index) else {
            return error::IndexOutOfRangeSnafu { index, len }.fail();
        };
        if slot.id() != event.id() {
            if self.index.contains_key(event.id()) {
                return error::DuplicateRowSnafu { id: event.id() }.fail();
            }
            let _ = self.index.remove(slot.id());
            let _ = self.index.insert(event.id().to_string(), index);
        }
        Ok(std::mem::replace(slot, event))
    }

    pub fn get(&self, id: &str) -> Option<&RowEvent> {
        self.index.get(id).and_then(|&idx| self.events.get(idx))
    }

    pub fn at(&self, index: usize) -> Option<&RowEvent> { self.events.get(index) }

    pub fn find_index(&self, id: &str) -> Option<usize> { self.index.get(id).copied() }

    /// Removes the event with the given ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowNotFound`] when no event carries `id`.
    pub fn delete(&mut self, id: &str) -> Result<RowEvent, Error> {
        let Some(idx) = self.index.remove(id) else {
            return error::RowNotFoundSnafu { id }.fail();
        };
        let removed = self.events.remove(idx);
        self.reindex_from(idx);
        Ok(removed)
    }

    /// Removes every event whose ID is in `ids` in a single pass.
    pub fn delete_all(&mut self, ids: &HashSet<String>) -> DeleteOutcome {
        if ids.is_empty() {
            return DeleteOutcome::default();
        }

        let mut removed = Vec::with_capacity(ids.len());
        let mut kept = Vec::with_capacity(self.events.len().saturating_sub(ids.len()));
        for event in self.events.drain(..) {
            if ids.contains(event.id()) { removed.push(event) } else { kept.push(event) }
        }
        self.events = kept;
        self.reindex_from(0);

        let missing = if removed.len() == ids.len() {
            Vec::new()
        } else {
            let found = removed.iter().map(RowEvent::id).collect::<HashSet<_>>();
            ids.iter().filter(|id| !found.contains(id.as_str())).cloned().collect()
        };
        DeleteOutcome { removed, missing }
    }

    /// Visits events in enumeration order until `f` returns `false`.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(usize, &RowEvent) -> bool,
    {
        for (idx, event) in self.events.iter().enumerate() {
            if !f(idx, event) {
                break;
            }
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.index.clear();
    }

    /// Returns `true` if the stores differ in size, in ID membership, or in
    /// any field other than the column at `ignore`.
    pub fn diff(&self, other: &Self, ignore: Option<usize>) -> bool {
        if self.len() != other.len() {
            return true;
        }
        self.events.iter().any(|event| {
            other.get(event.id()).is_none_or(|theirs| event.diff(theirs, ignore))
        })
    }

    /// Sorted, de-duplicated label keys found in the label column.
    pub fn extract_header_labels(&self, label_col: usize) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| event.row.field(label_col))
            .flat_map(|cell| parse_labels(cell).into_keys())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Projects every event onto the identity columns at `cols` plus one
    /// column per label key.
    #[must_use]
    pub fn labelize(&self, cols: &[usize], label_col: usize, keys: &[String]) -> Self {
        self.events.iter().map(|event| event.labelize(cols, label_col, keys)).collect()
    }

    /// Reorders the events by the column at `col`, compared according to
    /// `role`.
    ///
    /// Equal cells are ordered by row ID, ascending regardless of `asc`, so
    /// repeated sorts yield the same order. In a namespaced view the shared
    /// namespace prefix is skipped when comparing IDs.
    pub fn sort(&mut self, namespace: &str, col: usize, role: ColumnRole, asc: bool) {
        fn tie_key(event: &RowEvent, namespaced: bool) -> &str {
            if namespaced { namespace::split_fqn(event.id()).1 } else { event.id() }
        }

        let namespaced = namespace::is_namespaced(namespace);
        self.events.sort_by(|lhs, rhs| {
            let ordering = compare_cells(
                role,
                lhs.row.field(col).unwrap_or_default(),
                rhs.row.field(col).unwrap_or_default(),
            );
            let ordering = if asc { ordering } else { ordering.reverse() };
            ordering
                .then_with(|| tie_key(lhs, namespaced).cmp(tie_key(rhs, namespaced)))
                .then_with(|| lhs.id().cmp(rhs.id()))
        });
        self.reindex_from(0);
    }

    fn reindex_from(&mut self, start: usize) {
        if start == 0 {
            self.index.clear();
        }
        for (idx, event) in self.events.iter().enumerate().skip(start) {
            let _ = self.index.insert(event.id().to_string(), idx);
        }
    }
}

impl FromIterator<RowEvent> for RowEvents {
    /// Collects events; a later event replaces an earlier one with the same
    /// ID.
    fn from_iter<I: IntoIterator<Item = RowEvent>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut events = Self::with_capacity(iter.size_hint().0);
        for event in iter {
            drop(events.add(event));
        }
        events
    }
}

impl<'a> IntoIterator for &'a RowEvents {
    type IntoIter = std::slice::Iter<'a, RowEvent>;
    type Item = &'a RowEvent;

    fn into_iter(self) -> Self::IntoIter { self.events.iter() }
}
