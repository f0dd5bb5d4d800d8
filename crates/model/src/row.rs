//! Rows, their change classification and their per-cell deltas.

use std::{collections::BTreeMap, fmt};

use kestrel_base::consts::{LABEL_ASSIGN, LABEL_SEPARATOR};

/// One entity's identifier and its field values, aligned with the header.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Row {
    pub id: String,

    pub fields: Vec<String>,
}

impl Row {
    pub fn new<I, S>(id: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { id: id.into(), fields: fields.into_iter().map(Into::into).collect() }
    }

    pub fn field(&self, index: usize) -> Option<&str> { self.fields.get(index).map(String::as_str) }

    /// Returns `true` if any field other than `ignore` differs.
    pub fn diff(&self, other: &Self, ignore: Option<usize>) -> bool {
        if self.id != other.id || self.fields.len() != other.fields.len() {
            return true;
        }
        self.fields
            .iter()
            .zip(&other.fields)
            .enumerate()
            .any(|(idx, (lhs, rhs))| Some(idx) != ignore && lhs != rhs)
    }

    /// Keeps the fields at `cols` and appends the value of each label `key`
    /// found in the label column, or an empty cell.
    #[must_use]
    pub fn labelize(&self, cols: &[usize], label_col: usize, keys: &[String]) -> Self {
        let labels = parse_labels(self.field(label_col).unwrap_or_default());
        let fields = cols
            .iter()
            .map(|&idx| self.field(idx).unwrap_or_default().to_string())
            .chain(keys.iter().map(|key| labels.get(key.as_str()).copied().unwrap_or_default().to_string()))
            .collect();
        Self { id: self.id.clone(), fields }
    }
}

/// Splits a `k1=v1,k2=v2` label cell into its pairs. A pair without a value
/// maps to an empty string.
pub(crate) fn parse_labels(cell: &str) -> BTreeMap<&str, &str> {
    cell.split(LABEL_SEPARATOR)
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once(LABEL_ASSIGN).unwrap_or((pair, "")))
        .collect()
}

/// Change classification of a row after a reconciliation pass.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum EventKind {
    #[default]
    Added,
    Updated,
    Unchanged,
    Deleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// Per-column record of the cells that changed between two values of a row.
///
/// A changed cell holds the previous value so the UI can render it; an
/// unchanged cell holds `None`. A blank delta has no changed cell.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct DeltaRow(Vec<Option<String>>);

impl DeltaRow {
    /// Computes the delta from `old` to `new`. The column at `ignore` never
    /// counts as changed.
    pub fn new(old: &Row, new: &Row, ignore: Option<usize>) -> Self {
        let width = old.fields.len().max(new.fields.len());
        let cells = (0..width)
            .map(|idx| {
                let previous = old.field(idx);
                (Some(idx) != ignore && previous != new.field(idx))
                    .then(|| previous.unwrap_or_default().to_string())
            })
            .collect::<Vec<_>>();

        if cells.iter().all(Option::is_none) { Self::default() } else { Self(cells) }
    }

    pub fn is_blank(&self) -> bool { self.0.iter().all(Option::is_none) }

    pub fn is_changed(&self, index: usize) -> bool { matches!(self.0.get(index), Some(Some(_))) }

    /// The value the cell held before it changed.
    pub fn previous(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(Option::as_deref)
    }

    /// Indices of the changed cells.
    pub fn changed_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().filter_map(|(idx, cell)| cell.as_ref().map(|_| idx))
    }

    /// Returns `true` if the deltas differ on any column other than `ignore`.
    pub fn diff(&self, other: &Self, ignore: Option<usize>) -> bool {
        let width = self.0.len().max(other.0.len());
        (0..width).filter(|&idx| Some(idx) != ignore).any(|idx| self.previous(idx) != other.previous(idx))
    }
}

/// A row annotated with its change classification.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct RowEvent {
    pub kind: EventKind,

    pub row: Row,

    pub deltas: DeltaRow,
}

impl RowEvent {
    pub fn new(kind: EventKind, row: Row) -> Self { Self { kind, row, deltas: DeltaRow::default() } }

    /// An `Updated` event carrying the cells that changed.
    pub const fn with_deltas(row: Row, deltas: DeltaRow) -> Self {
        Self { kind: EventKind::Updated, row, deltas }
    }

    #[inline]
    pub fn id(&self) -> &str { &self.row.id }

    /// Returns `true` if the rows differ on any field other than `ignore`.
    pub fn diff(&self, other: &Self, ignore: Option<usize>) -> bool {
        self.row.diff(&other.row, ignore)
    }

    /// Projects the row onto its identity columns plus one column per label
    /// key. A label cell counts as changed when its value for that key
    /// differs from the previous label cell.
    #[must_use]
    pub fn labelize(&self, cols: &[usize], label_col: usize, keys: &[String]) -> Self {
        let row = self.row.labelize(cols, label_col, keys);
        if self.deltas.is_blank() {
            return Self { kind: self.kind, row, deltas: DeltaRow::default() };
        }

        let current = parse_labels(self.row.field(label_col).unwrap_or_default());
        let previous = self.deltas.previous(label_col).map(parse_labels);
        let cells = cols
            .iter()
            .map(|&idx| self.deltas.previous(idx).map(ToString::to_string))
            .chain(keys.iter().map(|key| {
                let previous = previous.as_ref()?;
                let old = previous.get(key.as_str()).copied().unwrap_or_default();
                let new = current.get(key.as_str()).copied().unwrap_or_default();
                (old != new).then(|| old.to_string())
            }))
            .collect::<Vec<_>>();
        let deltas =
            if cells.iter().all(Option::is_none) { DeltaRow::default() } else { DeltaRow(cells) };

        Self { kind: self.kind, row, deltas }
    }
}
