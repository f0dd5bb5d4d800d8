//! Column schema of a table.

use std::{collections::HashSet, fmt, slice};

use kestrel_base::{consts::columns, namespace};
use serde::{Deserialize, Serialize};

/// How a column's values are interpreted when sorting.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnRole {
    /// Free text, compared lexically.
    #[default]
    Plain,
    /// Elapsed durations such as `3d4h` or `45s`.
    Time,
    /// Resource quantities such as `250m`, `1.5` or `12%`.
    Metric,
    /// Byte sizes such as `10Gi` or `512Mi`.
    Capacity,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Plain => "plain",
            Self::Time => "time",
            Self::Metric => "metric",
            Self::Capacity => "capacity",
        };
        f.write_str(s)
    }
}

/// A single column descriptor.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct HeaderColumn {
    pub name: String,

    pub role: ColumnRole,

    /// Only shown when the view is in wide mode.
    pub wide: bool,

    /// Whether the column's values take part in free-text filtering.
    pub filterable: bool,
}

impl HeaderColumn {
    /// A plain, filterable column.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), role: ColumnRole::Plain, wide: false, filterable: true }
    }

    /// A time-valued column. Excluded from free-text filtering.
    pub fn time(name: impl Into<String>) -> Self { Self::with_role(name, ColumnRole::Time) }

    /// A metric-valued column. Excluded from free-text filtering.
    pub fn metric(name: impl Into<String>) -> Self { Self::with_role(name, ColumnRole::Metric) }

    /// A byte-size column. Excluded from free-text filtering.
    pub fn capacity(name: impl Into<String>) -> Self {
        Self::with_role(name, ColumnRole::Capacity)
    }

    fn with_role(name: impl Into<String>, role: ColumnRole) -> Self {
        Self { name: name.into(), role, wide: false, filterable: false }
    }

    #[must_use]
    pub const fn wide(mut self) -> Self {
        self.wide = true;
        self
    }

    #[must_use]
    pub const fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }
}

/// Ordered column schema. Column names are unique within a header.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Header(Vec<HeaderColumn>);

impl Header {
    pub const fn new(columns: Vec<HeaderColumn>) -> Self { Self(columns) }

    #[inline]
    pub fn len(&self) -> usize { self.0.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn get(&self, index: usize) -> Option<&HeaderColumn> { self.0.get(index) }

    pub fn iter(&self) -> slice::Iter<'_, HeaderColumn> { self.0.iter() }

    pub fn columns(&self) -> &[HeaderColumn] { &self.0 }

    /// Returns an empty header.
    #[must_use]
    pub const fn clear() -> Self { Self(Vec::new()) }

    /// Looks up a column by exact name. Wide columns are skipped unless
    /// `include_wide` is set.
    pub fn index_of(&self, name: &str, include_wide: bool) -> Option<usize> {
        self.0.iter().position(|col| (include_wide || !col.wide) && col.name == name)
    }

    /// Column names in display order, wide columns only in wide mode.
    pub fn column_names(&self, wide: bool) -> Vec<String> {
        self.0.iter().filter(|col| wide || !col.wide).map(|col| col.name.clone()).collect()
    }

    /// Index of the volatile elapsed-time column, if any.
    pub fn age_index(&self) -> Option<usize> { self.index_of(columns::AGE, true) }

    /// Indices of the columns matched by the free-text filter.
    ///
    /// The namespace column only takes part when the view spans every
    /// namespace; in a namespaced view it would match every row.
    pub fn filter_col_indices(&self, namespace: &str, wide: bool) -> HashSet<usize> {
        let all_namespaces = namespace::is_all_namespaces(namespace);
        self.0
            .iter()
            .enumerate()
            .filter(|(_, col)| col.filterable && (wide || !col.wide))
            .filter(|(_, col)| all_namespaces || col.name != columns::NAMESPACE)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Returns `true` if the two headers differ in any column, its position
    /// or its metadata.
    pub fn diff(&self, other: &Self) -> bool { self != other }

    /// Builds the header of a label projection: the identity columns at
    /// `cols` followed by one plain column per label key.
    #[must_use]
    pub fn labelize(&self, cols: &[usize], keys: &[String]) -> Self {
        cols.iter()
            .filter_map(|&idx| self.0.get(idx).cloned())
            .chain(keys.iter().map(HeaderColumn::new))
            .collect()
    }
}

impl FromIterator<HeaderColumn> for Header {
    fn from_iter<I: IntoIterator<Item = HeaderColumn>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Header {
    type IntoIter = slice::Iter<'a, HeaderColumn>;
    type Item = &'a HeaderColumn;

    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod_header() -> Header {
        Header::new(vec![
            HeaderColumn::new("NAMESPACE"),
            HeaderColumn::new("NAME"),
            HeaderColumn::new("STATUS"),
            HeaderColumn::metric("CPU"),
            HeaderColumn::new("IP").wide(),
            HeaderColumn::time("AGE"),
        ])
    }

    #[test]
    fn test_index_of_wide() {
        let header = pod_header();
        assert_eq!(header.index_of("NAME", false), Some(1));
        assert_eq!(header.index_of("IP", false), None);
        assert_eq!(header.index_of("IP", true), Some(4));
        assert_eq!(header.index_of("name", true), None);
    }

    #[test]
    fn test_column_names() {
        let header = pod_header();
        assert_eq!(header.column_names(false), vec!["NAMESPACE", "NAME", "STATUS", "CPU", "AGE"]);
        assert_eq!(header.column_names(true).len(), 6);
    }

    #[test]
    fn test_filter_col_indices() {
        let header = pod_header();
        let namespaced = header.filter_col_indices("default", true);
        assert_eq!(namespaced, HashSet::from([1, 2, 4]));

        let all = header.filter_col_indices("", true);
        assert_eq!(all, HashSet::from([0, 1, 2, 4]));

        let narrow = header.filter_col_indices("", false);
        assert_eq!(narrow, HashSet::from([0, 1, 2]));
    }

    #[test]
    fn test_diff() {
        let header = pod_header();
        assert!(!header.diff(&header.clone()));

        let mut retyped = pod_header();
        retyped.0[3].role = ColumnRole::Capacity;
        assert!(header.diff(&retyped));

        let mut reordered = pod_header();
        reordered.0.swap(0, 1);
        assert!(header.diff(&reordered));
    }

    #[test]
    fn test_labelize() {
        let header = pod_header();
        let labelized = header.labelize(&[0, 1], &["app".to_string(), "tier".to_string()]);
        assert_eq!(labelized.column_names(true), vec!["NAMESPACE", "NAME", "app", "tier"]);
    }
}
