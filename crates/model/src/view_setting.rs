use serde::{Deserialize, Serialize};

use crate::{
    error::{self, Error},
    sort::SortColumn,
};

const SORT_ASCENDING: &str = "asc";

/// Persisted view preferences of one resource.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSetting {
    #[serde(default)]
    pub columns: Vec<String>,

    /// Sort column in the form `NAME:asc` or `AGE:desc`.
    #[serde(default)]
    pub sort_column: String,
}

impl ViewSetting {
    pub fn is_blank(&self) -> bool { self.columns.is_empty() && self.sort_column.is_empty() }

    /// Parses the persisted sort column. Any direction other than `asc`
    /// sorts descending.
    ///
    /// # Errors
    ///
    /// Fails when the value is empty or lacks a `:` separated direction.
    pub fn sort_col(&self) -> Result<SortColumn, Error> {
        match self.sort_column.split_once(':') {
            Some((name, direction)) if !name.trim().is_empty() => {
                Ok(SortColumn::new(name.trim(), direction.trim() == SORT_ASCENDING))
            }
            _ => error::InvalidSortColumnSnafu { value: self.sort_column.as_str() }.fail(),
        }
    }
}
