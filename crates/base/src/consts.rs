//! Well-known names shared by the table engine and its renderers.

pub mod columns {
    //! Column names with special meaning to filtering, sorting and diffing.

    /// Namespace column, shown when a view spans every namespace.
    pub const NAMESPACE: &str = "NAMESPACE";

    /// Resource name column, the default sort key of namespaced views.
    pub const NAME: &str = "NAME";

    /// Combined `key=value,...` label column used for label projection.
    pub const LABELS: &str = "LABELS";

    /// Validation column; a non-empty cell marks a row carrying a warning.
    pub const VALID: &str = "VALID";

    /// Elapsed-time column. It ticks on every refresh, so redraw detection
    /// ignores it.
    pub const AGE: &str = "AGE";
}

/// Separator between the label pairs of a `LABELS` cell.
pub const LABEL_SEPARATOR: char = ',';

/// Separator between a label key and its value.
pub const LABEL_ASSIGN: char = '=';

/// Cell value rendered when a field is not available.
pub const NOT_AVAILABLE: &str = "n/a";

/// Cell value rendered when a quantity could not be computed.
pub const UNKNOWN: &str = "<unknown>";
