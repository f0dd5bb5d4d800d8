use snafu::Snafu;

use crate::render::RenderError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Expecting a {expected} but got a {actual}"))]
    ShapeMismatch { expected: &'static str, actual: &'static str },

    #[snafu(display("Failed to hydrate {resource}, error: {source}"))]
    Hydrate { resource: String, source: RenderError },

    #[snafu(display("No data found for resource {resource}"))]
    NoData { resource: String },

    #[snafu(display(
        "Namespace of {resource} changed from {rendered:?} to {current:?} while rendering"
    ))]
    NamespaceChanged { resource: String, rendered: String, current: String },

    #[snafu(display("Row {id} is not found"))]
    RowNotFound { id: String },

    #[snafu(display("Row index {index} is out of range, table holds {len} rows"))]
    IndexOutOfRange { index: usize, len: usize },

    #[snafu(display("Row {id} already exists at another position"))]
    DuplicateRow { id: String },

    #[snafu(display("Invalid sort column {value:?}, expecting col-name:asc|desc"))]
    InvalidSortColumn { value: String },
}
