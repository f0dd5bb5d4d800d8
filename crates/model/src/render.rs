//! Hydration of fetched API objects into rows.

use std::{any, convert::Infallible};

use kestrel_base::{consts::columns, namespace};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::{ResultExt, Snafu};

use crate::{
    error::{self, Error},
    header::{Header, HeaderColumn},
    row::Row,
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RenderError {
    #[snafu(display("Field {field} is missing"))]
    MissingField { field: String },

    #[snafu(display("Row holds {actual} cells but the table defines {expected} columns"))]
    CellCountMismatch { expected: usize, actual: usize },

    #[snafu(display("Renderer {renderer} does not render server-side tables"))]
    UnsupportedTable { renderer: &'static str },
}

impl RenderError {
    pub fn missing_field(field: impl Into<String>) -> Self { MissingFieldSnafu { field }.build() }
}

/// A fetched object: either a typed API object or a server-side table.
#[derive(Clone, Debug)]
pub enum RawObject<T> {
    Object(T),
    Table(GenericTable),
}

impl<T> RawObject<T> {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Table(_) => "table",
        }
    }
}

/// Turns fetched objects of one resource kind into rows.
pub trait Renderer {
    type Object;

    /// Returns `true` if the renderer consumes server-side tables rather than
    /// typed objects.
    fn is_generic(&self) -> bool { false }

    fn header(&self, namespace: &str) -> Header;

    /// Renders one typed object into a row aligned with
    /// [`Renderer::header`].
    ///
    /// # Errors
    ///
    /// Fails when the object lacks a field the row is built from.
    fn render(&self, object: &Self::Object, namespace: &str) -> Result<Row, RenderError>;

    /// Renders every row of a server-side table.
    ///
    /// # Errors
    ///
    /// Typed renderers do not support tables and fail by default.
    fn render_table(&self, _table: &GenericTable, _namespace: &str) -> Result<Vec<Row>, RenderError> {
        UnsupportedTableSnafu { renderer: any::type_name::<Self>() }.fail()
    }
}

/// Hydrates `objects` with `renderer`. A generic renderer reads the first
/// object as a table; a typed renderer reads every object.
pub(crate) fn hydrate<R: Renderer>(
    renderer: &R,
    resource: &str,
    namespace: &str,
    objects: &[RawObject<R::Object>],
) -> Result<Vec<Row>, Error> {
    if renderer.is_generic() {
        return match objects.first() {
            None => Ok(Vec::new()),
            Some(RawObject::Table(table)) => {
                renderer.render_table(table, namespace).context(error::HydrateSnafu { resource })
            }
            Some(other) => {
                error::ShapeMismatchSnafu { expected: "table", actual: other.kind() }.fail()
            }
        };
    }

    objects
        .iter()
        .map(|object| match object {
            RawObject::Object(object) => {
                renderer.render(object, namespace).context(error::HydrateSnafu { resource })
            }
            RawObject::Table(_) => {
                error::ShapeMismatchSnafu { expected: "object", actual: "table" }.fail()
            }
        })
        .collect()
}

/// The server-side table representation of a resource list.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericTable {
    #[serde(default)]
    pub column_definitions: Vec<TableColumnDefinition>,

    #[serde(default)]
    pub rows: Vec<TableRow>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumnDefinition {
    pub name: String,

    #[serde(default, rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub format: String,

    /// Columns with a priority above zero are only shown in wide mode.
    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub description: String,
}

impl TableColumnDefinition {
    fn is_time(&self) -> bool { self.format == "date" || self.name.eq_ignore_ascii_case("age") }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    #[serde(default)]
    pub cells: Vec<Value>,

    /// Object metadata attached to the row, when the server includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
}

impl TableRow {
    fn object_namespace(&self) -> Option<&str> {
        self.object.as_ref()?.pointer("/metadata/namespace")?.as_str()
    }
}

/// Renders server-side tables of any resource kind. The header follows the
/// column definitions of the last table rendered.
#[derive(Debug, Default)]
pub struct GenericRenderer {
    header: Mutex<Header>,
}

impl GenericRenderer {
    pub fn new() -> Self { Self::default() }

    fn table_header(table: &GenericTable, namespace: &str) -> Header {
        let ns_col = namespace::is_all_namespaces(namespace).then(|| HeaderColumn::new(columns::NAMESPACE));
        let cols = table.column_definitions.iter().map(|def| {
            let name = def.name.to_uppercase();
            let col = if def.is_time() { HeaderColumn::time(name) } else { HeaderColumn::new(name) };
            if def.priority > 0 { col.wide() } else { col }
        });
        ns_col.into_iter().chain(cols).collect()
    }
}

impl Renderer for GenericRenderer {
    type Object = Infallible;

    fn is_generic(&self) -> bool { true }

    fn header(&self, _namespace: &str) -> Header { self.header.lock().clone() }

    fn render(&self, object: &Self::Object, _namespace: &str) -> Result<Row, RenderError> {
        match *object {}
    }

    fn render_table(&self, table: &GenericTable, namespace: &str) -> Result<Vec<Row>, RenderError> {
        let all_namespaces = namespace::is_all_namespaces(namespace);
        let expected = table.column_definitions.len();
        let name_col = table
            .column_definitions
            .iter()
            .position(|def| def.name.eq_ignore_ascii_case(columns::NAME))
            .ok_or_else(|| RenderError::missing_field(columns::NAME))?;

        let rows = table
            .rows
            .iter()
            .map(|row| {
                if row.cells.len() != expected {
                    return CellCountMismatchSnafu { expected, actual: row.cells.len() }.fail();
                }
                let name = format_cell(&row.cells[name_col]);
                let ns = row.object_namespace().unwrap_or(if all_namespaces { "" } else { namespace });
                let cells = row.cells.iter().map(format_cell);
                let fields = if all_namespaces {
                    std::iter::once(ns.to_string()).chain(cells).collect::<Vec<_>>()
                } else {
                    cells.collect()
                };
                Ok(Row::new(namespace::fqn(ns, &name), fields))
            })
            .collect::<Result<Vec<_>, _>>()?;

        *self.header.lock() = Self::table_header(table, namespace);
        Ok(rows)
    }
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
