//! Renders a [`TableData`] into a plain-text table.

use comfy_table::{Cell, ContentArrangement};
use kestrel_model::{Header, TableData};

/// Suffix appended to cells that changed since the previous snapshot.
const CHANGED_MARKER: char = '*';

pub trait TableDataExt {
    /// Renders the rows in their current order.
    ///
    /// With `columns` set, only those columns are shown, in that order;
    /// unknown names are skipped. Otherwise every column is shown, wide
    /// columns only when `wide` is set.
    fn render_table(&self, columns: &[String], wide: bool) -> String;
}

impl TableDataExt for TableData {
    fn render_table(&self, columns: &[String], wide: bool) -> String {
        let header = self.header();
        let indices = visible_columns(&header, columns, wide);

        let mut rows = Vec::with_capacity(self.row_count());
        self.range(|_, event| {
            let cells = indices
                .iter()
                .map(|&idx| {
                    let value = event.row.field(idx).unwrap_or_default();
                    if event.deltas.is_changed(idx) {
                        Cell::new(format!("{value}{CHANGED_MARKER}"))
                    } else {
                        Cell::new(value)
                    }
                })
                .collect::<Vec<_>>();
            rows.push(cells);
            true
        });

        comfy_table::Table::new()
            .load_preset(comfy_table::presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(indices.iter().filter_map(|&idx| header.get(idx)).map(|col| col.name.as_str()))
            .add_rows(rows)
            .to_string()
    }
}

fn visible_columns(header: &Header, columns: &[String], wide: bool) -> Vec<usize> {
    if columns.is_empty() {
        header.iter().enumerate().filter(|(_, col)| wide || !col.wide).map(|(idx, _)| idx).collect()
    } else {
        columns.iter().filter_map(|name| header.index_of(name, true)).collect()
    }
}
