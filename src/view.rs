//! Display labels for tabular presentation.
//!
//! Serde field names are the machine format; this trait adds the human
//! column labels used by table renderers.

/// Column descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    /// Header shown to users.
    pub label: &'static str,
    /// Drop the column when every cell in it is empty.
    pub omit_empty: bool,
}

impl Column {
    /// Always shown column.
    pub const fn new(label: &'static str) -> Self {
        Self {
            label,
            omit_empty: false,
        }
    }

    /// Column hidden when empty.
    pub const fn omit_empty(label: &'static str) -> Self {
        Self {
            label,
            omit_empty: true,
        }
    }
}

/// A type that renders as one table row.
pub trait Tabular {
    /// Columns in display order.
    fn columns() -> &'static [Column]
    where
        Self: Sized;

    /// Cell text for each column, in the same order as [`Tabular::columns`].
    fn cells(&self) -> Vec<String>;
}

/// Header labels and cell rows for `items`, without omit-empty columns whose
/// cells are all empty.
pub fn table<T: Tabular>(items: &[T]) -> (Vec<&'static str>, Vec<Vec<String>>) {
    let columns = T::columns();
    let rows: Vec<Vec<String>> = items.iter().map(Tabular::cells).collect();
    let keep: Vec<bool> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| !col.omit_empty || rows.iter().any(|row| !row[i].is_empty()))
        .collect();
    let headers = columns
        .iter()
        .zip(&keep)
        .filter(|(_, keep)| **keep)
        .map(|(col, _)| col.label)
        .collect();
    let rows = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&keep)
                .filter(|(_, keep)| **keep)
                .map(|(cell, _)| cell)
                .collect()
        })
        .collect();
    (headers, rows)
}
