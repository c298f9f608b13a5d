//! Normalized in-memory row table shared by every component.

use serde::{Deserialize, Serialize};

/// Ordered records over a fixed, ordered column list.
///
/// Cells are kept as text; numeric columns (prices) are parsed on demand with
/// [`Record::get_u32`]. Handoffs between components move or clone the table,
/// nothing shares a mutable instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RowTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Table whose row width is fixed by the type, so no row can be rejected.
    pub fn from_fixed_rows<const N: usize>(columns: [String; N], rows: Vec<[String; N]>) -> Self {
        Self {
            columns: columns.into(),
            rows: rows.into_iter().map(Vec::from).collect(),
        }
    }

    /// Table with no columns and no rows, returned alongside non-found outcomes.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Appends a row. Returns the row back if its width does not match the header.
    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), Vec<String>> {
        if row.len() != self.columns.len() {
            return Err(row);
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |values| Record {
            columns: &self.columns,
            values,
        })
    }

    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|values| Record {
            columns: &self.columns,
            values,
        })
    }
}

/// Borrowed view of one row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [String],
}

impl<'a> Record<'a> {
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i].as_str())
    }

    pub fn get_u32(&self, column: &str) -> Option<u32> {
        self.get(column).and_then(|v| v.trim().parse().ok())
    }

    pub fn values(&self) -> &'a [String] {
        self.values
    }

    /// `(column, value)` pairs in column order.
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(c, v)| (c.as_str(), v.as_str()))
    }
}
