//! Numeric attribute tables keyed by spatial unit id.
//!
//! The on-disk schema is `[unit_id] + [attribute columns...]`. Cells that
//! are empty or unparseable read back as NaN and NaN writes out as an
//! empty cell, so a round-trip preserves missingness without inventing
//! sentinel values.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::AggregateError;

/// A numeric table with one row per spatial unit.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeTable {
    id_column: String,
    columns: Vec<String>,
    ids: Vec<String>,
    /// Row-major values; `values[row][col]` aligns with `columns`.
    values: Vec<Vec<f64>>,
    /// Mirror of `ids` for O(log n) duplicate detection on insert.
    seen: BTreeSet<String>,
}

impl AttributeTable {
    /// Creates an empty table with the given id column and attribute
    /// columns.
    #[must_use]
    pub fn new(id_column: &str, columns: Vec<String>) -> Self {
        Self {
            id_column: id_column.to_string(),
            columns,
            ids: Vec::new(),
            values: Vec::new(),
            seen: BTreeSet::new(),
        }
    }

    /// Appends one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the value count does not match the column count
    /// or the id already exists in the table.
    pub fn push_row(&mut self, id: &str, row: Vec<f64>) -> Result<(), AggregateError> {
        if row.len() != self.columns.len() {
            return Err(AggregateError::RowWidth {
                id: id.to_string(),
                got: row.len(),
                expected: self.columns.len(),
            });
        }
        if !self.seen.insert(id.to_string()) {
            return Err(AggregateError::DuplicateId { id: id.to_string() });
        }
        self.ids.push(id.to_string());
        self.values.push(row);
        Ok(())
    }

    /// Name of the id column.
    #[must_use]
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Attribute column names, in table order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Unit ids, in row order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Index of an attribute column.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// One row's values, aligned with [`Self::columns`].
    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row]
    }

    /// All values of one column, in row order.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::MissingColumn`] if the column does not
    /// exist.
    pub fn column_values(&self, column: &str) -> Result<Vec<f64>, AggregateError> {
        let index = self
            .column_index(column)
            .ok_or_else(|| AggregateError::MissingColumn {
                column: column.to_string(),
            })?;
        Ok(self.values.iter().map(|row| row[index]).collect())
    }

    /// Reads a table from CSV, keyed by `id_column`.
    ///
    /// Every column other than the id column becomes a numeric attribute
    /// column; empty or unparseable cells become NaN.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the id column is
    /// missing, or a unit id repeats.
    pub fn from_csv_path(path: &Path, id_column: &str) -> Result<Self, AggregateError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(AggregateError::Csv)?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let id_index =
            headers
                .iter()
                .position(|h| h == id_column)
                .ok_or_else(|| AggregateError::MissingIdColumn {
                    column: id_column.to_string(),
                })?;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != id_index)
            .map(|(_, h)| h.clone())
            .collect();

        let mut table = Self::new(id_column, columns);
        for record in reader.records() {
            let record = record?;
            let id = record.get(id_index).unwrap_or("").trim().to_string();
            let row: Vec<f64> = record
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != id_index)
                .map(|(_, cell)| parse_cell(cell))
                .collect();
            table.push_row(&id, row)?;
        }

        log::debug!(
            "Read {} rows x {} columns from {}",
            table.len(),
            table.columns().len(),
            path.display()
        );
        Ok(table)
    }

    /// Writes the table as CSV with the `[unit_id] + [attributes...]`
    /// schema. NaN cells are written empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn to_csv_path(&self, path: &Path) -> Result<(), AggregateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AggregateError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let mut writer = csv::Writer::from_path(path).map_err(AggregateError::Csv)?;
        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(self.id_column.clone());
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;

        for (id, row) in self.ids.iter().zip(&self.values) {
            let mut record = Vec::with_capacity(row.len() + 1);
            record.push(id.clone());
            for value in row {
                record.push(if value.is_nan() {
                    String::new()
                } else {
                    format!("{value}")
                });
            }
            writer.write_record(&record)?;
        }

        writer.flush().map_err(|e| AggregateError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }

    /// Returns a new table with only the named columns, in the given
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::MissingColumn`] for an unknown column.
    pub fn select(&self, columns: &[String]) -> Result<Self, AggregateError> {
        let mut indexes = Vec::with_capacity(columns.len());
        for column in columns {
            indexes.push(self.column_index(column).ok_or_else(|| {
                AggregateError::MissingColumn {
                    column: column.clone(),
                }
            })?);
        }

        Ok(Self {
            id_column: self.id_column.clone(),
            columns: columns.to_vec(),
            ids: self.ids.clone(),
            values: self
                .values
                .iter()
                .map(|row| indexes.iter().map(|&i| row[i]).collect())
                .collect(),
            seen: self.seen.clone(),
        })
    }

    /// Inner-joins another table on unit id, keeping this table's row
    /// order and appending the other table's columns.
    ///
    /// # Errors
    ///
    /// Returns an error on column name collisions or duplicate ids in the
    /// other table.
    pub fn join(&self, other: &Self) -> Result<Self, AggregateError> {
        for column in &other.columns {
            if self.columns.contains(column) {
                return Err(AggregateError::DuplicateColumn {
                    column: column.clone(),
                });
            }
        }

        let mut other_rows: BTreeMap<&str, &Vec<f64>> = BTreeMap::new();
        for (id, row) in other.ids.iter().zip(&other.values) {
            if other_rows.insert(id.as_str(), row).is_some() {
                return Err(AggregateError::DuplicateId { id: id.clone() });
            }
        }

        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());

        let mut ids = Vec::new();
        let mut values = Vec::new();
        for (id, row) in self.ids.iter().zip(&self.values) {
            if let Some(other_row) = other_rows.get(id.as_str()) {
                let mut joined = row.clone();
                joined.extend_from_slice(other_row);
                ids.push(id.clone());
                values.push(joined);
            }
        }

        let seen = ids.iter().cloned().collect();
        Ok(Self {
            id_column: self.id_column.clone(),
            columns,
            ids,
            values,
            seen,
        })
    }
}

/// Parses one CSV cell; empty or unparseable cells become NaN.
fn parse_cell(cell: &str) -> f64 {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        f64::NAN
    } else {
        trimmed.parse().unwrap_or(f64::NAN)
    }
}
