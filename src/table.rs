//! Column-named tables for features and labels
//!
//! Storage is column-major: feature functions produce whole columns and the
//! boosting backends bin one column at a time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{Result, VaepError};

/// A named column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column<T> {
    pub name: String,
    pub values: Vec<T>,
}

/// A table with a fixed number of rows and uniquely named columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table<T> {
    n_rows: usize,
    columns: Vec<Column<T>>,
}

/// Game-state features, one row per action
pub type FeatureTable = Table<f64>;

/// Binary labels, one row per action
pub type LabelTable = Table<bool>;

impl<T: Clone> Table<T> {
    /// An empty table with `n_rows` rows and no columns
    pub fn new(n_rows: usize) -> Self {
        Table {
            n_rows,
            columns: Vec::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn columns(&self) -> &[Column<T>] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[T]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Add a column at the right edge of the table
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<T>) -> Result<()> {
        let name = name.into();
        if values.len() != self.n_rows {
            return Err(VaepError::ShapeMismatch {
                what: format!("column {}", name),
                expected: self.n_rows,
                actual: values.len(),
            });
        }
        if self.has_column(&name) {
            return Err(VaepError::InvalidParameter(format!(
                "duplicate column {}",
                name
            )));
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    /// Concatenate the columns of `other` to the right of this table
    pub fn hstack(&mut self, other: Table<T>) -> Result<()> {
        if other.n_rows != self.n_rows {
            return Err(VaepError::ShapeMismatch {
                what: "stacked table".to_string(),
                expected: self.n_rows,
                actual: other.n_rows,
            });
        }
        for column in other.columns {
            self.push_column(column.name, column.values)?;
        }
        Ok(())
    }

    /// Append the rows of `other`, which must have the same columns in the same order
    pub fn append(&mut self, other: Table<T>) -> Result<()> {
        if self.columns.is_empty() && self.n_rows == 0 {
            *self = other;
            return Ok(());
        }
        if self.column_names() != other.column_names() {
            return Err(VaepError::InvalidParameter(
                "appended table has different columns".to_string(),
            ));
        }
        self.n_rows += other.n_rows;
        for (mine, theirs) in self.columns.iter_mut().zip(other.columns) {
            mine.values.extend(theirs.values);
        }
        Ok(())
    }

    /// Names from `names` that this table lacks, in the order given
    pub fn missing_columns(&self, names: &[String]) -> Vec<String> {
        let present: HashSet<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        names
            .iter()
            .filter(|n| !present.contains(n.as_str()))
            .cloned()
            .collect()
    }

    /// A table holding only `names`, in that order
    pub fn select(&self, names: &[String]) -> Result<Self> {
        let missing = self.missing_columns(names);
        if !missing.is_empty() {
            return Err(VaepError::MissingFeatures(missing));
        }
        let columns = names
            .iter()
            .filter_map(|n| self.columns.iter().find(|c| &c.name == n).cloned())
            .collect();
        Ok(Table {
            n_rows: self.n_rows,
            columns,
        })
    }

    /// A table holding the rows at `indices`, in that order
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: indices.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        Table {
            n_rows: indices.len(),
            columns,
        }
    }
}
