//! Row-grouped sparse transition matrix
//!
//! Rows of the matrix correspond to choices, and the rows of a state are
//! stored consecutively as one row group. A deterministic model has exactly
//! one row per group, a nondeterministic model may have several.

use std::ops::Range;

use crate::probability::Probability;

/// Non-zero entry of a [`SparseMatrix`]
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixEntry {
    column: usize,
    value: Probability,
}

impl MatrixEntry {
    /// Create a new entry
    pub fn new(column: usize, value: Probability) -> Self {
        Self { column, value }
    }

    /// Target state of the transition
    pub fn column(&self) -> usize {
        self.column
    }

    /// Probability of the transition
    pub fn value(&self) -> &Probability {
        &self.value
    }
}

/// Sparse matrix with row grouping
///
/// Use the [`SparseMatrixBuilder`] to construct a matrix. Once built the
/// matrix cannot be modified.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseMatrix {
    /// `row_group_indices[g]..row_group_indices[g + 1]` are the rows of group `g`
    row_group_indices: Vec<usize>,
    /// `row_indices[r]..row_indices[r + 1]` are the entries of row `r`
    row_indices: Vec<usize>,
    entries: Vec<MatrixEntry>,
}

impl SparseMatrix {
    /// Number of row groups, i.e., states
    pub fn nr_row_groups(&self) -> usize {
        self.row_group_indices.len().saturating_sub(1)
    }

    /// Number of rows, i.e., choices
    pub fn nr_rows(&self) -> usize {
        self.row_indices.len().saturating_sub(1)
    }

    /// Number of non-zero entries, i.e., transitions
    pub fn nr_entries(&self) -> usize {
        self.entries.len()
    }

    /// Rows belonging to the given row group
    ///
    /// Panics if the group does not exist.
    pub fn row_group(&self, group: usize) -> Range<usize> {
        self.row_group_indices[group]..self.row_group_indices[group + 1]
    }

    /// Entries of the given row
    ///
    /// Panics if the row does not exist.
    pub fn row(&self, row: usize) -> &[MatrixEntry] {
        &self.entries[self.row_indices[row]..self.row_indices[row + 1]]
    }

    /// Range of indices into the entry list covered by the given row
    pub fn row_entry_range(&self, row: usize) -> Range<usize> {
        self.row_indices[row]..self.row_indices[row + 1]
    }

    /// Check whether every row group consists of exactly one row
    pub fn has_trivial_row_grouping(&self) -> bool {
        self.row_group_indices.windows(2).all(|w| w[1] - w[0] == 1)
    }

    /// Iterate over all entries as `(row group, local row, entry)`
    pub fn iter_entries(&self) -> impl Iterator<Item = (usize, usize, &MatrixEntry)> {
        (0..self.nr_row_groups()).flat_map(move |group| {
            let first_row = self.row_group_indices[group];
            self.row_group(group).flat_map(move |row| {
                self.row(row)
                    .iter()
                    .map(move |entry| (group, row - first_row, entry))
            })
        })
    }

    /// Index of the entry `(group, local row, column)` in the entry list
    pub fn entry_index(&self, group: usize, local_row: usize, column: usize) -> Option<usize> {
        if group >= self.nr_row_groups() {
            return None;
        }
        let rows = self.row_group(group);
        let row = rows.start + local_row;
        if row >= rows.end {
            return None;
        }
        let range = self.row_entry_range(row);
        self.entries[range.clone()]
            .binary_search_by_key(&column, |e| e.column)
            .ok()
            .map(|i| range.start + i)
    }
}

/// Builder for a [`SparseMatrix`]
///
/// Groups and rows have to be added in order. Entries of a row must be added
/// with strictly increasing columns.
///
/// # Example
///
/// ```
/// use pmc_model::sparse_matrix::SparseMatrixBuilder;
/// use pmc_model::probability::Probability;
///
/// let mut builder = SparseMatrixBuilder::new();
/// builder.new_row_group();
/// builder.new_row();
/// builder.add_entry(1, Probability::Constant(0.5));
/// builder.add_entry(2, Probability::Constant(0.5));
///
/// let matrix = builder.build();
/// assert_eq!(matrix.nr_row_groups(), 1);
/// assert_eq!(matrix.nr_entries(), 2);
/// ```
#[derive(Debug, Default)]
pub struct SparseMatrixBuilder {
    row_group_indices: Vec<usize>,
    row_indices: Vec<usize>,
    entries: Vec<MatrixEntry>,
}

impl SparseMatrixBuilder {
    /// Create a builder for an empty matrix
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new row group, following rows belong to it
    pub fn new_row_group(&mut self) {
        self.row_group_indices.push(self.row_indices.len());
    }

    /// Open a new row in the current row group
    pub fn new_row(&mut self) {
        debug_assert!(
            !self.row_group_indices.is_empty(),
            "Row added before the first row group"
        );
        self.row_indices.push(self.entries.len());
    }

    /// Add an entry to the current row
    pub fn add_entry(&mut self, column: usize, value: Probability) {
        debug_assert!(!self.row_indices.is_empty(), "Entry added before first row");
        debug_assert!(
            self.entries.len() == *self.row_indices.last().unwrap_or(&0)
                || self.entries.last().is_none_or(|e| e.column < column),
            "Columns of a row must be strictly increasing"
        );
        self.entries.push(MatrixEntry::new(column, value));
    }

    /// Finalize the matrix
    pub fn build(mut self) -> SparseMatrix {
        self.row_indices.push(self.entries.len());
        self.row_group_indices.push(self.row_indices.len() - 1);

        SparseMatrix {
            row_group_indices: self.row_group_indices,
            row_indices: self.row_indices,
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_state_mdp() -> SparseMatrix {
        let mut builder = SparseMatrixBuilder::new();
        // state 0: two choices
        builder.new_row_group();
        builder.new_row();
        builder.add_entry(0, Probability::Constant(0.5));
        builder.add_entry(1, Probability::Constant(0.5));
        builder.new_row();
        builder.add_entry(1, Probability::Constant(1.0));
        // state 1: self loop
        builder.new_row_group();
        builder.new_row();
        builder.add_entry(1, Probability::Constant(1.0));
        builder.build()
    }

    #[test]
    fn test_dimensions() {
        let matrix = two_state_mdp();
        assert_eq!(matrix.nr_row_groups(), 2);
        assert_eq!(matrix.nr_rows(), 3);
        assert_eq!(matrix.nr_entries(), 4);
        assert_eq!(matrix.row_group(0), 0..2);
        assert_eq!(matrix.row_group(1), 2..3);
        assert!(!matrix.has_trivial_row_grouping());
        assert_eq!(matrix.row(1), &[MatrixEntry::new(1, Probability::Constant(1.0))]);
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = SparseMatrixBuilder::new().build();
        assert_eq!(matrix.nr_row_groups(), 0);
        assert_eq!(matrix.nr_rows(), 0);
        assert_eq!(matrix.nr_entries(), 0);
        assert!(matrix.has_trivial_row_grouping());
        assert_eq!(matrix.iter_entries().count(), 0);
    }

    #[test]
    fn test_iter_entries() {
        let matrix = two_state_mdp();
        let entries = matrix
            .iter_entries()
            .map(|(s, c, e)| (s, c, e.column()))
            .collect::<Vec<_>>();
        assert_eq!(entries, vec![(0, 0, 0), (0, 0, 1), (0, 1, 1), (1, 0, 1)]);
    }

    #[test]
    fn test_entry_index() {
        let matrix = two_state_mdp();
        assert_eq!(matrix.entry_index(0, 0, 1), Some(1));
        assert_eq!(matrix.entry_index(0, 1, 1), Some(2));
        assert_eq!(matrix.entry_index(1, 0, 1), Some(3));
        assert_eq!(matrix.entry_index(1, 1, 1), None);
        assert_eq!(matrix.entry_index(0, 1, 0), None);
        assert_eq!(matrix.entry_index(2, 0, 0), None);
    }
}
