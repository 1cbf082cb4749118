//! Contingency tables (category × source)

use anyhow::{ensure, Result};
use std::collections::BTreeMap;

/// Dense count matrix, row-major. Rows are categories, columns are sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContingencyTable {
    labels: Vec<String>,
    cells: Vec<Vec<u64>>,
    cols: usize,
}

impl ContingencyTable {
    /// Build from explicit rows. All rows must have the same width.
    pub fn from_rows(rows: Vec<Vec<u64>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        ensure!(
            rows.iter().all(|r| r.len() == cols),
            "contingency rows have mismatched widths"
        );
        let labels = (0..rows.len()).map(|i| i.to_string()).collect();
        Ok(Self {
            labels,
            cells: rows,
            cols,
        })
    }

    /// Align two category-count mappings on the union of their keys.
    /// Categories missing on one side count as zero.
    pub fn from_count_maps(left: &[(String, u64)], right: &[(String, u64)]) -> Self {
        let mut aligned: BTreeMap<&str, [u64; 2]> = BTreeMap::new();
        for (key, count) in left {
            aligned.entry(key.as_str()).or_default()[0] += count;
        }
        for (key, count) in right {
            aligned.entry(key.as_str()).or_default()[1] += count;
        }

        let (labels, cells) = aligned
            .into_iter()
            .map(|(key, pair)| (key.to_string(), pair.to_vec()))
            .unzip();

        Self {
            labels,
            cells,
            cols: 2,
        }
    }

    /// Pair two equal-length count vectors (e.g. histogram buckets).
    pub fn from_columns(left: &[u64], right: &[u64]) -> Result<Self> {
        ensure!(
            left.len() == right.len(),
            "column lengths differ ({} vs {})",
            left.len(),
            right.len()
        );
        let rows = left
            .iter()
            .zip(right)
            .map(|(&l, &r)| vec![l, r])
            .collect();
        let mut table = Self::from_rows(rows)?;
        table.cols = 2;
        Ok(table)
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.cells[row][col]
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().flatten().sum()
    }

    pub fn row_totals(&self) -> Vec<u64> {
        self.cells.iter().map(|r| r.iter().sum()).collect()
    }

    pub fn col_totals(&self) -> Vec<u64> {
        (0..self.cols)
            .map(|c| self.cells.iter().map(|r| r[c]).sum())
            .collect()
    }

    /// Column `col`, or `None` if the table is narrower than that.
    pub fn column(&self, col: usize) -> Option<Vec<u64>> {
        (col < self.cols).then(|| self.cells.iter().map(|r| r[col]).collect())
    }

    /// Whether the first two columns match element-wise.
    /// `None` when the table has fewer than two columns.
    pub fn first_columns_identical(&self) -> Option<bool> {
        (self.cols >= 2).then(|| self.cells.iter().all(|r| r[0] == r[1]))
    }

    /// Drop rows and columns whose totals are zero.
    pub fn without_empty_lines(&self) -> Self {
        let keep_cols: Vec<usize> = self
            .col_totals()
            .iter()
            .enumerate()
            .filter(|(_, &t)| t > 0)
            .map(|(c, _)| c)
            .collect();

        let (labels, cells) = self
            .labels
            .iter()
            .zip(&self.cells)
            .filter(|(_, row)| row.iter().any(|&v| v > 0))
            .map(|(label, row)| {
                (
                    label.clone(),
                    keep_cols.iter().map(|&c| row[c]).collect::<Vec<_>>(),
                )
            })
            .unzip();

        Self {
            labels,
            cells,
            cols: keep_cols.len(),
        }
    }
}
