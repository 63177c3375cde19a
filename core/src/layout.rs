//! Grid layout and capacity planning
//!
//! A database of N equally sized blocks is arranged as rows x columns x
//! block size, independent of what the blocks contain. The layout also keeps
//! the length actually used in every block so padding can be told apart from
//! payload.

use serde::{Serialize, Deserialize};

use crate::error::{CoreError, Result};

/// Smallest perfect square that is `>= n`
pub fn next_square(n: usize) -> usize {
    let side = square_side(n);
    side * side
}

fn square_side(n: usize) -> usize {
    let mut side = (n as f64).sqrt() as usize;
    while side * side < n {
        side += 1;
    }
    while side > 0 && (side - 1) * (side - 1) >= n {
        side -= 1;
    }
    side
}

/// Plan the grid for `num_blocks` blocks
///
/// A square matrix rounds the block count up to the next perfect square and
/// returns equal sides, which lets a client address a cell with two
/// independent sqrt(N) queries. Otherwise every block lives in one row.
pub fn compute_rows_and_columns(num_blocks: usize, wants_square_matrix: bool) -> (usize, usize) {
    if wants_square_matrix {
        let side = square_side(num_blocks);
        (side, side)
    } else {
        (1, num_blocks)
    }
}

/// Geometry of a database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    num_rows: usize,
    num_columns: usize,
    block_size: usize,
    block_lengths: Vec<usize>,
}

impl GridLayout {
    /// Create a layout whose blocks are all unused
    pub fn new(num_rows: usize, num_columns: usize, block_size: usize) -> Self {
        GridLayout {
            num_rows,
            num_columns,
            block_size,
            block_lengths: vec![0; num_rows * num_columns],
        }
    }

    /// Create a layout whose blocks are all filled to `block_size`
    pub fn with_uniform_lengths(num_rows: usize, num_columns: usize, block_size: usize) -> Self {
        GridLayout {
            num_rows,
            num_columns,
            block_size,
            block_lengths: vec![block_size; num_rows * num_columns],
        }
    }

    /// Create a layout with every block filled to `block_length`, which may
    /// be smaller than the cell size
    pub fn with_block_length(
        num_rows: usize,
        num_columns: usize,
        block_size: usize,
        block_length: usize,
    ) -> Result<Self> {
        if block_length > block_size {
            return Err(CoreError::InvalidArgument(format!(
                "block length {} exceeds block size {}",
                block_length, block_size
            )));
        }
        Ok(GridLayout {
            num_rows,
            num_columns,
            block_size,
            block_lengths: vec![block_length; num_rows * num_columns],
        })
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of blocks per row
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Size of one block in layout units
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Used length of every block
    pub fn block_lengths(&self) -> &[usize] {
        &self.block_lengths
    }

    /// Number of logical blocks
    pub fn num_blocks(&self) -> usize {
        self.num_rows * self.num_columns
    }

    /// Total allocated units
    pub fn capacity(&self) -> usize {
        self.num_rows * self.num_columns * self.block_size
    }

    /// Units actually holding payload
    pub fn used_capacity(&self) -> usize {
        self.block_lengths.iter().sum()
    }

    /// Units in one row
    pub fn row_size(&self) -> usize {
        self.num_columns * self.block_size
    }

    /// Flat index of the block at `(row, column)`
    pub fn block_index(&self, row: usize, column: usize) -> Result<usize> {
        if row >= self.num_rows || column >= self.num_columns {
            return Err(CoreError::InvalidArgument(format!(
                "cell ({}, {}) outside {}x{} grid",
                row, column, self.num_rows, self.num_columns
            )));
        }
        Ok(row * self.num_columns + column)
    }

    /// `(row, column)` of a flat block index
    pub fn position(&self, block: usize) -> Result<(usize, usize)> {
        if block >= self.num_blocks() {
            return Err(CoreError::InvalidArgument(format!(
                "block {} outside grid of {} blocks",
                block,
                self.num_blocks()
            )));
        }
        Ok((block / self.num_columns, block % self.num_columns))
    }

    /// Used length of a block
    pub fn block_length(&self, block: usize) -> Option<usize> {
        self.block_lengths.get(block).copied()
    }

    /// Record the used length of a block
    pub fn set_block_length(&mut self, block: usize, length: usize) -> Result<()> {
        if length > self.block_size {
            return Err(CoreError::InvalidArgument(format!(
                "block length {} exceeds block size {}",
                length, self.block_size
            )));
        }
        let num_blocks = self.num_blocks();
        let slot = self.block_lengths.get_mut(block).ok_or_else(|| {
            CoreError::InvalidArgument(format!("block {} outside grid of {} blocks", block, num_blocks))
        })?;
        *slot = length;
        Ok(())
    }

    /// Check the layout's internal invariants
    pub fn validate(&self) -> Result<()> {
        if self.block_lengths.len() != self.num_blocks() {
            return Err(CoreError::InvalidArgument(format!(
                "{} block lengths for {} blocks",
                self.block_lengths.len(),
                self.num_blocks()
            )));
        }
        if let Some(length) = self.block_lengths.iter().find(|&&l| l > self.block_size) {
            return Err(CoreError::InvalidArgument(format!(
                "block length {} exceeds block size {}",
                length, self.block_size
            )));
        }
        Ok(())
    }
}
