//! Fixed-size window over a larger row/column space.
//!
//! Rows are scenes and columns are tracks on the hardware grid. `height`
//! bounds the row axis, `width` the column axis. Every mutation re-clamps,
//! so after any call:
//!
//! - `row_offset <= max(0, total_rows - height)`
//! - `col_offset <= max(0, total_cols - width)`

use serde::{Deserialize, Serialize};

use crate::config::RingConfig;
use crate::error::{Result, SyncError};

/// Direction of a one-axis window move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Decode the navigation byte sent by the hardware.
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Direction::Left),
            1 => Some(Direction::Right),
            2 => Some(Direction::Up),
            3 => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            Direction::Left => 0,
            Direction::Right => 1,
            Direction::Up => 2,
            Direction::Down => 3,
        }
    }
}

/// Snapshot of the window geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub row_offset: usize,
    pub col_offset: usize,
    pub width: usize,
    pub height: usize,
}

/// The visible window and the extent it moves within.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    row_offset: usize,
    col_offset: usize,
    width: usize,
    height: usize,
    total_rows: usize,
    total_cols: usize,
}

impl Viewport {
    /// Create a window at offset (0, 0).
    pub fn new(width: usize, height: usize, total_rows: usize, total_cols: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SyncError::ZeroSizedWindow { width, height });
        }
        Ok(Self {
            row_offset: 0,
            col_offset: 0,
            width,
            height,
            total_rows,
            total_cols,
        })
    }

    pub fn from_config(config: &RingConfig, total_rows: usize, total_cols: usize) -> Result<Self> {
        Self::new(config.width, config.height, total_rows, total_cols)
    }

    /// Move the window the least distance that brings `(row, col)` into view.
    ///
    /// Returns whether the offsets changed.
    pub fn ensure_visible(&mut self, row: usize, col: usize) -> bool {
        let before = (self.row_offset, self.col_offset);

        if row < self.row_offset {
            self.row_offset = row;
        } else if row >= self.row_offset + self.height {
            self.row_offset = row - self.height + 1;
        }
        if col < self.col_offset {
            self.col_offset = col;
        } else if col >= self.col_offset + self.width {
            self.col_offset = col - self.width + 1;
        }

        self.clamp();
        before != (self.row_offset, self.col_offset)
    }

    /// Move `step` cells along one axis. Returns whether the offsets changed.
    pub fn shift(&mut self, direction: Direction, step: usize) -> bool {
        let before = (self.row_offset, self.col_offset);
        match direction {
            Direction::Left => self.col_offset = self.col_offset.saturating_sub(step),
            Direction::Right => self.col_offset = self.col_offset.saturating_add(step),
            Direction::Up => self.row_offset = self.row_offset.saturating_sub(step),
            Direction::Down => self.row_offset = self.row_offset.saturating_add(step),
        }
        self.clamp();
        before != (self.row_offset, self.col_offset)
    }

    /// Record a new extent and pull the window back inside it.
    ///
    /// Returns whether the offsets changed.
    pub fn resize_extent(&mut self, total_rows: usize, total_cols: usize) -> bool {
        let before = (self.row_offset, self.col_offset);
        self.total_rows = total_rows;
        self.total_cols = total_cols;
        self.clamp();
        before != (self.row_offset, self.col_offset)
    }

    fn clamp(&mut self) {
        self.row_offset = self.row_offset.min(self.max_row_offset());
        self.col_offset = self.col_offset.min(self.max_col_offset());
    }

    pub fn max_row_offset(&self) -> usize {
        self.total_rows.saturating_sub(self.height)
    }

    pub fn max_col_offset(&self) -> usize {
        self.total_cols.saturating_sub(self.width)
    }

    /// Whether the absolute cell lies inside the window and the extent.
    pub fn is_visible(&self, row: usize, col: usize) -> bool {
        row < self.total_rows
            && col < self.total_cols
            && (self.row_offset..self.row_offset + self.height).contains(&row)
            && (self.col_offset..self.col_offset + self.width).contains(&col)
    }

    /// Window-relative `(x, y)` of an absolute cell, `x` being the column.
    pub fn to_window_coords(&self, row: usize, col: usize) -> Option<(usize, usize)> {
        self.is_visible(row, col)
            .then(|| (col - self.col_offset, row - self.row_offset))
    }

    /// Absolute `(row, col)` of a window-relative cell.
    pub fn to_absolute(&self, x: usize, y: usize) -> Option<(usize, usize)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let (row, col) = (self.row_offset + y, self.col_offset + x);
        (row < self.total_rows && col < self.total_cols).then_some((row, col))
    }

    pub fn window(&self) -> Window {
        Window {
            row_offset: self.row_offset,
            col_offset: self.col_offset,
            width: self.width,
            height: self.height,
        }
    }

    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    pub fn col_offset(&self) -> usize {
        self.col_offset
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn total_cols(&self) -> usize {
        self.total_cols
    }
}
