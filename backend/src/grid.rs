//! Tab/Row/Column placement shared by attribute descriptors, custom fields
//! and the property detail view.

use std::fmt;

use thiserror::Error;

/// Number of tabs every grid is rendered with.
pub const TAB_COUNT: i32 = 3;
/// Minimum rows shown per tab.
pub const DISPLAY_ROWS: i32 = 5;
/// Minimum columns shown per row.
pub const DISPLAY_COLUMNS: i32 = 2;
/// Largest row a tab is laid out densely up to.
pub const DENSE_ROWS: i32 = 50;
/// Largest column a tab is laid out densely up to.
pub const DENSE_COLUMNS: i32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPosition {
    pub tab: i32,
    pub row: i32,
    pub column: i32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("Tab number must be 1, 2, or 3")]
    InvalidTab(i32),
    #[error("Row number must be a positive integer")]
    InvalidRow(i32),
    #[error("Column number must be a positive integer")]
    InvalidColumn(i32),
    #[error("A field already exists at {0}. Please choose a different position.")]
    Occupied(GridPosition),
}

impl GridPosition {
    pub fn new(tab: i32, row: i32, column: i32) -> Result<Self, GridError> {
        validate_tab(tab)?;
        if row < 1 {
            return Err(GridError::InvalidRow(row));
        }
        if column < 1 {
            return Err(GridError::InvalidColumn(column));
        }
        Ok(Self { tab, row, column })
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tab {}, Row {}, Column {}", self.tab, self.row, self.column)
    }
}

pub fn validate_tab(tab: i32) -> Result<(), GridError> {
    if (1..=TAB_COUNT).contains(&tab) {
        Ok(())
    } else {
        Err(GridError::InvalidTab(tab))
    }
}

/// Rejects a write to `position` when another row already sits there.
///
/// `occupant` is the id found at the cell, `writing` the id of the row being
/// updated (absent for inserts). A row may always keep its own cell.
pub fn ensure_vacant(
    position: GridPosition,
    occupant: Option<i32>,
    writing: Option<i32>,
) -> Result<(), GridError> {
    match occupant {
        Some(id) if Some(id) != writing => Err(GridError::Occupied(position)),
        _ => Ok(()),
    }
}
