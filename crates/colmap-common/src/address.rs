//! Sheet-qualified column range rendering.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use crate::coord::{COL_MAX, ROW_MAX, column_to_letters};

/// Errors that can occur while constructing a [`ColumnRange`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ColumnRangeError {
    /// Row numbers are 1-based; zero is not addressable.
    ZeroRow,
    /// Start row was below the end row.
    RangeOrder,
    /// Column index beyond `XFD`.
    ColumnOverflow(u32),
    /// Row number beyond the last worksheet row.
    RowOverflow(u32),
}

impl fmt::Display for ColumnRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRangeError::ZeroRow => write!(f, "row numbers must be 1-based (>= 1)"),
            ColumnRangeError::RangeOrder => {
                write!(f, "range must be ordered so the start row is above the end row")
            }
            ColumnRangeError::ColumnOverflow(col) => {
                write!(f, "column index {col} exceeds the last worksheet column")
            }
            ColumnRangeError::RowOverflow(row) => {
                write!(f, "row {row} exceeds the last worksheet row")
            }
        }
    }
}

impl Error for ColumnRangeError {}

/// Quote a sheet name for use in a range reference, doubling embedded quotes.
///
/// Names are always quoted, even when Excel would accept them bare, so the
/// output does not depend on the character set of the name.
pub fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Absolute single-column range on a named sheet, e.g. `'Sales Data'!C2:C500`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ColumnRange<'a> {
    pub sheet: Cow<'a, str>,
    /// 0-based column index.
    pub column: u32,
    /// 1-based first row.
    pub start_row: u32,
    /// 1-based last row, inclusive.
    pub end_row: u32,
}

impl<'a> ColumnRange<'a> {
    pub fn new(
        sheet: impl Into<Cow<'a, str>>,
        column: u32,
        start_row: u32,
        end_row: u32,
    ) -> Result<Self, ColumnRangeError> {
        if start_row == 0 || end_row == 0 {
            return Err(ColumnRangeError::ZeroRow);
        }
        if start_row > end_row {
            return Err(ColumnRangeError::RangeOrder);
        }
        if column > COL_MAX {
            return Err(ColumnRangeError::ColumnOverflow(column));
        }
        if end_row > ROW_MAX {
            return Err(ColumnRangeError::RowOverflow(end_row));
        }
        Ok(Self {
            sheet: sheet.into(),
            column,
            start_row,
            end_row,
        })
    }
}

impl fmt::Display for ColumnRange<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letters = column_to_letters(self.column);
        write!(
            f,
            "{}!{letters}{}:{letters}{}",
            quote_sheet_name(&self.sheet),
            self.start_row,
            self.end_row
        )
    }
}
