//! Cell coordinates.
//!
//! A `Position` identifies one cell in the grid. Positions are plain
//! (row, col) pairs; whether a cell actually exists there is the sheet's
//! business. Out-of-bounds positions can be constructed freely (the formula
//! parser produces them for references like `A99999`) and are rejected by
//! every public sheet operation and by the evaluator.

use serde::{Deserialize, Serialize};

/// Inclusive upper bounds of the addressable grid.
pub const MAX_ROWS: usize = 16_384;
pub const MAX_COLS: usize = 16_384;

/// A (row, col) coordinate, 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    #[inline]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// True if this position is inside the addressable grid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.row < MAX_ROWS && self.col < MAX_COLS
    }

    /// Parse A1 notation: one or more ASCII letters, then a 1-based row.
    ///
    /// Accepts lowercase. The parsed position may be out of bounds; callers
    /// that care must check `is_valid`. Returns `None` for anything that is
    /// not letters-then-digits (`""`, `"A"`, `"1A"`, `"A0"`).
    pub fn parse(text: &str) -> Option<Self> {
        let split = text.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = text.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let row: usize = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(Self {
            row: row - 1,
            col: letters_to_col(letters),
        })
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", col_to_letters(self.col), self.row + 1)
    }
}

/// Grid extent, purely descriptive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub rows: usize,
    pub cols: usize,
}

/// Convert a 0-based column index to spreadsheet letters: 0=A, 25=Z, 26=AA.
pub fn col_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Convert spreadsheet letters to a 0-based column index: A=0, Z=25, AA=26.
///
/// Saturates on overflow; the result is far past `MAX_COLS` either way.
pub fn letters_to_col(letters: &str) -> usize {
    letters
        .chars()
        .fold(0usize, |acc, c| {
            let digit = (c.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
            acc.saturating_mul(26).saturating_add(digit)
        })
        .saturating_sub(1)
}
