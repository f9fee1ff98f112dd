use std::fmt;
use std::iter;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::utils::Direction;
use super::{BOARD_SIZE, NUM_SQUARES};

/// A location on the board. Can be used to index a `Board`.
///
/// Rows and columns are 1-based, as on the game server. The square is stored as the flat index
/// `(row - 1) * 10 + (col - 1)`.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Square {
    inner: u8,
}

impl Square {
    pub const fn from_u8(inner: u8) -> Self {
        assert!((inner as usize) < NUM_SQUARES);
        Square { inner }
    }

    pub const fn index(self) -> usize {
        self.inner as usize
    }

    /// Returns `None` if either coordinate is outside `1..=10`.
    pub const fn from_row_col(row: u8, col: u8) -> Option<Self> {
        if row >= 1 && row <= BOARD_SIZE as u8 && col >= 1 && col <= BOARD_SIZE as u8 {
            Some(Square::from_u8((row - 1) * BOARD_SIZE as u8 + (col - 1)))
        } else {
            None
        }
    }

    pub const fn row(self) -> u8 {
        self.inner / BOARD_SIZE as u8 + 1
    }

    pub const fn col(self) -> u8 {
        self.inner % BOARD_SIZE as u8 + 1
    }

    pub const fn go_direction(self, direction: Direction) -> Option<Self> {
        let (delta_row, delta_col) = direction.delta();
        let row = self.row() as i8 + delta_row;
        let col = self.col() as i8 + delta_col;
        if row < 1 || col < 1 {
            None
        } else {
            Square::from_row_col(row as u8, col as u8)
        }
    }

    /// All squares in a straight line from this square, not including itself, until the board edge.
    /// Occupancy is not considered.
    pub fn ray(self, direction: Direction) -> impl Iterator<Item = Square> {
        iter::successors(self.go_direction(direction), move |square| {
            square.go_direction(direction)
        })
    }

    pub fn parse_square(input: &str) -> Result<Square, SquareParseError> {
        let (row, col) = input
            .split_once(',')
            .ok_or_else(|| SquareParseError(input.to_string()))?;
        let row = u8::from_str(row.trim()).map_err(|_| SquareParseError(input.to_string()))?;
        let col = u8::from_str(col.trim()).map_err(|_| SquareParseError(input.to_string()))?;
        Square::from_row_col(row, col).ok_or_else(|| SquareParseError(input.to_string()))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row(), self.col())
    }
}

impl FromStr for Square {
    type Err = SquareParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Square::parse_square(input)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SquareParseError(String);

impl fmt::Display for SquareParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Couldn't parse square \"{}\", expected \"row,col\" in 1..=10",
            self.0
        )
    }
}

impl std::error::Error for SquareParseError {}

/// Iterates over all board squares, in row-major order.
pub fn squares_iterator() -> impl Iterator<Item = Square> {
    (0..NUM_SQUARES as u8).map(Square::from_u8)
}
