use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::position::Square;

/// A complete Amazons move: a queen relocation followed by an arrow shot from the queen's new square.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub arrow: Square,
}

impl Move {
    pub const fn new(from: Square, to: Square, arrow: Square) -> Self {
        Move { from, to, arrow }
    }

    /// Build a move from the server's six 1-based coordinates.
    /// Returns `None` if any coordinate is off the board.
    pub fn from_coords(coords: [u8; 6]) -> Option<Self> {
        Some(Move {
            from: Square::from_row_col(coords[0], coords[1])?,
            to: Square::from_row_col(coords[2], coords[3])?,
            arrow: Square::from_row_col(coords[4], coords[5])?,
        })
    }

    /// The move as (queenFromRow, queenFromCol, queenToRow, queenToCol, arrowRow, arrowCol)
    pub fn to_coords(self) -> [u8; 6] {
        [
            self.from.row(),
            self.from.col(),
            self.to.row(),
            self.to.col(),
            self.arrow.row(),
            self.arrow.col(),
        ]
    }
}

/// Writes the move as `r,c-r,c/r,c`, e.g. `1,4-5,4/5,9`
impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}/{}", self.from, self.to, self.arrow)
    }
}

impl FromStr for Move {
    type Err = MoveParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let (queen_part, arrow_part) = input
            .split_once('/')
            .ok_or_else(|| MoveParseError::new(input, "missing '/' before the arrow square"))?;
        let (from_part, to_part) = queen_part
            .split_once('-')
            .ok_or_else(|| MoveParseError::new(input, "missing '-' between queen squares"))?;

        let parse = |part: &str| {
            Square::from_str(part).map_err(|err| MoveParseError::new(input, &err.to_string()))
        };

        Ok(Move {
            from: parse(from_part)?,
            to: parse(to_part)?,
            arrow: parse(arrow_part)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveParseError {
    input: String,
    reason: String,
}

impl MoveParseError {
    fn new(input: &str, reason: &str) -> Self {
        MoveParseError {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for MoveParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Couldn't parse move \"{}\": {}", self.input, self.reason)
    }
}

impl std::error::Error for MoveParseError {}
