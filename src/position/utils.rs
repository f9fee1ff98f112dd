use std::fmt;
use std::ops::{Index, IndexMut};

use board_game_traits::Color;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{Square, NUM_SQUARES};

/// One of the 8 queen directions. North is towards row 1.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// The (row, column) step taken when moving one square in this direction
    pub const fn delta(self) -> (i8, i8) {
        match self {
            Direction::North => (-1, 0),
            Direction::NorthEast => (-1, 1),
            Direction::East => (0, 1),
            Direction::SouthEast => (1, 1),
            Direction::South => (1, 0),
            Direction::SouthWest => (1, -1),
            Direction::West => (0, -1),
            Direction::NorthWest => (-1, -1),
        }
    }

    pub const fn from_delta(delta_row: i8, delta_col: i8) -> Option<Direction> {
        match (delta_row, delta_col) {
            (-1, 0) => Some(Direction::North),
            (-1, 1) => Some(Direction::NorthEast),
            (0, 1) => Some(Direction::East),
            (1, 1) => Some(Direction::SouthEast),
            (1, 0) => Some(Direction::South),
            (1, -1) => Some(Direction::SouthWest),
            (0, -1) => Some(Direction::West),
            (-1, -1) => Some(Direction::NorthWest),
            _ => None,
        }
    }

    /// The direction of the queen line from `from` to `to`, if the two squares share a row,
    /// column or diagonal. Returns `None` for identical squares.
    pub fn between(from: Square, to: Square) -> Option<Direction> {
        let delta_row = to.row() as i8 - from.row() as i8;
        let delta_col = to.col() as i8 - from.col() as i8;
        if delta_row != 0 && delta_col != 0 && delta_row.abs() != delta_col.abs() {
            return None;
        }
        Direction::from_delta(delta_row.signum(), delta_col.signum())
    }
}

/// Contents of one board cell. The discriminants are the server's wire values.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Piece {
    #[default]
    Empty = 0,
    Black = 1,
    White = 2,
    Arrow = 3,
}

impl Piece {
    pub const fn queen(color: Color) -> Self {
        match color {
            Color::Black => Piece::Black,
            Color::White => Piece::White,
        }
    }

    /// The owner of a queen, or `None` for empty and arrow cells
    pub const fn color(self) -> Option<Color> {
        match self {
            Piece::Black => Some(Color::Black),
            Piece::White => Some(Color::White),
            Piece::Empty | Piece::Arrow => None,
        }
    }

    pub const fn is_empty(self) -> bool {
        matches!(self, Piece::Empty)
    }

    pub const fn from_wire(value: i32) -> Option<Self> {
        match value {
            0 => Some(Piece::Empty),
            1 => Some(Piece::Black),
            2 => Some(Piece::White),
            3 => Some(Piece::Arrow),
            _ => None,
        }
    }

    pub const fn to_wire(self) -> i32 {
        self as i32
    }

    pub const fn to_char(self) -> char {
        match self {
            Piece::Empty => '.',
            Piece::Black => 'B',
            Piece::White => 'W',
            Piece::Arrow => 'X',
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// A value for every square of the board, indexed by `Square`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct AbstractBoard<T>([T; NUM_SQUARES]);

impl<T: Copy> AbstractBoard<T> {
    pub const fn new_with_value(value: T) -> Self {
        AbstractBoard([value; NUM_SQUARES])
    }
}

impl<T> AbstractBoard<T> {
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl<T> Index<Square> for AbstractBoard<T> {
    type Output = T;

    fn index(&self, square: Square) -> &Self::Output {
        &self.0[square.index()]
    }
}

impl<T> IndexMut<Square> for AbstractBoard<T> {
    fn index_mut(&mut self, square: Square) -> &mut Self::Output {
        &mut self.0[square.index()]
    }
}
