//! The Amazons board, move application and move generation, along with all required data types.

use std::fmt;
use std::ops::{Index, IndexMut};

use arrayvec::ArrayVec;
use board_game_traits::{Color, GameResult};
use log::warn;

pub use mv::{Move, MoveParseError};
pub use square::{squares_iterator, Square, SquareParseError};
pub use utils::{AbstractBoard, Direction, Piece};

mod move_gen;
mod mv;
mod square;
pub mod utils;

pub const BOARD_SIZE: usize = 10;
pub const NUM_SQUARES: usize = BOARD_SIZE * BOARD_SIZE;

/// Length of the server's bordered encoding, indexed as `row * 11 + col`
pub const BORDERED_STATE_LEN: usize = (BOARD_SIZE + 1) * (BOARD_SIZE + 1);

/// The most squares a queen can ever slide to in one move on an empty 10x10 board
pub const MAX_SLIDES: usize = 35;

/// The longest possible ray on the board
pub const MAX_RAY_LENGTH: usize = BOARD_SIZE - 1;

/// Errors from decoding server payloads or applying moves that were not produced by our own generator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardError {
    /// Payload was neither the dense 100-cell nor the bordered 121-cell layout
    UnsupportedLength(usize),
    InvalidCell {
        index: usize,
        value: i32,
    },
    /// The move's origin did not hold a queen of the moving side
    WrongPiece {
        square: Square,
        expected: Piece,
        found: Piece,
    },
    IllegalQueenMove(Move),
    IllegalArrowShot(Move),
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::UnsupportedLength(len) => write!(
                f,
                "Unsupported game-state length {}, expected {} or {}",
                len, NUM_SQUARES, BORDERED_STATE_LEN
            ),
            BoardError::InvalidCell { index, value } => {
                write!(f, "Invalid cell value {} at index {}", value, index)
            }
            BoardError::WrongPiece {
                square,
                expected,
                found,
            } => write!(
                f,
                "Expected {} on {}, found {}",
                expected.to_char(),
                square,
                found.to_char()
            ),
            BoardError::IllegalQueenMove(mv) => write!(f, "Illegal queen move in {}", mv),
            BoardError::IllegalArrowShot(mv) => write!(f, "Illegal arrow shot in {}", mv),
        }
    }
}

impl std::error::Error for BoardError {}

/// The information needed to take back a move with `Board::reverse_move`
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ReverseMove {
    mv: Move,
    piece: Piece,
}

/// A 10x10 Amazons position. Side to move is not stored; every operation that needs it takes a `Color`.
///
/// The board is small and `Copy`, so search code branches by copying it rather than by tracking diffs.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    cells: AbstractBoard<Piece>,
}

impl Index<Square> for Board {
    type Output = Piece;

    fn index(&self, square: Square) -> &Self::Output {
        &self.cells[square]
    }
}

impl IndexMut<Square> for Board {
    fn index_mut(&mut self, square: Square) -> &mut Self::Output {
        &mut self.cells[square]
    }
}

/// An empty board, without any queens
impl Default for Board {
    fn default() -> Self {
        Board {
            cells: AbstractBoard::new_with_value(Piece::Empty),
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  ")?;
        for col in 1..=BOARD_SIZE {
            write!(f, " {}", col)?;
        }
        writeln!(f)?;
        for row in 1..=BOARD_SIZE as u8 {
            write!(f, "{:2}", row)?;
            for col in 1..=BOARD_SIZE as u8 {
                let square = Square::from_row_col(row, col).ok_or(fmt::Error)?;
                write!(f, " {}", self[square])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Board {
    /// The standard opening position. Black moves first.
    pub fn start_position() -> Self {
        // Flat indices of (10,4), (10,7), (7,1), (7,10) and (1,4), (1,7), (4,1), (4,10)
        const BLACK_QUEENS: [u8; 4] = [93, 96, 60, 69];
        const WHITE_QUEENS: [u8; 4] = [3, 6, 30, 39];

        let mut board = Board::default();
        for (queens, piece) in [(BLACK_QUEENS, Piece::Black), (WHITE_QUEENS, Piece::White)] {
            for index in queens {
                board[Square::from_u8(index)] = piece;
            }
        }
        board
    }

    /// Decode a game-state payload from the server.
    ///
    /// Accepts the dense 100-cell row-major layout, or the bordered 121-cell layout indexed as
    /// `row * 11 + col` for 1-based rows and columns, where the extra row and column are padding.
    pub fn from_server_state(data: &[i32]) -> Result<Self, BoardError> {
        let cell_index = |square: Square| -> usize {
            match data.len() {
                NUM_SQUARES => square.index(),
                _ => square.row() as usize * (BOARD_SIZE + 1) + square.col() as usize,
            }
        };
        if data.len() != NUM_SQUARES && data.len() != BORDERED_STATE_LEN {
            warn!("Rejected game state of length {}", data.len());
            return Err(BoardError::UnsupportedLength(data.len()));
        }

        let mut board = Board::default();
        for square in squares_iterator() {
            let index = cell_index(square);
            let value = data[index];
            board[square] = match Piece::from_wire(value) {
                Some(piece) => piece,
                None => {
                    warn!("Rejected game state with cell value {} at index {}", value, index);
                    return Err(BoardError::InvalidCell { index, value });
                }
            };
        }
        Ok(board)
    }

    /// Replace the contents of this board with a server payload.
    /// On error, the board is left unchanged.
    pub fn load_server_state(&mut self, data: &[i32]) -> Result<(), BoardError> {
        *self = Board::from_server_state(data)?;
        Ok(())
    }

    /// Encode the board in the server's bordered 121-cell layout.
    pub fn to_server_state(&self) -> Vec<i32> {
        let mut data = vec![0; BORDERED_STATE_LEN];
        for square in squares_iterator() {
            data[square.row() as usize * (BOARD_SIZE + 1) + square.col() as usize] =
                self[square].to_wire();
        }
        data
    }

    pub fn queens(&self, color: Color) -> impl Iterator<Item = Square> + '_ {
        let queen = Piece::queen(color);
        squares_iterator().filter(move |&square| self[square] == queen)
    }

    /// Play a move generated for this board, without checking legality.
    pub fn do_move(&mut self, mv: Move) -> ReverseMove {
        let piece = self[mv.from];
        debug_assert!(piece.color().is_some(), "No queen on {} in {}\n{}", mv.from, mv, self);
        debug_assert!(self[mv.to].is_empty(), "{}\n{}", mv, self);

        self[mv.from] = Piece::Empty;
        self[mv.to] = piece;
        debug_assert!(self[mv.arrow].is_empty(), "{}\n{}", mv, self);
        self[mv.arrow] = Piece::Arrow;

        ReverseMove { mv, piece }
    }

    /// Play a move for `color`, failing if the origin does not hold one of that color's queens.
    /// The board is only changed on success.
    pub fn apply_move(&mut self, mv: Move, color: Color) -> Result<ReverseMove, BoardError> {
        let expected = Piece::queen(color);
        if self[mv.from] != expected {
            return Err(BoardError::WrongPiece {
                square: mv.from,
                expected,
                found: self[mv.from],
            });
        }
        Ok(self.do_move(mv))
    }

    pub fn reverse_move(&mut self, reverse_move: ReverseMove) {
        let ReverseMove { mv, piece } = reverse_move;
        self[mv.arrow] = Piece::Empty;
        self[mv.to] = Piece::Empty;
        self[mv.from] = piece;
    }

    /// Returns an independent copy of the board with `mv` played by `color`.
    pub fn with_move(&self, mv: Move, color: Color) -> Board {
        let mut next = *self;
        next[mv.from] = Piece::Empty;
        next[mv.to] = Piece::queen(color);
        next[mv.arrow] = Piece::Arrow;
        next
    }

    /// The empty squares a queen (or arrow) on `origin` can slide to in one direction,
    /// stopping before the board edge or the first occupied square.
    pub fn ray_slide(&self, origin: Square, direction: Direction) -> ArrayVec<Square, MAX_RAY_LENGTH> {
        origin
            .ray(direction)
            .take_while(|&square| self[square].is_empty())
            .collect()
    }

    /// All empty squares a queen on `origin` can slide to, in all 8 directions.
    pub fn slides(&self, origin: Square) -> ArrayVec<Square, MAX_SLIDES> {
        Direction::ALL
            .into_iter()
            .flat_map(|direction| self.ray_slide(origin, direction))
            .collect()
    }

    /// Checks that `to` is on a queen line from `from`, and that every square after `from`
    /// up to and including `to` is empty. Does not check what stands on `from`.
    pub fn is_valid_move(&self, from: Square, to: Square) -> bool {
        let Some(direction) = Direction::between(from, to) else {
            return false;
        };
        for square in from.ray(direction) {
            if !self[square].is_empty() {
                return false;
            }
            if square == to {
                return true;
            }
        }
        false
    }

    /// Validate and apply a move reported by the opponent.
    ///
    /// The queen path is checked on the current board, the arrow path from the queen's new square
    /// with the origin vacated. The board is left unchanged on error.
    pub fn apply_opponent_move(&mut self, mv: Move, color: Color) -> Result<ReverseMove, BoardError> {
        let expected = Piece::queen(color);
        if self[mv.from] != expected {
            return Err(BoardError::WrongPiece {
                square: mv.from,
                expected,
                found: self[mv.from],
            });
        }
        if !self.is_valid_move(mv.from, mv.to) {
            return Err(BoardError::IllegalQueenMove(mv));
        }
        let mut after_queen_move = *self;
        after_queen_move[mv.from] = Piece::Empty;
        after_queen_move[mv.to] = expected;
        if !after_queen_move.is_valid_move(mv.to, mv.arrow) {
            return Err(BoardError::IllegalArrowShot(mv));
        }
        Ok(self.do_move(mv))
    }

    /// Whether `color` has at least one legal move.
    /// A queen with an empty neighbour can always step there and shoot back at its origin.
    pub fn has_legal_move(&self, color: Color) -> bool {
        self.queens(color).any(|queen| {
            Direction::ALL.iter().any(|&direction| {
                queen
                    .go_direction(direction)
                    .is_some_and(|neighbour| self[neighbour].is_empty())
            })
        })
    }

    /// The game is decided once the side to move cannot move. There are no draws in Amazons.
    pub fn game_result(&self, side_to_move: Color) -> Option<GameResult> {
        if self.has_legal_move(side_to_move) {
            None
        } else {
            match side_to_move {
                Color::White => Some(GameResult::BlackWin),
                Color::Black => Some(GameResult::WhiteWin),
            }
        }
    }

    pub fn count(&self, piece: Piece) -> usize {
        self.cells.iter().filter(|&&cell| cell == piece).count()
    }
}
