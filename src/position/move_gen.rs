use board_game_traits::Color;

use crate::position::{Board, Move, Piece};

impl Board {
    /// Adds every legal move for `color` to the provided vector.
    ///
    /// Arrow shots are generated from the queen's new square with the origin vacated,
    /// so the origin is a legal arrow target whenever it lies on a line from the destination.
    /// The queen is moved on a scratch copy of the board, which is dropped afterwards.
    pub fn generate_moves(&self, color: Color, moves: &mut Vec<Move>) {
        let queen = Piece::queen(color);
        let mut scratch = *self;
        for from in self.queens(color) {
            scratch[from] = Piece::Empty;
            for to in self.slides(from) {
                scratch[to] = queen;
                moves.extend(
                    scratch
                        .slides(to)
                        .into_iter()
                        .map(|arrow| Move::new(from, to, arrow)),
                );
                scratch[to] = Piece::Empty;
            }
            scratch[from] = queen;
        }
        debug_assert_eq!(scratch, *self);
    }

    pub fn legal_moves(&self, color: Color) -> Vec<Move> {
        let mut moves = vec![];
        self.generate_moves(color, &mut moves);
        moves
    }

    /// Count the number of move sequences of length `depth`, with `color` moving first.
    /// A side without moves ends its line early, contributing nothing.
    pub fn perft(&mut self, color: Color, depth: u16) -> u64 {
        if depth == 0 {
            return 1;
        }
        let mut moves = vec![];
        self.generate_moves(color, &mut moves);
        if depth == 1 {
            return moves.len() as u64;
        }
        moves
            .into_iter()
            .map(|mv| {
                let reverse_move = self.do_move(mv);
                let num_moves = self.perft(!color, depth - 1);
                self.reverse_move(reverse_move);
                num_moves
            })
            .sum()
    }
}
