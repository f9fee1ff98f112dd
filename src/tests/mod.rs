#[cfg(test)]
mod mcts_tests;
#[cfg(test)]
mod move_gen_tests;

#[cfg(test)]
use crate::position::{Board, Piece, Square};
#[cfg(test)]
use board_game_traits::Color;
#[cfg(test)]
use rand::Rng;

/// Build a board from 10 rows of 10 characters, row 1 first.
/// `.` is empty, `B` and `W` are queens, `X` is an arrow.
#[cfg(test)]
fn board_from_rows(rows: &[&str; 10]) -> Board {
    let mut board = Board::default();
    for (row, line) in rows.iter().enumerate() {
        assert_eq!(line.len(), 10, "Row {} has wrong length: \"{}\"", row + 1, line);
        for (col, ch) in line.chars().enumerate() {
            let square = Square::from_row_col(row as u8 + 1, col as u8 + 1).unwrap();
            board[square] = match ch {
                '.' => Piece::Empty,
                'B' => Piece::Black,
                'W' => Piece::White,
                'X' => Piece::Arrow,
                _ => panic!("Unknown cell '{}' in row {}", ch, row + 1),
            };
        }
    }
    board
}

#[cfg(test)]
fn square(row: u8, col: u8) -> Square {
    Square::from_row_col(row, col).unwrap()
}

/// Play random moves from the start position, calling `check` on every position reached,
/// together with the side to move. Stops early if the side to move has lost.
#[cfg(test)]
fn for_each_random_position<R: Rng, F: FnMut(&Board, Color)>(rng: &mut R, plies: usize, mut check: F) {
    let mut board = Board::start_position();
    let mut color = Color::Black;
    let mut moves = vec![];
    for _ in 0..plies {
        check(&board, color);
        moves.clear();
        board.generate_moves(color, &mut moves);
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        board.apply_move(mv, color).unwrap();
        color = !color;
    }
}
