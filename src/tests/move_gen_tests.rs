use std::collections::HashSet;

use board_game_traits::Color;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::position::{squares_iterator, Board, Move, Piece};
use crate::tests::{board_from_rows, for_each_random_position, square};

#[test]
fn start_position_move_count_test() {
    let board = Board::start_position();
    assert_eq!(board.legal_moves(Color::Black).len(), 2176);
    assert_eq!(board.legal_moves(Color::White).len(), 2176);
}

#[test]
fn perft_test() {
    let mut board = Board::start_position();
    assert_eq!(board.perft(Color::Black, 0), 1);
    assert_eq!(board.perft(Color::Black, 1), 2176);
    assert_eq!(board, Board::start_position());
}

#[test]
fn small_perft_test() {
    // Black's queen can only reach (1,2) and (2,1), and then shoot at the origin or the other square
    let mut board = board_from_rows(&[
        "B.X.......",
        ".XX.......",
        "XX........",
        "..........",
        "..........",
        "..........",
        "..........",
        ".........X",
        "........XX",
        "........XW",
    ]);
    assert_eq!(board.perft(Color::Black, 1), 4);
    assert_eq!(board.perft(Color::White, 1), 0);
    // Whatever Black plays, White is stuck afterwards
    assert_eq!(board.perft(Color::Black, 2), 0);
}

#[test]
fn corner_queen_moves_test() {
    let board = board_from_rows(&[
        "B.........",
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
        ".........W",
    ]);
    let origin = square(1, 1);
    let moves = board.legal_moves(Color::Black);

    let destinations: HashSet<_> = moves.iter().map(|mv| mv.to).collect();
    // 9 squares east, 9 squares south and 8 squares on the diagonal before the white queen
    assert_eq!(destinations.len(), 26);
    for to in destinations.iter() {
        assert!(to.row() == 1 || to.col() == 1 || to.row() == to.col(), "{}", to);
    }

    for &to in destinations.iter() {
        let arrows: HashSet<_> = moves
            .iter()
            .filter(|mv| mv.to == to)
            .map(|mv| mv.arrow)
            .collect();
        assert!(
            arrows.contains(&origin),
            "Moving to {} should allow shooting back at {}",
            to,
            origin
        );

        let mut after_queen_move = board;
        after_queen_move[origin] = Piece::Empty;
        after_queen_move[to] = Piece::Black;
        let expected: HashSet<_> = after_queen_move.slides(to).into_iter().collect();
        assert_eq!(arrows, expected, "Wrong arrow shots after moving to {}", to);
    }
}

#[test]
fn enclosed_queens_have_no_moves_test() {
    let board = board_from_rows(&[
        "BX...XWX..",
        "XX...XXX..",
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
        "XXX.......",
        "XBX......W",
    ]);
    assert!(board.legal_moves(Color::Black).is_empty());
    assert!(!board.has_legal_move(Color::Black));
    assert!(!board.legal_moves(Color::White).is_empty());
    assert!(board.has_legal_move(Color::White));
}

#[test]
fn generated_moves_are_legal_test() {
    let mut rng = StdRng::seed_from_u64(1234);
    for_each_random_position(&mut rng, 40, |board, color| {
        let moves = board.legal_moves(color);
        assert_eq!(moves.is_empty(), !board.has_legal_move(color));

        let unique: HashSet<Move> = moves.iter().copied().collect();
        assert_eq!(unique.len(), moves.len(), "Duplicate moves generated\n{}", board);

        for mv in moves {
            assert_eq!(board[mv.from], Piece::queen(color));
            assert!(board[mv.to].is_empty(), "{}\n{}", mv, board);
            assert!(
                board[mv.arrow].is_empty() || mv.arrow == mv.from,
                "{}\n{}",
                mv,
                board
            );
            assert_ne!(mv.to, mv.arrow);
            let mut copy = *board;
            assert!(
                copy.apply_opponent_move(mv, color).is_ok(),
                "Generated move {} was rejected\n{}",
                mv,
                board
            );
        }
    });
}

/// Check the generator against brute force validation of every (from, to, arrow) triple
#[test]
fn generated_moves_are_complete_test() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut positions = vec![];
    for_each_random_position(&mut rng, 50, |board, color| positions.push((*board, color)));

    for (board, color) in positions.into_iter().step_by(10) {
        let generated: HashSet<Move> = board.legal_moves(color).into_iter().collect();
        let mut validated = HashSet::new();
        for from in board.queens(color) {
            for to in squares_iterator() {
                for arrow in squares_iterator() {
                    let mv = Move::new(from, to, arrow);
                    let mut copy = board;
                    if copy.apply_opponent_move(mv, color).is_ok() {
                        validated.insert(mv);
                    }
                }
            }
        }
        assert_eq!(generated, validated, "\n{}", board);
    }
}
