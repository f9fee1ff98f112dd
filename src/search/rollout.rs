//! Semi-greedy playouts used to score newly expanded nodes.

use std::time::Instant;

use board_game_traits::Color;
use rand::Rng;

use crate::evaluation::{scalar_eval, territory_difference};
use crate::position::{Board, Move};
use crate::search::{MctsSetting, Score};

/// Play out the position for at most `settings.rollout_depth()` plies, and score the result
/// from `perspective`'s point of view.
///
/// A side that cannot move on its turn has lost, giving 0.0 or 1.0. If the ply limit or the
/// deadline is reached first, the final position is scored with `scalar_eval` instead.
pub fn rollout<R: Rng>(
    mut board: Board,
    mut side_to_move: Color,
    perspective: Color,
    settings: &MctsSetting,
    deadline: Option<Instant>,
    rng: &mut R,
    moves: &mut Vec<Move>,
) -> Score {
    for _ in 0..settings.rollout_depth() {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break;
        }
        moves.clear();
        board.generate_moves(side_to_move, moves);
        if moves.is_empty() {
            return if side_to_move == perspective { 0.0 } else { 1.0 };
        }
        let mv = choose_rollout_move(&board, side_to_move, moves, settings, rng);
        board.do_move(mv);
        side_to_move = !side_to_move;
    }
    scalar_eval(&board, perspective)
}

/// Pick a move for one rollout ply.
///
/// With probability `greedy_probability`, draw `rollout_samples` moves with replacement and play the one
/// leaving the mover with the best territory difference. Otherwise play a uniformly random move.
pub fn choose_rollout_move<R: Rng>(
    board: &Board,
    color: Color,
    moves: &[Move],
    settings: &MctsSetting,
    rng: &mut R,
) -> Move {
    assert!(!moves.is_empty(), "No moves to choose from\n{}", board);

    if rng.gen_bool(settings.greedy_probability()) {
        let samples = moves.len().min(settings.rollout_samples());
        let mut best: Option<(Move, i32)> = None;
        for _ in 0..samples {
            let mv = moves[rng.gen_range(0..moves.len())];
            let score = territory_difference(&board.with_move(mv, color), color);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((mv, score));
            }
        }
        if let Some((mv, _)) = best {
            return mv;
        }
    }
    moves[rng.gen_range(0..moves.len())]
}
