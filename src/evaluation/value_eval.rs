use std::cmp::Ordering;
use std::collections::VecDeque;

use board_game_traits::Color;

use crate::position::{AbstractBoard, Board, Direction, NUM_SQUARES};
use crate::search::Score;

/// Distance of a square that no queen of the color can ever reach
pub const UNREACHABLE: u8 = u8::MAX;

/// Queen-move distance from the nearest queen of `color` to every square.
///
/// Multi-source breadth-first search, where one step slides any number of squares along
/// one of the 8 directions through empty squares. Squares holding `color`'s queens get 0,
/// anything that cannot be reached stays at `UNREACHABLE`.
pub fn bfs_distance(board: &Board, color: Color) -> AbstractBoard<u8> {
    let mut distances = AbstractBoard::new_with_value(UNREACHABLE);
    let mut queue = VecDeque::with_capacity(NUM_SQUARES);

    for queen in board.queens(color) {
        distances[queen] = 0;
        queue.push_back(queen);
    }

    while let Some(square) = queue.pop_front() {
        let next_distance = distances[square] + 1;
        for direction in Direction::ALL {
            for reached in board.ray_slide(square, direction) {
                if distances[reached] == UNREACHABLE {
                    distances[reached] = next_distance;
                    queue.push_back(reached);
                }
            }
        }
    }
    distances
}

/// Empty squares strictly closer to `color` minus empty squares strictly closer to the opponent.
/// Ties and squares neither side can reach count for nobody.
pub fn territory_difference(board: &Board, color: Color) -> i32 {
    let ours = bfs_distance(board, color);
    let theirs = bfs_distance(board, !color);
    territory_difference_with_distances(board, &ours, &theirs)
}

pub fn territory_difference_with_distances(
    board: &Board,
    ours: &AbstractBoard<u8>,
    theirs: &AbstractBoard<u8>,
) -> i32 {
    crate::position::squares_iterator()
        .filter(|&square| board[square].is_empty())
        .map(|square| match ours[square].cmp(&theirs[square]) {
            Ordering::Less => 1,
            Ordering::Greater => -1,
            Ordering::Equal => 0,
        })
        .sum()
}

/// Territory evaluation scaled to a winning probability for `color`, clamped to `0.0..=1.0`.
/// An even position scores 0.5.
pub fn scalar_eval(board: &Board, color: Color) -> Score {
    let difference = territory_difference(board, color) as Score;
    (0.5 + difference / (2.0 * NUM_SQUARES as Score)).clamp(0.0, 1.0)
}
