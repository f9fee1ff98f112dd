//! An Amazons AI, based on Monte Carlo Tree Search.
//!
//! Every decision builds a fresh tree from the given position. Leaves are scored with short
//! semi-greedy rollouts, falling back to a territory evaluation when the rollout is cut off.

use std::time::{Duration, Instant};

use board_game_traits::Color;
use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::position::{Board, Move};
use crate::search::mcts_core::{Pv, Tree};

pub use arena::{Arena, Index};

mod arena;
/// This module contains the tree itself and the four phases of each iteration.
/// The public-facing convenience API is in this module.
pub(crate) mod mcts_core;
pub mod rollout;

/// Type alias for winning probability, used for scoring positions.
pub type Score = f32;

/// Search configuration. Only the time budget and the exploration constant are expected to be
/// changed in play; the rollout knobs exist for experiments.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct MctsSetting {
    time_budget: Duration,
    exploration_constant: Score,
    rollout_depth: u16,
    rollout_samples: usize,
    greedy_probability: f64,
    seed: Option<u64>,
}

impl Default for MctsSetting {
    fn default() -> Self {
        MctsSetting {
            // Stays under the server's 30 second move limit
            time_budget: Duration::from_millis(29_000),
            exploration_constant: 1.41,
            rollout_depth: 30,
            rollout_samples: 20,
            greedy_probability: 0.8,
            seed: None,
        }
    }
}

impl MctsSetting {
    pub fn add_time_budget(mut self, time_budget: Duration) -> Self {
        self.time_budget = time_budget;
        self
    }

    /// The `C` constant in the UCT formula. Higher values explore more.
    pub fn add_exploration_constant(mut self, exploration_constant: Score) -> Self {
        assert!(
            exploration_constant.is_finite() && exploration_constant >= 0.0,
            "Invalid exploration constant {}",
            exploration_constant
        );
        self.exploration_constant = exploration_constant;
        self
    }

    /// The maximum number of plies played in each rollout. Defaults to 30
    pub fn add_rollout_depth(mut self, rollout_depth: u16) -> Self {
        self.rollout_depth = rollout_depth;
        self
    }

    /// How many candidate moves a greedy rollout ply samples. Defaults to 20
    pub fn add_rollout_samples(mut self, rollout_samples: usize) -> Self {
        self.rollout_samples = rollout_samples;
        self
    }

    /// Probability that a rollout ply is greedy rather than uniformly random
    pub fn add_greedy_probability(mut self, greedy_probability: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&greedy_probability),
            "Invalid greedy probability {}",
            greedy_probability
        );
        self.greedy_probability = greedy_probability;
        self
    }

    /// Seed the search's random number generator, for reproducible move ordering and rollouts.
    pub fn add_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn time_budget(&self) -> Duration {
        self.time_budget
    }

    pub fn exploration_constant(&self) -> Score {
        self.exploration_constant
    }

    pub fn rollout_depth(&self) -> u16 {
        self.rollout_depth
    }

    pub fn rollout_samples(&self) -> usize {
        self.rollout_samples
    }

    pub fn greedy_probability(&self) -> f64 {
        self.greedy_probability
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        }
    }
}

/// Abstract representation of a Monte Carlo Search Tree.
/// Gives more fine-grained control of the search process compared to using the `choose_move` function.
pub struct MonteCarloTree {
    tree: Tree,
    settings: MctsSetting,
    rng: SmallRng,
    temp_moves: Vec<Move>,
}

impl MonteCarloTree {
    pub fn new(board: Board, side_to_move: Color) -> Self {
        Self::with_settings(board, side_to_move, MctsSetting::default())
    }

    pub fn with_settings(board: Board, side_to_move: Color, settings: MctsSetting) -> Self {
        let mut rng = settings.rng();
        let tree = Tree::new(board, side_to_move, &mut rng);
        MonteCarloTree {
            tree,
            settings,
            rng,
            temp_moves: vec![],
        }
    }

    /// Run one iteration of MCTS, returning the reward of its rollout.
    /// Rollouts are cut short once `deadline` has passed.
    pub fn select(&mut self, deadline: Option<Instant>) -> Score {
        self.tree.iterate(
            &self.settings,
            deadline,
            &mut self.rng,
            &mut self.temp_moves,
        )
    }

    /// Run iterations until `max_time` has passed since the call, returning the number of iterations.
    /// The deadline is checked before each iteration and between rollout plies, so the overrun
    /// is at most one iteration.
    pub fn search_for_time(&mut self, max_time: Duration) -> u64 {
        let start_time = Instant::now();
        let deadline = start_time + max_time;
        let mut iterations = 0;

        while Instant::now() < deadline {
            self.select(Some(deadline));
            iterations += 1;
        }

        debug!(
            "{} iterations, {} nodes, {:.2}s taken, {:.1}% mean reward",
            iterations,
            self.node_count(),
            start_time.elapsed().as_secs_f32(),
            self.mean_reward() * 100.0
        );
        iterations
    }

    /// The most visited root move, ties going to the move expanded first.
    /// Before any iteration has run, this is an arbitrary legal move.
    /// Returns `None` only if the side to move has no legal moves.
    pub fn best_move(&self) -> Option<Move> {
        let root = self.tree.root();
        match self.tree.most_visited_child(root) {
            Some(child) => self.tree.get(child).mv,
            None => self.tree.get(root).untried_moves.last().copied(),
        }
    }

    /// Every expanded root move, with its visit count and mean reward for the side to move.
    pub fn root_children(&self) -> Vec<(Move, u32, Score)> {
        let root = self.tree.get(self.tree.root());
        root.children
            .iter()
            .map(|&child| self.tree.get(child))
            .filter_map(|node| node.mv.map(|mv| (mv, node.visits, node.mean_reward())))
            .collect()
    }

    pub fn pv(&self) -> impl Iterator<Item = Move> + '_ {
        Pv::new(&self.tree, self.tree.root())
    }

    /// Log human-readable information of the search's progress.
    pub fn log_info(&self) {
        let mut best_children = self.root_children();
        best_children.sort_by_key(|(_, visits, _)| std::cmp::Reverse(*visits));

        for (mv, visits, mean_reward) in best_children.iter().take(8) {
            info!(
                "Move {}: {} visits, {:.2}% mean reward",
                mv,
                visits,
                mean_reward * 100.0
            );
        }
        info!(
            "Pv: {}",
            self.pv()
                .map(|mv| mv.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );
    }

    pub fn visits(&self) -> u32 {
        self.tree.get(self.tree.root()).visits
    }

    pub fn mean_reward(&self) -> Score {
        self.tree.get(self.tree.root()).mean_reward()
    }

    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }

    pub fn side_to_move(&self) -> Color {
        self.tree.perspective()
    }

    #[cfg(test)]
    pub(crate) fn tree(&self) -> &Tree {
        &self.tree
    }
}

/// How a decision request was resolved.
pub enum Decision {
    /// The side to move has no legal moves, and has lost
    NoMove,
    /// The only legal move, found without searching
    Forced(Move),
    /// The tree after searching for the full time budget
    Searched(MonteCarloTree),
}

/// Take the no-move and single-move shortcuts, or otherwise search for `settings.time_budget()`.
pub fn decide(board: &Board, color: Color, settings: MctsSetting) -> Decision {
    let moves = board.legal_moves(color);
    match moves.as_slice() {
        [] => {
            debug!("{:?} has no legal moves", color);
            Decision::NoMove
        }
        [only_move] => {
            debug!("Only one legal move, playing {} without searching", only_move);
            Decision::Forced(*only_move)
        }
        _ => {
            let mut tree = MonteCarloTree::with_settings(*board, color, settings);
            tree.search_for_time(settings.time_budget());
            Decision::Searched(tree)
        }
    }
}

/// Choose a move for `color`, searching for `settings.time_budget()`.
///
/// Returns `None` if `color` has no legal moves, meaning it has lost. A position with a single
/// legal move is answered immediately, without searching.
pub fn choose_move(board: &Board, color: Color, settings: MctsSetting) -> Option<Move> {
    match decide(board, color, settings) {
        Decision::NoMove => None,
        Decision::Forced(mv) => Some(mv),
        Decision::Searched(tree) => {
            tree.log_info();
            tree.best_move()
        }
    }
}

/// Run Monte Carlo Tree Search for a fixed number of iterations, without a deadline.
/// Mostly useful for reproducible tests.
pub fn mcts(board: &Board, color: Color, iterations: u64, settings: MctsSetting) -> Option<Move> {
    let mut tree = MonteCarloTree::with_settings(*board, color, settings);
    for _ in 0..iterations {
        tree.select(None);
    }
    tree.best_move()
}

/// A uniformly random legal move, or `None` if `color` cannot move.
pub fn random_move<R: Rng>(board: &Board, color: Color, rng: &mut R) -> Option<Move> {
    let moves = board.legal_moves(color);
    if moves.is_empty() {
        None
    } else {
        Some(moves[rng.gen_range(0..moves.len())])
    }
}
