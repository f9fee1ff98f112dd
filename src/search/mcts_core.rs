//! The core of the MCTS search algorithm: node storage, selection, expansion and backpropagation.

use std::time::Instant;

use board_game_traits::Color;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::position::{Board, Move};
use crate::search::arena::{Arena, Index};
use crate::search::rollout;
use crate::search::{MctsSetting, Score};

pub type NodeIndex = Index<Node>;

/// A vertex of the search tree. Every node owns its own copy of the board.
pub struct Node {
    pub board: Board,
    pub side_to_move: Color,
    /// The move that led here from the parent. `None` at the root.
    pub mv: Option<Move>,
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
    /// Legal moves not yet expanded into children, in random order
    pub untried_moves: Vec<Move>,
    pub visits: u32,
    pub total_reward: f64,
}

impl Node {
    fn new<R: Rng>(
        board: Board,
        side_to_move: Color,
        mv: Option<Move>,
        parent: Option<NodeIndex>,
        rng: &mut R,
    ) -> Self {
        let mut untried_moves = board.legal_moves(side_to_move);
        untried_moves.shuffle(rng);
        Node {
            board,
            side_to_move,
            mv,
            parent,
            children: vec![],
            untried_moves,
            visits: 0,
            total_reward: 0.0,
        }
    }

    /// Mean reward from the root player's perspective
    pub fn mean_reward(&self) -> Score {
        if self.visits == 0 {
            0.0
        } else {
            (self.total_reward / self.visits as f64) as Score
        }
    }

    #[inline]
    pub fn uct_value(&self, parent_visits_ln: Score, exploration_constant: Score) -> Score {
        if self.visits == 0 {
            return Score::INFINITY;
        }
        let visits = self.visits as Score;
        self.mean_reward() + exploration_constant * (parent_visits_ln / visits).sqrt()
    }
}

/// A Monte Carlo search tree for a single decision.
///
/// Rewards are always scored from the root side's perspective, at every depth of the tree.
pub struct Tree {
    arena: Arena<Node>,
    root: NodeIndex,
    perspective: Color,
}

impl Tree {
    pub fn new<R: Rng>(board: Board, side_to_move: Color, rng: &mut R) -> Self {
        let mut arena = Arena::with_capacity(1024);
        let root = arena.add(Node::new(board, side_to_move, None, None, rng));
        Tree {
            arena,
            root,
            perspective: side_to_move,
        }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn perspective(&self) -> Color {
        self.perspective
    }

    pub fn get(&self, index: NodeIndex) -> &Node {
        self.arena.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: NodeIndex) -> &mut Node {
        self.arena.get_mut(index)
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Perform one iteration of monte carlo tree search: selection, expansion,
    /// a rollout from the new node and backpropagation of its reward.
    pub fn iterate<R: Rng>(
        &mut self,
        settings: &MctsSetting,
        deadline: Option<Instant>,
        rng: &mut R,
        temp_moves: &mut Vec<Move>,
    ) -> Score {
        let mut node = self.select_leaf(settings.exploration_constant());
        if !self.get(node).untried_moves.is_empty() {
            node = self.expand(node, rng);
        }
        let leaf = self.get(node);
        let reward = rollout::rollout(
            leaf.board,
            leaf.side_to_move,
            self.perspective,
            settings,
            deadline,
            rng,
            temp_moves,
        );
        self.backpropagate(node, reward);
        reward
    }

    /// Descend from the root through fully expanded nodes, picking the best child by UCT.
    /// Stops at the first node with untried moves, or at a terminal node.
    pub(crate) fn select_leaf(&self, exploration_constant: Score) -> NodeIndex {
        let mut node = self.root;
        loop {
            let current = self.get(node);
            if !current.untried_moves.is_empty() || current.children.is_empty() {
                return node;
            }
            node = self.best_uct_child(node, exploration_constant);
        }
    }

    /// The child with the highest UCT value. Children without visits always win,
    /// ties go to the first child in expansion order.
    pub(crate) fn best_uct_child(&self, node: NodeIndex, exploration_constant: Score) -> NodeIndex {
        let parent = self.get(node);
        assert!(
            !parent.children.is_empty(),
            "Tried to select a child of a node without children\n{}",
            parent.board
        );
        let parent_visits_ln = (parent.visits.max(1) as Score).ln();

        let mut best_child = parent.children[0];
        let mut best_value = Score::NEG_INFINITY;
        for &child in parent.children.iter() {
            let value = self.get(child).uct_value(parent_visits_ln, exploration_constant);
            if value > best_value {
                best_value = value;
                best_child = child;
            }
        }
        best_child
    }

    /// Pop one untried move from `node` and add the resulting position as a new child.
    pub(crate) fn expand<R: Rng>(&mut self, node: NodeIndex, rng: &mut R) -> NodeIndex {
        let parent = self.arena.get_mut(node);
        let Some(mv) = parent.untried_moves.pop() else {
            panic!(
                "Tried to expand a node without untried moves\n{}",
                parent.board
            );
        };
        let board = parent.board.with_move(mv, parent.side_to_move);
        let side_to_move = !parent.side_to_move;

        let child = self
            .arena
            .add(Node::new(board, side_to_move, Some(mv), Some(node), rng));
        self.arena.get_mut(node).children.push(child);
        child
    }

    /// Add one visit and the unmodified reward to every node from `node` up to the root.
    pub(crate) fn backpropagate(&mut self, node: NodeIndex, reward: Score) {
        let mut current = Some(node);
        while let Some(index) = current {
            let node = self.arena.get_mut(index);
            node.visits += 1;
            node.total_reward += reward as f64;
            current = node.parent;
        }
    }

    /// Add a child without generating its untried moves from the board. Used to set up trees by hand.
    #[cfg(test)]
    pub(crate) fn add_child(
        &mut self,
        parent: NodeIndex,
        mv: Move,
        visits: u32,
        total_reward: f64,
    ) -> NodeIndex {
        let parent_node = self.get(parent);
        let node = Node {
            board: parent_node.board.with_move(mv, parent_node.side_to_move),
            side_to_move: !parent_node.side_to_move,
            mv: Some(mv),
            parent: Some(parent),
            children: vec![],
            untried_moves: vec![],
            visits,
            total_reward,
        };
        let child = self.arena.add(node);
        self.arena.get_mut(parent).children.push(child);
        child
    }

    /// The most visited child of `node`, ties going to the first one expanded
    pub fn most_visited_child(&self, node: NodeIndex) -> Option<NodeIndex> {
        let mut best: Option<NodeIndex> = None;
        for &child in self.get(node).children.iter() {
            match best {
                Some(best_child) if self.get(best_child).visits >= self.get(child).visits => (),
                _ => best = Some(child),
            }
        }
        best
    }
}

/// The principal variation: the chain of most visited children from a node
pub struct Pv<'a> {
    tree: &'a Tree,
    node: NodeIndex,
}

impl<'a> Pv<'a> {
    pub fn new(tree: &'a Tree, node: NodeIndex) -> Pv<'a> {
        Pv { tree, node }
    }
}

impl<'a> Iterator for Pv<'a> {
    type Item = Move;

    fn next(&mut self) -> Option<Self::Item> {
        let child = self.tree.most_visited_child(self.node)?;
        self.node = child;
        self.tree.get(child).mv
    }
}
