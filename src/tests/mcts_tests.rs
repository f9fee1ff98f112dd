use std::time::{Duration, Instant};

use board_game_traits::Color;
use rand::rngs::{SmallRng, StdRng};
use rand::SeedableRng;

use crate::evaluation::scalar_eval;
use crate::position::{Board, Move};
use crate::search::mcts_core::{NodeIndex, Tree};
use crate::search::rollout::{choose_rollout_move, rollout};
use crate::search::{self, Decision, MctsSetting, MonteCarloTree};
use crate::tests::{board_from_rows, square};

/// White's queen in the corner has a single escape square, which Black can fill with the queen or an arrow.
/// Black has 8 legal moves, 3 of which win immediately.
fn trap_board() -> Board {
    board_from_rows(&[
        "WXXXXXXXXX",
        "X.XXXXXXXX",
        "XX.XXXXXXX",
        "XXXB..XXXX",
        "XXXXXXXXXX",
        "XXXXXXXXXX",
        "XXXXXXXXXX",
        "XXXXXXXXXX",
        "XXXXXXXXXX",
        "XXXXXXXXXX",
    ])
}

/// Black is walled in, White is free
fn black_stuck_board() -> Board {
    board_from_rows(&[
        "BX........",
        "XX........",
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
        ".........W",
    ])
}

/// Black's only legal move is (1,1)-(1,2)/(1,1)
fn single_move_board() -> Board {
    board_from_rows(&[
        "B.X.......",
        "XXX.......",
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
        ".........W",
    ])
}

fn seeded_settings(seed: u64) -> MctsSetting {
    MctsSetting::default().add_seed(seed)
}

/// Every node with children has been visited once for each visit of its children,
/// plus once for its own rollout unless it is the root.
fn check_tree_invariants(tree: &Tree, node: NodeIndex) {
    let current = tree.get(node);
    assert!(current.total_reward >= 0.0);
    assert!(current.total_reward <= current.visits as f64 + 1e-9);

    if !current.children.is_empty() {
        let child_visits: u32 = current
            .children
            .iter()
            .map(|&child| tree.get(child).visits)
            .sum();
        let own_visit = if node == tree.root() { 0 } else { 1 };
        assert_eq!(current.visits, child_visits + own_visit);
    } else if node != tree.root() {
        assert!(current.visits >= 1);
    }

    for &child in current.children.iter() {
        let child_node = tree.get(child);
        assert_eq!(child_node.parent, Some(node));
        assert_eq!(child_node.side_to_move, !current.side_to_move);
        let mv = child_node.mv.unwrap();
        assert_eq!(
            child_node.board,
            current.board.with_move(mv, current.side_to_move)
        );
        check_tree_invariants(tree, child);
    }
}

#[test]
fn unvisited_child_is_selected_test() {
    let mut rng = SmallRng::seed_from_u64(1);
    let mut tree = Tree::new(Board::start_position(), Color::Black, &mut rng);
    let root = tree.root();
    let moves = Board::start_position().legal_moves(Color::Black);

    tree.add_child(root, moves[0], 10, 9.0);
    let unvisited = tree.add_child(root, moves[1], 0, 0.0);
    tree.add_child(root, moves[2], 5, 4.5);
    tree.get_mut(root).visits = 15;

    for exploration_constant in [0.0, 0.5, 1.41, 100.0] {
        assert_eq!(tree.best_uct_child(root, exploration_constant), unvisited);
    }
}

#[test]
fn uct_value_test() {
    let mut rng = SmallRng::seed_from_u64(2);
    let mut tree = Tree::new(Board::start_position(), Color::Black, &mut rng);
    let root = tree.root();
    let moves = Board::start_position().legal_moves(Color::Black);

    let strong = tree.add_child(root, moves[0], 20, 16.0);
    let rarely_visited = tree.add_child(root, moves[1], 2, 1.0);
    tree.get_mut(root).visits = 22;

    // Pure exploitation picks the best mean, heavy exploration the least visited child
    assert_eq!(tree.best_uct_child(root, 0.0), strong);
    assert_eq!(tree.best_uct_child(root, 10.0), rarely_visited);

    let node = tree.get(strong);
    let expected = 0.8 + 1.41 * ((22.0f32).ln() / 20.0).sqrt();
    assert!((node.uct_value((22.0f32).ln(), 1.41) - expected).abs() < 1e-5);
}

#[test]
fn uct_ties_go_to_first_child_test() {
    let mut rng = SmallRng::seed_from_u64(3);
    let mut tree = Tree::new(Board::start_position(), Color::Black, &mut rng);
    let root = tree.root();
    let moves = Board::start_position().legal_moves(Color::Black);

    let first = tree.add_child(root, moves[0], 4, 2.0);
    tree.add_child(root, moves[1], 4, 2.0);
    let first_unvisited = tree.add_child(root, moves[2], 0, 0.0);
    tree.add_child(root, moves[3], 0, 0.0);
    tree.get_mut(root).visits = 8;

    assert_eq!(tree.best_uct_child(root, 1.41), first_unvisited);
    assert_eq!(tree.most_visited_child(root), Some(first));
}

#[test]
fn expand_test() {
    let mut rng = SmallRng::seed_from_u64(4);
    let mut tree = Tree::new(trap_board(), Color::Black, &mut rng);
    let root = tree.root();
    assert_eq!(tree.get(root).untried_moves.len(), 8);

    let child = tree.expand(root, &mut rng);
    let root_node = tree.get(root);
    assert_eq!(root_node.untried_moves.len(), 7);
    assert_eq!(root_node.children, vec![child]);

    let child_node = tree.get(child);
    let mv = child_node.mv.unwrap();
    assert!(!root_node.untried_moves.contains(&mv));
    assert_eq!(child_node.side_to_move, Color::White);
    assert_eq!(child_node.board, trap_board().with_move(mv, Color::Black));
    assert_eq!(child_node.visits, 0);
    assert_eq!(tree.node_count(), 2);
}

#[test]
#[should_panic]
fn expand_without_moves_test() {
    let mut rng = SmallRng::seed_from_u64(5);
    let mut tree = Tree::new(black_stuck_board(), Color::Black, &mut rng);
    let root = tree.root();
    tree.expand(root, &mut rng);
}

#[test]
fn backpropagate_test() {
    let mut rng = SmallRng::seed_from_u64(6);
    let mut tree = Tree::new(Board::start_position(), Color::Black, &mut rng);
    let root = tree.root();
    let child = tree.expand(root, &mut rng);
    let grandchild = tree.expand(child, &mut rng);

    tree.backpropagate(grandchild, 0.75);
    tree.backpropagate(child, 0.25);

    // Rewards are never flipped between plies
    assert_eq!(tree.get(grandchild).visits, 1);
    assert_eq!(tree.get(grandchild).total_reward, 0.75);
    assert_eq!(tree.get(child).visits, 2);
    assert_eq!(tree.get(child).total_reward, 1.0);
    assert_eq!(tree.get(root).visits, 2);
    assert_eq!(tree.get(root).mean_reward(), 0.5);
}

#[test]
fn tree_invariants_after_search_test() {
    let settings = seeded_settings(7);
    let mut mcts = MonteCarloTree::with_settings(trap_board(), Color::Black, settings);
    for _ in 0..200 {
        let reward = mcts.select(None);
        assert!((0.0..=1.0).contains(&reward));
    }
    assert_eq!(mcts.visits(), 200);
    check_tree_invariants(mcts.tree(), mcts.tree().root());

    let root_children = mcts.root_children();
    assert_eq!(root_children.len(), 8);
    assert_eq!(
        root_children.iter().map(|(_, visits, _)| visits).sum::<u32>(),
        200
    );
}

#[test]
fn finds_winning_move_test() {
    let board = trap_board();
    let settings = seeded_settings(8).add_exploration_constant(0.1);
    let mv = search::mcts(&board, Color::Black, 300, settings).unwrap();

    assert!(board.legal_moves(Color::Black).contains(&mv));
    assert!(
        !board.with_move(mv, Color::Black).has_legal_move(Color::White),
        "{} does not trap White",
        mv
    );
}

#[test]
fn winning_moves_score_full_reward_test() {
    let board = trap_board();
    let mut mcts = MonteCarloTree::with_settings(board, Color::Black, seeded_settings(9));
    for _ in 0..8 {
        mcts.select(None);
    }
    for (mv, visits, mean_reward) in mcts.root_children() {
        assert_eq!(visits, 1);
        if !board.with_move(mv, Color::Black).has_legal_move(Color::White) {
            assert_eq!(mean_reward, 1.0, "{}", mv);
        }
    }
}

#[test]
fn search_is_reproducible_test() {
    let settings = seeded_settings(10);
    let mut first = MonteCarloTree::with_settings(trap_board(), Color::Black, settings);
    let mut second = MonteCarloTree::with_settings(trap_board(), Color::Black, settings);
    for _ in 0..100 {
        first.select(None);
        second.select(None);
    }
    assert_eq!(first.root_children(), second.root_children());
    assert_eq!(first.best_move(), second.best_move());
}

#[test]
fn pv_starts_with_best_move_test() {
    let mut mcts = MonteCarloTree::with_settings(trap_board(), Color::Black, seeded_settings(11));
    for _ in 0..50 {
        mcts.select(None);
    }
    assert_eq!(mcts.pv().next(), mcts.best_move());
}

#[test]
fn no_legal_moves_test() {
    let board = black_stuck_board();
    assert_eq!(search::choose_move(&board, Color::Black, seeded_settings(12)), None);
    assert_eq!(search::mcts(&board, Color::Black, 10, seeded_settings(12)), None);

    let mut mcts = MonteCarloTree::with_settings(board, Color::Black, seeded_settings(12));
    mcts.select(None);
    assert_eq!(mcts.best_move(), None);
    // The stuck root is its own rollout, which Black loses
    assert_eq!(mcts.visits(), 1);
    assert_eq!(mcts.mean_reward(), 0.0);
}

#[test]
fn single_legal_move_is_played_immediately_test() {
    let board = single_move_board();
    let settings = seeded_settings(13).add_time_budget(Duration::from_secs(60));

    let start_time = Instant::now();
    let mv = search::choose_move(&board, Color::Black, settings);
    assert!(start_time.elapsed() < Duration::from_secs(5));
    assert_eq!(
        mv,
        Some(Move::new(square(1, 1), square(1, 2), square(1, 1)))
    );
}

#[test]
fn decide_test() {
    let settings = seeded_settings(20).add_time_budget(Duration::from_millis(50));

    assert!(matches!(
        search::decide(&black_stuck_board(), Color::Black, settings),
        Decision::NoMove
    ));
    assert!(matches!(
        search::decide(&single_move_board(), Color::Black, settings),
        Decision::Forced(mv) if mv == Move::new(square(1, 1), square(1, 2), square(1, 1))
    ));

    let Decision::Searched(tree) = search::decide(&trap_board(), Color::Black, settings) else {
        panic!("Expected a search with 8 legal moves");
    };
    assert!(tree.visits() > 0);
    let mv = tree.best_move().unwrap();
    assert!(trap_board().legal_moves(Color::Black).contains(&mv));
}

#[test]
fn time_budget_is_respected_test() {
    let board = Board::start_position();
    let budget = Duration::from_millis(300);
    let settings = seeded_settings(14).add_time_budget(budget);

    let start_time = Instant::now();
    let mv = search::choose_move(&board, Color::Black, settings).unwrap();
    let elapsed = start_time.elapsed();

    assert!(elapsed >= budget, "Returned after {:?}", elapsed);
    assert!(elapsed < budget + Duration::from_secs(5), "Took {:?}", elapsed);
    assert!(board.legal_moves(Color::Black).contains(&mv));
}

#[test]
fn search_for_time_test() {
    let mut mcts = MonteCarloTree::with_settings(trap_board(), Color::White, seeded_settings(15));
    let iterations = mcts.search_for_time(Duration::from_millis(50));
    assert!(iterations > 0);
    assert_eq!(mcts.visits() as u64, iterations);
    assert_eq!(mcts.side_to_move(), Color::White);
}

#[test]
fn rollout_terminal_test() {
    let board = black_stuck_board();
    let settings = MctsSetting::default();
    let mut rng = SmallRng::seed_from_u64(16);
    let mut moves = vec![];

    assert_eq!(
        rollout(board, Color::Black, Color::Black, &settings, None, &mut rng, &mut moves),
        0.0
    );
    assert_eq!(
        rollout(board, Color::Black, Color::White, &settings, None, &mut rng, &mut moves),
        1.0
    );
}

#[test]
fn rollout_horizon_test() {
    let board = Board::start_position();
    let mut rng = SmallRng::seed_from_u64(17);
    let mut moves = vec![];

    let settings = MctsSetting::default().add_rollout_depth(0);
    assert_eq!(
        rollout(board, Color::Black, Color::White, &settings, None, &mut rng, &mut moves),
        scalar_eval(&board, Color::White)
    );

    // A passed deadline cuts the rollout short before it reaches the stuck side
    let stuck = black_stuck_board();
    let settings = MctsSetting::default();
    let deadline = Some(Instant::now());
    assert_eq!(
        rollout(stuck, Color::Black, Color::Black, &settings, deadline, &mut rng, &mut moves),
        scalar_eval(&stuck, Color::Black)
    );

    let settings = MctsSetting::default().add_rollout_depth(4);
    let reward = rollout(board, Color::Black, Color::Black, &settings, None, &mut rng, &mut moves);
    assert!((0.0..=1.0).contains(&reward));
}

#[test]
fn choose_rollout_move_test() {
    let board = trap_board();
    let moves = board.legal_moves(Color::Black);
    let mut rng = StdRng::seed_from_u64(18);

    for greedy_probability in [0.0, 0.8, 1.0] {
        let settings = MctsSetting::default().add_greedy_probability(greedy_probability);
        for _ in 0..20 {
            let mv = choose_rollout_move(&board, Color::Black, &moves, &settings, &mut rng);
            assert!(moves.contains(&mv));
        }
    }

    // Without samples, greedy plies fall back to a random move
    let settings = MctsSetting::default()
        .add_greedy_probability(1.0)
        .add_rollout_samples(0);
    let mv = choose_rollout_move(&board, Color::Black, &moves, &settings, &mut rng);
    assert!(moves.contains(&mv));
}

#[test]
fn random_move_test() {
    let mut rng = StdRng::seed_from_u64(19);
    assert_eq!(
        search::random_move(&black_stuck_board(), Color::Black, &mut rng),
        None
    );

    let board = Board::start_position();
    for _ in 0..10 {
        let mv = search::random_move(&board, Color::White, &mut rng).unwrap();
        assert!(board.legal_moves(Color::White).contains(&mv));
    }
}

#[test]
fn default_settings_test() {
    let settings = MctsSetting::default();
    assert_eq!(settings.time_budget(), Duration::from_millis(29_000));
    assert_eq!(settings.exploration_constant(), 1.41);
    assert_eq!(settings.rollout_depth(), 30);
    assert_eq!(settings.rollout_samples(), 20);
    assert_eq!(settings.greedy_probability(), 0.8);
    assert_eq!(settings.seed(), None);
}

#[test]
#[should_panic]
fn negative_exploration_constant_test() {
    MctsSetting::default().add_exploration_constant(-1.0);
}
