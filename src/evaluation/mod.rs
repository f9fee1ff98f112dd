//! Static evaluation of Amazons positions, based on queen-distance territory.

pub mod value_eval;

pub use value_eval::{
    bfs_distance, scalar_eval, territory_difference, territory_difference_with_distances,
    UNREACHABLE,
};
