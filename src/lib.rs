pub mod evaluation;
pub mod position;
pub mod search;
mod tests;
