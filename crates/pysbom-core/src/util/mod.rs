pub mod deterministic;
pub mod output;
