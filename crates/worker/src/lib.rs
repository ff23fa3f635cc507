//! Command-line worker running one asset generation pass over a script.

pub mod app;
pub mod cli;

pub use app::{run, Outcome};
pub use cli::Args;
