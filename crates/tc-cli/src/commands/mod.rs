//! CLI subcommand implementations.

pub mod audit;
pub mod check;
pub mod delete;
pub mod import;
pub mod search;
pub mod status;
mod util;
