pub mod cli;
pub mod load_config;
pub mod telegram;

pub use cli::{run, Cli, Commands};
