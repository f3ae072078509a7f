pub mod cli;
pub mod gitea;
pub mod load_config;
pub mod mesh;
pub mod server;

pub use cli::{run, Cli, Commands};
