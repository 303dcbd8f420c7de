pub mod commands;
pub mod config;
pub mod render;

pub use commands::{run_command, CliCommand};
pub use config::load_config;
