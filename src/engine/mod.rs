//! Engine module: CLI, command handlers, index store operations and file helpers

pub mod arg_parser;
pub mod cli;
pub mod db_ops;
pub mod handlers;
pub mod hashing;
pub mod progress;
pub mod sidecar;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::{Cli, Commands};
pub use cli::handle_run;
pub use hashing::hash_file;
pub use tools::{name_to_id, now_string};
