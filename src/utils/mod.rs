pub mod config;
pub mod logger;
pub mod settings_toml;
pub mod tempfiles;

pub use config::*;
pub use logger::{Colors, setup_logging};
pub use settings_toml::{Settings, load_settings};
pub use tempfiles::{copy_file_atomic, read_json, to_pretty_json, write_json_atomic};
