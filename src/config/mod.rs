//! Configuration module.
//!
//! Loads the application configuration (server, automation, ledger) from
//! TOML or YAML and resolves relative paths against the config file.

mod app;
mod path;

pub use app::{
    AppConfig, AutomationConfig, ConfigFormat, DEFAULT_CONFIG_FILE, LedgerConfig, ServerConfig,
    Timings, load_config, load_config_from_str,
};
pub use path::{PathResolver, home_dir, resolve_path, validate_image_path};
