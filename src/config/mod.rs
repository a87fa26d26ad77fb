// src/config/mod.rs

//! Configuration loading and resolution for devrunner.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and the resolved types (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Apply overrides and defaults (`resolve.rs`).

pub mod loader;
pub mod model;
pub mod resolve;

pub use loader::{load_config, load_from_path, LoadedConfig, DEFAULT_CONFIG_FILE};
pub use model::{
    CommandInput, CommandSpec, ConfigOverrides, RawCommandSpec, RawConfig, ResolvedConfig,
    SimpleConfig, SimpleSection,
};
pub use resolve::{
    default_run_command, parse_command_string, resolve_config, resolve_simple_config,
    DEFAULT_DEBOUNCE_MS, DEFAULT_IGNORE,
};
