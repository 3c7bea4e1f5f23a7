// src/config/mod.rs

//! Configuration loading and validation for flowgate.
//!
//! Responsibilities:
//! - Define the TOML-backed raw model and the validated options (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Check durations, buffer sizes and defaults (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    AutoPassOptions, CompilerOptions, ConfigFile, DispatchOptions, RawCompilerSection,
    RawConfigFile, RawDispatchSection, RawProxySection,
};
pub use validate::parse_duration;
