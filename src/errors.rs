// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowgateError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to decode diagram: {0}")]
    DiagramDecode(String),

    #[error("Node '{node_id}' has properties that do not fit a {kind} node: {message}")]
    PropertyDecode {
        node_id: String,
        kind: String,
        message: String,
    },

    #[error("Node '{node_id}' has an unrecognised type '{type_name}'")]
    UnknownNodeType { node_id: String, type_name: String },

    #[error("Process engine error: {0}")]
    Engine(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Process instance not found: {0}")]
    InstanceNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FlowgateError>;
