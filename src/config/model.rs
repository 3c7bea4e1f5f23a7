// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::types::UnknownNodePolicy;

/// Configuration as read from `Flowgate.toml`.
///
/// ```toml
/// [compiler]
/// default_condition_expression = "1 == 1"
/// unknown_node_types = "skip"
///
/// [proxy]
/// timeout = "10s"
/// poll_interval = "500ms"
/// comment = "system auto pass"
///
/// [dispatch]
/// event_buffer = 64
/// ```
///
/// Every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub compiler: RawCompilerSection,
    #[serde(default)]
    pub proxy: RawProxySection,
    #[serde(default)]
    pub dispatch: RawDispatchSection,
}

/// `[compiler]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCompilerSection {
    /// Written into condition branches whose edge carries no expression.
    #[serde(default = "default_condition_expression")]
    pub default_condition_expression: String,
    #[serde(default)]
    pub unknown_node_types: UnknownNodePolicy,
}

impl Default for RawCompilerSection {
    fn default() -> Self {
        Self {
            default_condition_expression: default_condition_expression(),
            unknown_node_types: UnknownNodePolicy::default(),
        }
    }
}

/// `[proxy]` section. Durations are strings such as `"500ms"` or `"10s"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawProxySection {
    #[serde(default = "default_proxy_timeout")]
    pub timeout: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
    #[serde(default = "default_autopass_comment")]
    pub comment: String,
}

impl Default for RawProxySection {
    fn default() -> Self {
        Self {
            timeout: default_proxy_timeout(),
            poll_interval: default_poll_interval(),
            comment: default_autopass_comment(),
        }
    }
}

/// `[dispatch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDispatchSection {
    #[serde(default = "default_system_pass_comment")]
    pub system_pass_comment: String,
    #[serde(default = "default_system_reject_comment")]
    pub system_reject_comment: String,
    #[serde(default = "default_reject_cleanup_comment")]
    pub reject_cleanup_comment: String,
    /// Capacity of the event channel feeding the dispatcher loop.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for RawDispatchSection {
    fn default() -> Self {
        Self {
            system_pass_comment: default_system_pass_comment(),
            system_reject_comment: default_system_reject_comment(),
            reject_cleanup_comment: default_reject_cleanup_comment(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_condition_expression() -> String {
    "1 == 1".to_string()
}

fn default_proxy_timeout() -> String {
    "10s".to_string()
}

fn default_poll_interval() -> String {
    "500ms".to_string()
}

fn default_autopass_comment() -> String {
    "system auto pass".to_string()
}

fn default_system_pass_comment() -> String {
    "closed by system: branch approved".to_string()
}

fn default_system_reject_comment() -> String {
    "closed by system: branch rejected".to_string()
}

fn default_reject_cleanup_comment() -> String {
    "closed by system: sibling branch rejected".to_string()
}

fn default_event_buffer() -> usize {
    64
}

/// Compiler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    pub default_condition_expression: String,
    pub unknown_node_types: UnknownNodePolicy,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        let raw = RawCompilerSection::default();
        Self {
            default_condition_expression: raw.default_condition_expression,
            unknown_node_types: raw.unknown_node_types,
        }
    }
}

/// Proxy auto-pass runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoPassOptions {
    /// Give up when no task appears within this window.
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Comment recorded on auto-passed tasks.
    pub comment: String,
}

impl Default for AutoPassOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
            comment: default_autopass_comment(),
        }
    }
}

/// Event dispatcher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    pub system_pass_comment: String,
    pub system_reject_comment: String,
    pub reject_cleanup_comment: String,
    pub event_buffer: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        let raw = RawDispatchSection::default();
        Self {
            system_pass_comment: raw.system_pass_comment,
            system_reject_comment: raw.system_reject_comment,
            reject_cleanup_comment: raw.reject_cleanup_comment,
            event_buffer: raw.event_buffer,
        }
    }
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// `Default`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub compiler: CompilerOptions,
    pub proxy: AutoPassOptions,
    pub dispatch: DispatchOptions,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        compiler: CompilerOptions,
        proxy: AutoPassOptions,
        dispatch: DispatchOptions,
    ) -> Self {
        Self {
            compiler,
            proxy,
            dispatch,
        }
    }
}
