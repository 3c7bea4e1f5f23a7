// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{
    AutoPassOptions, CompilerOptions, ConfigFile, DispatchOptions, RawConfigFile,
};
use crate::errors::{FlowgateError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = FlowgateError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let compiler = validate_compiler(&raw)?;
        let proxy = validate_proxy(&raw)?;
        let dispatch = validate_dispatch(&raw)?;
        Ok(ConfigFile::new_unchecked(compiler, proxy, dispatch))
    }
}

fn validate_compiler(cfg: &RawConfigFile) -> Result<CompilerOptions> {
    let expression = cfg.compiler.default_condition_expression.trim();
    if expression.is_empty() {
        return Err(FlowgateError::ConfigError(
            "[compiler].default_condition_expression must not be empty".to_string(),
        ));
    }

    Ok(CompilerOptions {
        default_condition_expression: expression.to_string(),
        unknown_node_types: cfg.compiler.unknown_node_types,
    })
}

fn validate_proxy(cfg: &RawConfigFile) -> Result<AutoPassOptions> {
    let timeout = config_duration("[proxy].timeout", &cfg.proxy.timeout)?;
    let poll_interval = config_duration("[proxy].poll_interval", &cfg.proxy.poll_interval)?;

    if poll_interval >= timeout {
        return Err(FlowgateError::ConfigError(format!(
            "[proxy].poll_interval ({}) must be shorter than [proxy].timeout ({})",
            cfg.proxy.poll_interval, cfg.proxy.timeout
        )));
    }

    Ok(AutoPassOptions {
        timeout,
        poll_interval,
        comment: cfg.proxy.comment.clone(),
    })
}

fn validate_dispatch(cfg: &RawConfigFile) -> Result<DispatchOptions> {
    if cfg.dispatch.event_buffer == 0 {
        return Err(FlowgateError::ConfigError(
            "[dispatch].event_buffer must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(DispatchOptions {
        system_pass_comment: cfg.dispatch.system_pass_comment.clone(),
        system_reject_comment: cfg.dispatch.system_reject_comment.clone(),
        reject_cleanup_comment: cfg.dispatch.reject_cleanup_comment.clone(),
        event_buffer: cfg.dispatch.event_buffer,
    })
}

fn config_duration(key: &str, value: &str) -> Result<Duration> {
    let duration = parse_duration(value)
        .map_err(|msg| FlowgateError::ConfigError(format!("{key}: {msg}")))?;
    if duration.is_zero() {
        return Err(FlowgateError::ConfigError(format!(
            "{key} must be greater than zero"
        )));
    }
    Ok(duration)
}

/// Parse `"<n>ms"`, `"<n>s"`, `"<n>m"` or `"<n>h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit (ms, s, m, h)"))?;
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|e| format!("invalid number in duration '{s}': {e}"))?;

    match unit.trim().to_ascii_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        "h" => Ok(Duration::from_secs(value.saturating_mul(3600))),
        other => Err(format!("unsupported duration unit '{other}' in '{s}'")),
    }
}
