use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use flowgate::config::{load_and_validate, ConfigFile};
use flowgate::errors::FlowgateError;
use flowgate::types::UnknownNodePolicy;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_config_round_trips_into_options() {
    let file = write_config(
        r#"
[compiler]
default_condition_expression = "amount >= 0"
unknown_node_types = "reject"

[proxy]
timeout = "30s"
poll_interval = "1s"
comment = "passed by robot"

[dispatch]
system_pass_comment = "ok"
event_buffer = 16
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.compiler.default_condition_expression, "amount >= 0");
    assert_eq!(cfg.compiler.unknown_node_types, UnknownNodePolicy::Reject);
    assert_eq!(cfg.proxy.timeout, Duration::from_secs(30));
    assert_eq!(cfg.proxy.poll_interval, Duration::from_secs(1));
    assert_eq!(cfg.proxy.comment, "passed by robot");
    assert_eq!(cfg.dispatch.system_pass_comment, "ok");
    assert_eq!(cfg.dispatch.event_buffer, 16);
    assert_eq!(
        cfg.dispatch.system_reject_comment,
        ConfigFile::default().dispatch.system_reject_comment
    );
}

#[test]
fn poll_interval_must_be_shorter_than_timeout() {
    let file = write_config("[proxy]\ntimeout = \"500ms\"\npoll_interval = \"500ms\"\n");
    match load_and_validate(file.path()) {
        Err(FlowgateError::ConfigError(msg)) => assert!(msg.contains("poll_interval")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn unknown_keys_are_rejected() {
    let file = write_config("[proxy]\ntimeuot = \"5s\"\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(FlowgateError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Flowgate.toml");
    assert!(matches!(
        load_and_validate(&path),
        Err(FlowgateError::IoError(_))
    ));
}
