//! Loading engines from TOML files

use mibtx_core::{ErrorStatus, Oid, TimeTicks, Value};
use mibtx_engine::{ConfigError, EngineConfig, RequestContext, VarBind};
use mibtx_test_utils::ManualClock;
use std::io::Write;

const AGENT: &str = r#"
[engine]
max_bindings = 2

[[objects]]
kind = "plain"
oid = "1.3.6.1.2.1.1.5.0"
string = "router-1"
max_length = 16
display_string = true

[[objects]]
kind = "test_and_incr"
oid = "1.3.6.1.6.3.1.1.6.1.0"

[[objects]]
kind = "time_stamp"
oid = "1.3.6.1.2.1.1.8.0"

[[objects]]
kind = "key_change"
oid = "1.3.6.1.6.3.15.1.2.2.1.6.1.1.5.97.108.105.99.101"
protocol = "sha224"
row_index = "1.1.5.97.108.105.99.101"
key = "00000000000000000000000000000000000000000000000000000000"
own = true
readable = false
"#;

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn engine_from_file_enforces_configured_rules() {
    let file = write_config(AGENT);
    let config = EngineConfig::load(file.path()).unwrap();
    let clock = ManualClock::at(42);
    let engine = config.build_engine(clock.clone()).unwrap();
    let anonymous = RequestContext::anonymous();

    let sys_name: Oid = "1.3.6.1.2.1.1.5.0".parse().unwrap();
    let too_long = engine
        .set(&anonymous, vec![VarBind::new(sys_name.clone(), "a-very-long-router-name")])
        .unwrap();
    assert_eq!(too_long.status, ErrorStatus::WrongLength);

    let control = engine
        .set(&anonymous, vec![VarBind::new(sys_name.clone(), "bad\u{7}")])
        .unwrap();
    assert_eq!(control.status, ErrorStatus::WrongValue);

    assert!(engine
        .set(&anonymous, vec![VarBind::new(sys_name.clone(), "router-2")])
        .unwrap()
        .is_success());
    assert_eq!(engine.get(&sys_name), Ok(Value::from("router-2")));

    let three = vec![
        VarBind::new(sys_name.clone(), "a"),
        VarBind::new("1.3.6.1.6.3.1.1.6.1.0".parse().unwrap(), 0),
        VarBind::new("1.3.6.1.2.1.1.8.0".parse().unwrap(), TimeTicks(0)),
    ];
    assert_eq!(engine.set(&anonymous, three).unwrap().status, ErrorStatus::TooBig);
}

#[test]
fn configured_stamps_use_the_supplied_clock() {
    let file = write_config(AGENT);
    let clock = ManualClock::at(42);
    let engine = EngineConfig::load(file.path())
        .unwrap()
        .build_engine(clock.clone())
        .unwrap();

    let uptime: Oid = "1.3.6.1.2.1.1.8.0".parse().unwrap();
    let stamp = engine.store().resolve(&uptime).unwrap();
    clock.set(9000);
    assert_eq!(stamp.update_stamp(), Ok(TimeTicks(9000)));
}

#[test]
fn write_only_key_change_denies_reads() {
    let file = write_config(AGENT);
    let engine = EngineConfig::load(file.path())
        .unwrap()
        .build_engine(ManualClock::at(0))
        .unwrap();
    let column: Oid = "1.3.6.1.6.3.15.1.2.2.1.6.1.1.5.97.108.105.99.101".parse().unwrap();
    assert_eq!(engine.get(&column).unwrap_err().status(), ErrorStatus::NoAccess);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = EngineConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn unknown_kind_is_parse_error() {
    let file = write_config(
        r#"
        [[objects]]
        kind = "row_status"
        oid = "1.3.6.1"
        "#,
    );
    assert!(matches!(EngineConfig::load(file.path()), Err(ConfigError::Parse(_))));
}
