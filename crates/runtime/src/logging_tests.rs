use super::*;
use log::{Level, Metadata, Record};
use serial_test::serial;

#[test]
#[serial]
fn get_spec_from_env_parses_bare_levels() {
    let cases: &[(Option<&str>, Level)] = &[
        (None, Level::Warn),
        (Some("debug"), Level::Debug),
        (Some("DEBUG"), Level::Debug),
        (Some("info"), Level::Info),
        (Some("warn"), Level::Warn),
        (Some("ERROR"), Level::Error),
        (Some("trace"), Level::Trace),
        (Some("garbage"), Level::Warn),
        (Some("off"), Level::Warn),
        (Some(""), Level::Warn),
    ];

    for (value, expected) in cases {
        match value {
            Some(v) => unsafe { std::env::set_var(PROGRAM_LOG_LEVEL, v) },
            None => unsafe { std::env::remove_var(PROGRAM_LOG_LEVEL) },
        }

        let lvl = get_spec_from_env().level_for("fleetload_engine");
        assert_eq!(
            lvl, *expected,
            "env {:?} should yield level {:?}, got {:?}",
            value, expected, lvl
        );
    }

    unsafe { std::env::remove_var(PROGRAM_LOG_LEVEL) };
}

#[test]
fn directives_pick_most_specific_target() {
    let spec = LogSpec::parse("info, fleetload_engine=debug, fleetload_engine::pipelined=trace");

    let cases: &[(&str, Level)] = &[
        ("fleetload_cli", Level::Info),
        ("fleetload_engine", Level::Debug),
        ("fleetload_engine::insert", Level::Debug),
        ("fleetload_engine::pipelined", Level::Trace),
    ];

    for (target, expected) in cases {
        assert_eq!(spec.level_for(target), *expected, "target {target}");
    }
    assert_eq!(spec.max_level(), Level::Trace);
}

#[test]
fn malformed_directives_are_ignored() {
    let spec = LogSpec::parse("fleetload_memdb=loud,error");
    assert_eq!(spec.level_for("fleetload_memdb"), Level::Error);
    assert_eq!(spec.max_level(), Level::Error);
}

#[test]
fn enabled_respects_level_threshold() {
    let levels = [
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
    ];

    for logger_level in levels {
        let logger = Logger {
            spec: LogSpec::parse(logger_level.as_str()),
            target: LogTarget::Stderr,
        };

        for record_level in levels {
            let meta = Metadata::builder()
                .level(record_level)
                .target("test_target")
                .build();

            let expected = record_level <= logger_level;
            assert_eq!(
                logger.enabled(&meta),
                expected,
                "logger level {:?}, record level {:?}",
                logger_level,
                record_level
            );
        }
    }
}

#[test]
fn stderr_logger_does_not_panic() {
    let logger = Logger {
        spec: LogSpec::parse("info"),
        target: LogTarget::Stderr,
    };

    let cases = [
        (Level::Debug, "debug"),
        (Level::Info, "info"),
        (Level::Error, "error"),
    ];

    for (lvl, msg) in &cases {
        let args = format_args!("{msg}");
        let record = Record::builder().level(*lvl).target("t").args(args).build();
        logger.log(&record);
    }

    logger.flush();
}
